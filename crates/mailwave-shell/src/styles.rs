//! Stylesheets injected into content surfaces

use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Styles for the mail application on its canonical origin
pub const APP_STYLESHEET: &str = include_str!("css/app.css");

/// Styles for every document shown by the shell
pub const SHELL_STYLESHEET: &str = include_str!("css/shell.css");

/// The user's custom stylesheet.
///
/// Whether the file exists is checked on every call; its contents are read
/// once and edits made afterwards are picked up by the next controller.
#[derive(Debug)]
pub struct UserStylesheet {
    path: PathBuf,
    cached: OnceCell<String>,
}

impl UserStylesheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceCell::new(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Stylesheet contents; `None` when the file is missing or unreadable
    pub fn contents(&self) -> Option<&str> {
        if !self.exists() {
            return None;
        }
        if let Some(css) = self.cached.get() {
            return Some(css.as_str());
        }
        match fs::read_to_string(&self.path) {
            Ok(css) => {
                log::debug!("Loaded user stylesheet from {:?}", self.path);
                Some(self.cached.get_or_init(|| css).as_str())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No user stylesheet at {:?}", self.path);
                None
            }
            Err(e) => {
                log::warn!("Failed to read user stylesheet {:?}: {}", self.path, e);
                None
            }
        }
    }
}
