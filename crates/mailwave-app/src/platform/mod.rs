//! Platform abstraction layer
//!
//! Menus and handing URLs to the system browser differ across macOS,
//! Windows, and Linux. Everything else in the app is platform neutral.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use mailwave_shell::ExternalOpener;
use muda::{Menu, PredefinedMenuItem, Submenu};
use tao::window::Window;
use tracing::{debug, error, warn};

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform-specific error types
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// Menu initialization failed
    MenuInitFailed(String),
    /// Failed to open external URL
    OpenExternalFailed(String),
    /// URL scheme the system browser must not receive
    UnsupportedScheme(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::MenuInitFailed(msg) => write!(f, "Menu initialization failed: {}", msg),
            PlatformError::OpenExternalFailed(msg) => write!(f, "Failed to open external: {}", msg),
            PlatformError::UnsupportedScheme(url) => write!(f, "Refusing to open {}", url),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Trait for platform-specific operations
pub trait PlatformManager {
    /// Install the native menu on the host window.
    ///
    /// On macOS this is required for clipboard shortcuts (Cmd+C/V) to work
    /// inside webviews.
    fn initialize_menu(&self, window: &Window, menu: &Menu) -> PlatformResult<()>;

    /// Open a URL in the system's default browser
    fn open_external(&self, url: &str) -> PlatformResult<()>;

    /// Get the platform name for logging
    fn platform_name(&self) -> &'static str;
}

/// Get the platform manager for the current operating system
pub fn get_platform_manager() -> Box<dyn PlatformManager> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSPlatform::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsPlatform::new())
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxPlatform::new())
    }
}

/// Whether `url` may be handed to the system browser.
///
/// Only web, mail and phone links leave the app; anything else could launch
/// an arbitrary local handler.
pub fn is_openable_externally(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "mailto" | "tel"),
        Err(_) => false,
    }
}

/// Append the Edit menu with clipboard operations
pub(crate) fn append_edit_menu(menu: &Menu) -> PlatformResult<()> {
    let edit_menu = Submenu::new("Edit", true);

    let items = [
        PredefinedMenuItem::undo(None),
        PredefinedMenuItem::redo(None),
        PredefinedMenuItem::separator(),
        PredefinedMenuItem::cut(None),
        PredefinedMenuItem::copy(None),
        PredefinedMenuItem::paste(None),
        PredefinedMenuItem::select_all(None),
    ];
    for item in &items {
        edit_menu
            .append(item)
            .map_err(|e| PlatformError::MenuInitFailed(format!("Failed to add {:?}: {}", item.text(), e)))?;
    }

    menu.append(&edit_menu)
        .map_err(|e| PlatformError::MenuInitFailed(format!("Failed to append edit menu: {}", e)))?;

    Ok(())
}

/// [`ExternalOpener`] backed by the platform manager
pub struct SystemOpener {
    platform: Box<dyn PlatformManager>,
}

impl SystemOpener {
    pub fn new(platform: Box<dyn PlatformManager>) -> Self {
        Self { platform }
    }

    pub fn try_open(&self, url: &str) -> PlatformResult<()> {
        if !is_openable_externally(url) {
            return Err(PlatformError::UnsupportedScheme(url.to_string()));
        }
        debug!("Opening {} externally on {}", url, self.platform.platform_name());
        self.platform.open_external(url)
    }
}

impl ExternalOpener for SystemOpener {
    fn open_external(&self, url: &str) {
        match self.try_open(url) {
            Ok(()) => {}
            Err(e @ PlatformError::UnsupportedScheme(_)) => warn!("{}", e),
            Err(e) => error!("{}", e),
        }
    }
}
