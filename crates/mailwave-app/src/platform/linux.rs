//! Linux platform implementation
//!
//! Menus are attached to the GTK window tao creates, and xdg-open hands
//! links to the desktop's default browser.

use super::{append_edit_menu, PlatformError, PlatformManager, PlatformResult};
use muda::Menu;
use std::process::Command;
use tao::window::Window;
use tracing::{debug, warn};

/// Linux platform manager
#[derive(Debug, Default)]
pub struct LinuxPlatform;

impl LinuxPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformManager for LinuxPlatform {
    fn initialize_menu(&self, window: &Window, menu: &Menu) -> PlatformResult<()> {
        append_edit_menu(menu)?;

        use tao::platform::unix::WindowExtUnix;

        // The menu bar goes into tao's vbox; without one there is nowhere to put it
        let Some(vbox) = window.default_vbox() else {
            warn!("GTK container not available for menu initialization");
            return Ok(());
        };
        menu.init_for_gtk_window(window.gtk_window(), Some(vbox))
            .map_err(|e| PlatformError::MenuInitFailed(format!("GTK init failed: {}", e)))?;

        debug!("Linux menu initialized successfully");
        Ok(())
    }

    fn open_external(&self, url: &str) -> PlatformResult<()> {
        debug!("Opening external URL: {}", url);

        Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map_err(|e| PlatformError::OpenExternalFailed(format!("{}: {}", url, e)))?;

        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "Linux"
    }
}
