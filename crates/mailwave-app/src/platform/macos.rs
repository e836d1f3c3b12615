//! macOS platform implementation
//!
//! The native menu is required for clipboard shortcuts (Cmd+C/V) to reach
//! the webviews.

use super::{append_edit_menu, PlatformError, PlatformManager, PlatformResult};
use muda::{Menu, PredefinedMenuItem, Submenu};
use std::process::Command;
use tao::window::Window;
use tracing::debug;

/// macOS platform manager
#[derive(Debug, Default)]
pub struct MacOSPlatform;

impl MacOSPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Create the standard macOS application menu
    fn create_app_menu(&self, menu: &Menu) -> PlatformResult<()> {
        let app_menu = Submenu::new("Mailwave", true);

        let items = [
            PredefinedMenuItem::about(Some("About Mailwave"), None),
            PredefinedMenuItem::separator(),
            PredefinedMenuItem::services(None),
            PredefinedMenuItem::separator(),
            PredefinedMenuItem::hide(None),
            PredefinedMenuItem::hide_others(None),
            PredefinedMenuItem::show_all(None),
            PredefinedMenuItem::separator(),
            PredefinedMenuItem::quit(None),
        ];
        for item in &items {
            app_menu.append(item).map_err(|e| {
                PlatformError::MenuInitFailed(format!("Failed to add {:?}: {}", item.text(), e))
            })?;
        }

        menu.append(&app_menu)
            .map_err(|e| PlatformError::MenuInitFailed(format!("Failed to append app menu: {}", e)))?;

        Ok(())
    }
}

impl PlatformManager for MacOSPlatform {
    fn initialize_menu(&self, _window: &Window, menu: &Menu) -> PlatformResult<()> {
        self.create_app_menu(menu)?;
        append_edit_menu(menu)?;

        menu.init_for_nsapp();

        debug!("macOS menu initialized successfully");
        Ok(())
    }

    fn open_external(&self, url: &str) -> PlatformResult<()> {
        debug!("Opening external URL: {}", url);

        Command::new("open")
            .arg(url)
            .spawn()
            .map_err(|e| PlatformError::OpenExternalFailed(format!("{}: {}", url, e)))?;

        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "macOS"
    }
}
