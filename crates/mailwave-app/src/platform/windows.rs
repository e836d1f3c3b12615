//! Windows platform implementation

use super::{append_edit_menu, PlatformError, PlatformManager, PlatformResult};
use muda::Menu;
use std::process::Command;
use tao::window::Window;
use tracing::debug;

/// Windows platform manager
#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformManager for WindowsPlatform {
    fn initialize_menu(&self, window: &Window, menu: &Menu) -> PlatformResult<()> {
        append_edit_menu(menu)?;

        use tao::platform::windows::WindowExtWindows;
        unsafe {
            menu.init_for_hwnd(window.hwnd() as _)
                .map_err(|e| PlatformError::MenuInitFailed(format!("HWND init failed: {}", e)))?;
            // The titlebar page carries navigation; keep the menu for accelerators only
            menu.hide_for_hwnd(window.hwnd() as _)
                .map_err(|e| PlatformError::MenuInitFailed(format!("HWND hide failed: {}", e)))?;
        }

        debug!("Windows menu initialized successfully");
        Ok(())
    }

    fn open_external(&self, url: &str) -> PlatformResult<()> {
        debug!("Opening external URL: {}", url);

        // The empty "" after start is the window title
        Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()
            .map_err(|e| PlatformError::OpenExternalFailed(format!("{}: {}", url, e)))?;

        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "Windows"
    }
}
