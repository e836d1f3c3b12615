//! Mailwave - a desktop shell around a webmail application
//!
//! Every configured account gets a [`ViewController`] with its own browsing
//! session. A titlebar webview above the content carries navigation,
//! account switching and find-in-page.

mod ipc;
mod license;
mod platform;
mod webview;
mod windows;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use ipc::{HostBridge, IpcMessage, SurfaceMessage, HOST_BRIDGE_JS};
use license::LicenseFile;
use mailwave_core::config::user_stylesheet_path;
use mailwave_core::{
    AccountConfig, AccountId, AppUrls, Bounds, ConfigStore, MailwaveError, MailwaveResult,
    SurfaceId, WindowId,
};
use mailwave_shell::{
    ContentSurface, DesktopSource, HostChannel, HostMessage, NavigationDirection, PermissionKind,
    PermissionRequest, PermissionResponse, ShellDeps, ViewController, TITLEBAR_HEIGHT,
};
use muda::Menu;
use platform::{get_platform_manager, SystemOpener};
use std::rc::Rc;
use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use tao::window::{Window, WindowBuilder};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use webview::make_rect;
use windows::WrySystem;
use wry::{Rect, WebView, WebViewBuilder};

/// Titlebar page shown above the content surfaces
const TITLEBAR_HTML: &str = include_str!("ui/titlebar.html");

/// Environment variable holding the log filter, e.g. `mailwave=debug`
const LOG_ENV: &str = "MAILWAVE_LOG";

/// Events delivered to the main loop
#[derive(Debug, Clone)]
pub enum UserEvent {
    /// Command from the titlebar page
    HostCommand(IpcMessage),
    /// Message from a content surface or the screen-share picker
    Surface {
        surface: SurfaceId,
        partition: String,
        message: SurfaceMessage,
    },
    /// Child windows were opened and need native windows
    MaterializeWindows,
    /// A child window closed; its resources can be released
    DestroyWindow(WindowId),
}

/// Map a permission name from the content bridge
fn permission_kind(kind: &str) -> PermissionKind {
    match kind {
        "media" => PermissionKind::Media,
        "notifications" => PermissionKind::Notifications,
        "geolocation" => PermissionKind::Geolocation,
        "clipboard-read" => PermissionKind::ClipboardRead,
        "fullscreen" => PermissionKind::Fullscreen,
        "open-external" => PermissionKind::OpenExternal,
        other => PermissionKind::Other(other.to_string()),
    }
}

fn origin_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .map(|url| url.origin().ascii_serialization())
}

fn titlebar_rect(window: &Window) -> Rect {
    let size = window.inner_size().to_logical::<u32>(window.scale_factor());
    make_rect(Bounds {
        x: 0,
        y: 0,
        width: size.width,
        height: TITLEBAR_HEIGHT,
    })
}

fn build_titlebar(
    window: &Window,
    proxy: &EventLoopProxy<UserEvent>,
    accounts: &[AccountConfig],
    selected: Option<&AccountId>,
) -> MailwaveResult<WebView> {
    let init = format!(
        "window.__MAILWAVE_ACCOUNTS = {}; window.__MAILWAVE_SELECTED = {};",
        serde_json::to_string(accounts)?,
        serde_json::to_string(&selected)?
    );
    let proxy = proxy.clone();

    WebViewBuilder::new()
        .with_html(TITLEBAR_HTML)
        .with_devtools(cfg!(debug_assertions))
        .with_initialization_script(&init)
        .with_initialization_script(HOST_BRIDGE_JS)
        .with_bounds(titlebar_rect(window))
        .with_ipc_handler(move |message| {
            let body = message.body();
            debug!("Titlebar IPC: {}", body);
            match serde_json::from_str::<IpcMessage>(body) {
                Ok(command) => {
                    let _ = proxy.send_event(UserEvent::HostCommand(command));
                }
                Err(e) => warn!("Ignoring titlebar IPC {}: {}", body, e),
            }
        })
        .build_as_child(window)
        .map_err(|e| MailwaveError::webview(e.to_string()))
}

struct App {
    system: Rc<WrySystem>,
    host: Rc<HostBridge>,
    deps: ShellDeps,
    controllers: Vec<Rc<ViewController>>,
    selected: Option<AccountId>,
    pool: LocalPool,
    // Dropping the menu removes it from the window
    _menu: Menu,
}

impl App {
    fn controller(&self, account: &AccountId) -> Option<Rc<ViewController>> {
        self.controllers
            .iter()
            .find(|controller| controller.account() == account)
            .cloned()
    }

    fn selected_controller(&self) -> Option<Rc<ViewController>> {
        self.selected.as_ref().and_then(|id| self.controller(id))
    }

    fn controller_for_partition(&self, partition: &str) -> Option<Rc<ViewController>> {
        self.controllers
            .iter()
            .find(|controller| controller.session().partition() == partition)
            .cloned()
    }

    fn add_account(&mut self, account: &AccountConfig) {
        let controller = ViewController::new(self.deps.clone(), account);
        controller.set_visible(false);
        self.controllers.push(controller);
    }

    fn select_account(&mut self, id: &AccountId) {
        let Some(next) = self.controller(id) else {
            warn!("Cannot select unknown account {}", id);
            return;
        };
        for controller in &self.controllers {
            controller.set_visible(Rc::ptr_eq(controller, &next));
        }
        next.update_view_bounds();
        self.selected = Some(id.clone());
        info!("Selected account {}", id);

        let state = next.state();
        self.host.send(HostMessage::StateChanged {
            account: id.clone(),
            state: state.clone(),
            previous: state,
        });

        let selected = id.clone();
        if let Err(e) = self
            .deps
            .config
            .update(move |config| config.selected_account = Some(selected))
        {
            error!("Failed to persist selected account: {}", e);
        }
    }

    fn compose(&self, mailto: &str) {
        match self.selected_controller() {
            Some(controller) => {
                controller.mailto_compose(mailto);
            }
            None => warn!("No account to compose {} with", mailto),
        }
    }

    fn layout(&self) {
        let _ = self
            .host
            .webview()
            .set_bounds(titlebar_rect(self.system.host_window()));
        for controller in &self.controllers {
            controller.update_view_bounds();
        }
    }

    fn handle_host_command(&mut self, command: IpcMessage) {
        match command {
            IpcMessage::SelectAccount { id } => return self.select_account(&AccountId::new(id)),
            IpcMessage::AddAccount { id, label } => {
                let account = AccountConfig::new(id, label);
                if self.controller(&account.id).is_none() {
                    let added = account.clone();
                    if let Err(e) = self.deps.config.update(move |config| config.accounts.push(added)) {
                        error!("Failed to add account {}: {}", account.id, e);
                        return;
                    }
                    self.add_account(&account);
                }
                return self.select_account(&account.id);
            }
            IpcMessage::ComposeMailto { url } => return self.compose(&url),
            _ => {}
        }

        let Some(controller) = self.selected_controller() else {
            debug!("No selected account for {:?}", command);
            return;
        };
        match command {
            IpcMessage::GoBack => controller.go(NavigationDirection::Back),
            IpcMessage::GoForward => controller.go(NavigationDirection::Forward),
            IpcMessage::Reload => controller.reload(),
            IpcMessage::SetZoom { factor } => {
                let applied = controller.set_zoom(factor);
                debug!("Zoom of {} set to {}", controller.account(), applied);
            }
            IpcMessage::FindInPage { text, forward } => controller.find_in_page(&text, forward),
            IpcMessage::StopFindInPage => controller.stop_find_in_page(),
            IpcMessage::SelectAccount { .. }
            | IpcMessage::AddAccount { .. }
            | IpcMessage::ComposeMailto { .. } => {}
        }
    }

    fn handle_surface_message(&mut self, surface: SurfaceId, partition: &str, message: SurfaceMessage) {
        match message {
            SurfaceMessage::SetUnreadCount { count } => {
                let owner = self
                    .controllers
                    .iter()
                    .find(|controller| controller.surface().id() == surface);
                if let Some(controller) = owner {
                    controller.report_unread_count(count);
                }
            }
            SurfaceMessage::RequestDisplayMedia { request_id } => {
                self.request_display_media(surface, partition, request_id)
            }
            SurfaceMessage::RequestPermission { request_id, kind } => {
                let Some(target) = self.system.surface(surface) else {
                    return;
                };
                let granted = match self.system.session_handlers(partition) {
                    Some(handlers) => {
                        let origin = target
                            .url()
                            .and_then(|url| origin_of(&url))
                            .unwrap_or_default();
                        let request = PermissionRequest::new(permission_kind(&kind), origin);
                        (handlers.on_permission)(&request) == PermissionResponse::Granted
                    }
                    None => false,
                };
                target.resolve_permission(request_id, granted);
            }
            SurfaceMessage::SelectSource { id, name } => {
                if let Some(controller) = self.controller_for_partition(partition) {
                    info!("Screen share source selected: {}", name);
                    controller
                        .session()
                        .screen_share()
                        .source_selected(DesktopSource { id, name });
                }
            }
            SurfaceMessage::CancelPicker => {
                if let Some(controller) = self.controller_for_partition(partition) {
                    controller.session().screen_share().cancel();
                }
            }
            SurfaceMessage::FoundInPage { .. } | SurfaceMessage::DidNavigateInPage { .. } => {
                debug!("Surface message handled in the webview: {:?}", message);
            }
        }
    }

    /// Negotiate a display-media request and answer the page once settled
    fn request_display_media(&mut self, surface: SurfaceId, partition: &str, request_id: u64) {
        let pending = match self.system.session_handlers(partition) {
            Some(handlers) => (handlers.on_display_media)(),
            None => mailwave_shell::PendingDisplayMedia::empty(),
        };
        let system = Rc::downgrade(&self.system);
        let spawned = self.pool.spawner().spawn_local(async move {
            let response = pending.await;
            info!("Display media request {} settled: {:?}", request_id, response);
            if let Some(target) = system.upgrade().and_then(|system| system.surface(surface)) {
                target.resolve_display_media(request_id, &response);
            }
        });
        if let Err(e) = spawned {
            error!("Failed to spawn display media negotiation: {}", e);
        }
    }

    fn shutdown(&mut self) {
        info!("Shutting down {} account(s)", self.controllers.len());
        for controller in self.controllers.drain(..) {
            controller.registry().close_all();
            controller.destroy();
        }
        if let Err(e) = self.deps.config.save() {
            error!("Failed to persist configuration: {}", e);
        }
    }
}

fn run() -> MailwaveResult<()> {
    let config = Rc::new(ConfigStore::load_or_default(ConfigStore::default_path())?);
    let urls = Rc::new(AppUrls::default());

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title("Mailwave")
        .with_inner_size(LogicalSize::new(1280.0, 800.0))
        .with_min_inner_size(LogicalSize::new(640.0, 480.0))
        .build(&event_loop)
        .map_err(|e| MailwaveError::window(e.to_string()))?;
    let main_window_id = window.id();

    let platform = get_platform_manager();
    info!("Platform: {}", platform.platform_name());

    // Required for clipboard shortcuts on macOS
    let menu_bar = Menu::new();
    if let Err(e) = platform.initialize_menu(&window, &menu_bar) {
        error!("Failed to initialize menu: {}", e);
    }

    let accounts = config.read(|config| config.accounts.clone());
    let initial = config.read(|config| config.initial_account().map(|account| account.id.clone()));
    let titlebar = build_titlebar(&window, &proxy, &accounts, initial.as_ref())?;
    let host = Rc::new(HostBridge::new(titlebar));
    let system = Rc::new(WrySystem::new(window, proxy.clone(), config.data_dir()));

    let deps = ShellDeps {
        windows: system.clone(),
        host: host.clone(),
        opener: Rc::new(SystemOpener::new(platform)),
        license: Rc::new(LicenseFile::in_config_dir()),
        config: Rc::clone(&config),
        urls,
        user_stylesheet: user_stylesheet_path(),
    };

    let mut app = App {
        system,
        host,
        deps,
        controllers: Vec::new(),
        selected: None,
        pool: LocalPool::new(),
        _menu: menu_bar,
    };
    for account in &accounts {
        app.add_account(account);
    }
    if let Some(id) = initial {
        app.select_account(&id);
    }
    if let Some(mailto) = std::env::args().skip(1).find(|arg| arg.starts_with("mailto:")) {
        app.compose(&mailto);
    }

    info!("Mailwave started with {} account(s)", accounts.len());

    event_loop.run(move |event, target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                window_id,
                ..
            } => {
                if window_id == main_window_id {
                    info!("Main window close requested, shutting down...");
                    app.shutdown();
                    *control_flow = ControlFlow::Exit;
                } else {
                    app.system.close_native(window_id);
                }
            }
            Event::WindowEvent {
                event: WindowEvent::Resized(_),
                window_id,
                ..
            } if window_id == main_window_id => app.layout(),
            Event::UserEvent(UserEvent::HostCommand(command)) => app.handle_host_command(command),
            Event::UserEvent(UserEvent::Surface {
                surface,
                partition,
                message,
            }) => app.handle_surface_message(surface, &partition, message),
            Event::UserEvent(UserEvent::MaterializeWindows) => app.system.materialize_pending(target),
            Event::UserEvent(UserEvent::DestroyWindow(id)) => app.system.destroy_window(id),
            Event::MainEventsCleared => app.pool.run_until_stalled(),
            _ => {}
        }
    })
}

fn main() {
    // Initialize logging with log compatibility
    tracing_log::LogTracer::init().expect("Failed to set log tracer");
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    info!("Starting Mailwave...");

    if let Err(e) = run() {
        error!("Mailwave failed to start: {}", e);
        std::process::exit(1);
    }
}
