//! tao/wry implementation of the shell's window system
//!
//! Primary surfaces are child webviews of the host window. Child windows are
//! recorded immediately and materialized on the next event-loop turn, since
//! tao needs the event-loop target to create a window.

use crate::webview::WrySurface;
use crate::UserEvent;
use mailwave_core::urls::BLANK_URL;
use mailwave_core::{AccountId, MailwaveError, MailwaveResult, Size, WindowId};
use mailwave_shell::{
    BrowsingSession, ContentSurface, DesktopSource, EventResponse, NativeWindow, SessionHandlers,
    SurfaceEvent, WindowHandlers, WindowSpec, WindowSystem, PICKER_URL,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tao::dpi::LogicalSize;
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Window, WindowBuilder, WindowId as NativeWindowId};
use tracing::{debug, error, info};
use wry::{WebContext, WebViewBuilder};

/// Screen-share picker page, served in place of [`PICKER_URL`]
const PICKER_HTML: &str = include_str!("ui/picker.html");

const DEFAULT_WINDOW_TITLE: &str = "Mailwave";

/// Storage directory of a `persist:<account>` partition
pub fn storage_dir_for_partition(data_dir: &Path, partition: &str) -> PathBuf {
    let account = partition.strip_prefix("persist:").unwrap_or(partition);
    BrowsingSession::storage_dir_for(data_dir, &AccountId::new(account))
}

/// Script exposing the capture sources to the picker page
pub fn picker_sources_script(sources: &[DesktopSource]) -> String {
    let json = serde_json::to_string(sources).unwrap_or_else(|_| "[]".to_string());
    format!("window.__MAILWAVE_SOURCES = {};", json)
}

/// A top-level window with a single content surface
pub struct AppWindow {
    id: WindowId,
    spec: WindowSpec,
    surface: Rc<WrySurface>,
    handlers: WindowHandlers,
    native: RefCell<Option<Window>>,
    closed: Cell<bool>,
    proxy: EventLoopProxy<UserEvent>,
}

impl AppWindow {
    fn new(spec: WindowSpec, handlers: WindowHandlers, proxy: EventLoopProxy<UserEvent>) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<AppWindow>| {
            let surface = Rc::new(WrySurface::new(spec.partition.clone()));
            let window = this.clone();
            surface.set_event_sink(Some(Rc::new(move |event: SurfaceEvent| match window.upgrade() {
                Some(window) => window.handlers.dispatch(&*window, event),
                None => EventResponse::Proceed,
            })));
            if spec.url != PICKER_URL {
                surface.load_url(&spec.url);
            }

            Self {
                id: WindowId::new(),
                spec,
                surface,
                handlers,
                native: RefCell::new(None),
                closed: Cell::new(false),
                proxy,
            }
        })
    }

    fn is_materialized(&self) -> bool {
        self.native.borrow().is_some()
    }

    fn native_id(&self) -> Option<NativeWindowId> {
        self.native.borrow().as_ref().map(Window::id)
    }
}

impl NativeWindow for AppWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn surface(&self) -> &dyn ContentSurface {
        &*self.surface
    }

    fn focus(&self) {
        if let Some(native) = self.native.borrow().as_ref() {
            native.set_visible(true);
            native.set_minimized(false);
            native.set_focus();
        }
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        debug!("Closing window {:?}", self.id);
        if let Some(native) = self.native.borrow().as_ref() {
            native.set_visible(false);
        }
        self.surface.set_event_sink(None);
        self.handlers.closed(self.id);
        // The webview may be the caller; it is dropped on the next turn
        let _ = self.proxy.send_event(UserEvent::DestroyWindow(self.id));
    }
}

/// [`WindowSystem`] backed by tao windows and wry webviews
pub struct WrySystem {
    host: Window,
    proxy: EventLoopProxy<UserEvent>,
    data_dir: PathBuf,
    contexts: RefCell<HashMap<String, WebContext>>,
    session_handlers: RefCell<HashMap<String, SessionHandlers>>,
    surfaces: RefCell<Vec<Weak<WrySurface>>>,
    windows: RefCell<Vec<Rc<AppWindow>>>,
}

impl WrySystem {
    pub fn new(host: Window, proxy: EventLoopProxy<UserEvent>, data_dir: PathBuf) -> Self {
        Self {
            host,
            proxy,
            data_dir,
            contexts: RefCell::new(HashMap::new()),
            session_handlers: RefCell::new(HashMap::new()),
            surfaces: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
        }
    }

    pub fn host_window(&self) -> &Window {
        &self.host
    }

    pub fn session_handlers(&self, partition: &str) -> Option<SessionHandlers> {
        self.session_handlers.borrow().get(partition).cloned()
    }

    /// Live surface with `id`, primary or in a child window
    pub fn surface(&self, id: mailwave_core::SurfaceId) -> Option<Rc<WrySurface>> {
        let mut surfaces = self.surfaces.borrow_mut();
        surfaces.retain(|surface| surface.strong_count() > 0);
        surfaces
            .iter()
            .filter_map(Weak::upgrade)
            .find(|surface| surface.id() == id)
    }

    fn context_for<'a>(
        contexts: &'a mut HashMap<String, WebContext>,
        data_dir: &Path,
        partition: &str,
    ) -> &'a mut WebContext {
        contexts.entry(partition.to_string()).or_insert_with(|| {
            let dir = storage_dir_for_partition(data_dir, partition);
            info!("Creating web context for {} at {:?}", partition, dir);
            WebContext::new(Some(dir))
        })
    }

    /// Create native windows for every window opened since the last turn
    pub fn materialize_pending(&self, target: &EventLoopWindowTarget<UserEvent>) {
        let pending: Vec<Rc<AppWindow>> = self
            .windows
            .borrow()
            .iter()
            .filter(|window| !window.is_materialized() && !window.closed.get())
            .cloned()
            .collect();

        for window in pending {
            if !window.spec.visible && window.spec.url == BLANK_URL {
                // wry cannot adopt the engine's popup, so a script can never
                // navigate this window
                debug!("Dropping hidden blank window {:?}", window.id);
                window.close();
                continue;
            }
            if let Err(e) = self.materialize(&window, target) {
                error!("Failed to open window for {}: {}", window.spec.url, e);
                window.close();
            }
        }
    }

    fn materialize(
        &self,
        window: &AppWindow,
        target: &EventLoopWindowTarget<UserEvent>,
    ) -> MailwaveResult<()> {
        let spec = &window.spec;
        let native = WindowBuilder::new()
            .with_title(spec.title.as_deref().unwrap_or(DEFAULT_WINDOW_TITLE))
            .with_inner_size(LogicalSize::new(spec.size.width, spec.size.height))
            .with_visible(spec.visible)
            .with_always_on_top(spec.parent.is_some())
            .build(target)
            .map_err(|e| MailwaveError::window(e.to_string()))?;

        let webview = {
            let mut contexts = self.contexts.borrow_mut();
            let context = Self::context_for(&mut contexts, &self.data_dir, &spec.partition);
            let builder = window
                .surface
                .configure(WebViewBuilder::with_web_context(context), &self.proxy);
            let builder = if spec.url == PICKER_URL {
                let sources: Vec<DesktopSource> = target
                    .available_monitors()
                    .enumerate()
                    .map(|(index, monitor)| DesktopSource {
                        id: format!("screen:{}", index),
                        name: monitor
                            .name()
                            .unwrap_or_else(|| format!("Screen {}", index + 1)),
                    })
                    .collect();
                builder
                    .with_initialization_script(&picker_sources_script(&sources))
                    .with_html(PICKER_HTML)
            } else {
                let url = window
                    .surface
                    .take_deferred_url()
                    .unwrap_or_else(|| spec.url.clone());
                builder.with_url(url)
            };
            builder
                .build(&native)
                .map_err(|e| MailwaveError::webview(e.to_string()))?
        };

        window.surface.attach_webview(webview);
        *window.native.borrow_mut() = Some(native);
        info!("Opened window {:?} for {}", window.id, spec.url);
        Ok(())
    }

    /// A native close button was pressed on one of the child windows
    pub fn close_native(&self, native_id: NativeWindowId) {
        let window = self
            .windows
            .borrow()
            .iter()
            .find(|window| window.native_id() == Some(native_id))
            .cloned();
        if let Some(window) = window {
            window.close();
        }
    }

    /// Drop a closed window's webview and native window
    pub fn destroy_window(&self, id: WindowId) {
        let window = {
            let mut windows = self.windows.borrow_mut();
            let index = windows.iter().position(|window| window.id == id);
            index.map(|index| windows.remove(index))
        };
        if let Some(window) = window {
            window.surface.close();
            window.native.borrow_mut().take();
            debug!("Destroyed window {:?}", id);
        }
    }
}

impl WindowSystem for WrySystem {
    fn create_surface(&self, partition: &str) -> Rc<dyn ContentSurface> {
        let surface = Rc::new(WrySurface::new(partition));
        let result = {
            let mut contexts = self.contexts.borrow_mut();
            let context = Self::context_for(&mut contexts, &self.data_dir, partition);
            surface
                .configure(WebViewBuilder::with_web_context(context), &self.proxy)
                .build_as_child(&self.host)
        };
        match result {
            Ok(webview) => surface.attach_webview(webview),
            // The surface stays usable; calls are recorded but never applied
            Err(e) => error!("Failed to create webview for {}: {}", partition, e),
        }
        self.surfaces.borrow_mut().push(Rc::downgrade(&surface));
        surface
    }

    fn attach_surface(&self, surface: &dyn ContentSurface) {
        // Child webviews are attached to the host window when built
        debug!("Attached surface {:?}", surface.id());
    }

    fn detach_surface(&self, surface: &dyn ContentSurface) {
        surface.set_visible(false);
        debug!("Detached surface {:?}", surface.id());
    }

    fn host_content_size(&self) -> Size {
        let size = self
            .host
            .inner_size()
            .to_logical::<u32>(self.host.scale_factor());
        Size::new(size.width, size.height)
    }

    fn open_window(&self, spec: WindowSpec, handlers: WindowHandlers) -> Rc<dyn NativeWindow> {
        let window = AppWindow::new(spec, handlers, self.proxy.clone());
        self.surfaces
            .borrow_mut()
            .push(Rc::downgrade(&window.surface));
        self.windows.borrow_mut().push(Rc::clone(&window));
        let _ = self.proxy.send_event(UserEvent::MaterializeWindows);
        window
    }

    fn set_session_handlers(&self, partition: &str, handlers: SessionHandlers) {
        debug!("Installed session handlers for {}", partition);
        self.session_handlers
            .borrow_mut()
            .insert(partition.to_string(), handlers);
    }
}
