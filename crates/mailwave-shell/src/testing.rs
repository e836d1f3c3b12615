//! Recording fakes of the host seams, shared by the unit tests

use crate::controller::ShellDeps;
use crate::host::{
    ContentSurface, EventResponse, ExternalOpener, HostChannel, HostMessage, LicenseCheck,
    NativeWindow, SessionHandlers, SurfaceEvent, SurfaceEventSink, WindowHandlers, WindowSpec,
    WindowSystem,
};
use mailwave_core::{AppUrls, Bounds, ConfigStore, ShellConfig, Size, SurfaceId, WindowId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;
use url::Url;

pub const TEST_APP_URL: &str = "https://mail.example.com/";

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    LoadUrl(String),
    Reload,
    GoBack,
    GoForward,
    InsertCss(String),
    SetBounds(Bounds),
    SetVisible(bool),
    SetZoom(f64),
    Find(String, bool),
    StopFind,
    Download(String),
    Close,
}

pub struct FakeSurface {
    id: SurfaceId,
    url: RefCell<Option<String>>,
    can_go_back: Cell<bool>,
    can_go_forward: Cell<bool>,
    calls: RefCell<Vec<SurfaceCall>>,
    sink: RefCell<Option<SurfaceEventSink>>,
    closed: Cell<bool>,
}

impl FakeSurface {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            id: SurfaceId::new(),
            url: RefCell::new(url.map(str::to_string)),
            can_go_back: Cell::new(false),
            can_go_forward: Cell::new(false),
            calls: RefCell::new(Vec::new()),
            sink: RefCell::new(None),
            closed: Cell::new(false),
        }
    }

    pub fn set_current_url(&self, url: &str) {
        *self.url.borrow_mut() = Some(url.to_string());
    }

    pub fn set_history(&self, can_go_back: bool, can_go_forward: bool) {
        self.can_go_back.set(can_go_back);
        self.can_go_forward.set(can_go_forward);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::LoadUrl(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn injected_css(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::InsertCss(css) => Some(css),
                _ => None,
            })
            .collect()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.borrow().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Deliver `event` the way an engine would. Committed navigations update
    /// the current URL first.
    pub fn emit(&self, event: SurfaceEvent) -> EventResponse {
        if let SurfaceEvent::DidNavigate { url } | SurfaceEvent::DidNavigateInPage { url } = &event {
            self.set_current_url(url);
        }
        let sink = self.sink.borrow().clone();
        match sink {
            Some(sink) => sink(event),
            None => EventResponse::Proceed,
        }
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ContentSurface for FakeSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn load_url(&self, url: &str) {
        self.record(SurfaceCall::LoadUrl(url.to_string()));
        self.set_current_url(url);
    }

    fn url(&self) -> Option<String> {
        self.url.borrow().clone()
    }

    fn reload(&self) {
        self.record(SurfaceCall::Reload);
    }

    fn go_back(&self) {
        self.record(SurfaceCall::GoBack);
    }

    fn go_forward(&self) {
        self.record(SurfaceCall::GoForward);
    }

    fn can_go_back(&self) -> bool {
        self.can_go_back.get()
    }

    fn can_go_forward(&self) -> bool {
        self.can_go_forward.get()
    }

    fn insert_css(&self, css: &str) {
        self.record(SurfaceCall::InsertCss(css.to_string()));
    }

    fn set_bounds(&self, bounds: Bounds) {
        self.record(SurfaceCall::SetBounds(bounds));
    }

    fn set_visible(&self, visible: bool) {
        self.record(SurfaceCall::SetVisible(visible));
    }

    fn set_zoom(&self, factor: f64) {
        self.record(SurfaceCall::SetZoom(factor));
    }

    fn find_in_page(&self, text: &str, forward: bool) {
        self.record(SurfaceCall::Find(text.to_string(), forward));
    }

    fn stop_find_in_page(&self) {
        self.record(SurfaceCall::StopFind);
    }

    fn download_url(&self, url: &str) {
        self.record(SurfaceCall::Download(url.to_string()));
    }

    fn set_event_sink(&self, sink: Option<SurfaceEventSink>) {
        *self.sink.borrow_mut() = sink;
    }

    fn close(&self) {
        self.record(SurfaceCall::Close);
        self.closed.set(true);
    }
}

pub struct FakeWindow {
    id: WindowId,
    pub spec: WindowSpec,
    pub surface: FakeSurface,
    handlers: WindowHandlers,
    focus_count: Cell<u32>,
    closed: Cell<bool>,
}

impl FakeWindow {
    pub fn new(spec: WindowSpec, handlers: WindowHandlers) -> Rc<Self> {
        Rc::new(Self {
            id: WindowId::new(),
            surface: FakeSurface::new(Some(&spec.url)),
            spec,
            handlers,
            focus_count: Cell::new(0),
            closed: Cell::new(false),
        })
    }

    /// Deliver `event` to the window's handlers
    pub fn emit(&self, event: SurfaceEvent) -> EventResponse {
        if let SurfaceEvent::DidNavigate { url } = &event {
            self.surface.set_current_url(url);
        }
        self.handlers.dispatch(self, event)
    }

    pub fn focus_count(&self) -> u32 {
        self.focus_count.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl NativeWindow for FakeWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn surface(&self) -> &dyn ContentSurface {
        &self.surface
    }

    fn focus(&self) {
        self.focus_count.set(self.focus_count.get() + 1);
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.surface.close();
        self.handlers.closed(self.id);
    }
}

pub struct FakeWindowSystem {
    surfaces: RefCell<Vec<Rc<FakeSurface>>>,
    windows: RefCell<Vec<Rc<FakeWindow>>>,
    attached: RefCell<Vec<SurfaceId>>,
    host_size: Cell<Size>,
    session_handlers: RefCell<HashMap<String, SessionHandlers>>,
}

impl FakeWindowSystem {
    pub fn new() -> Self {
        Self {
            surfaces: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
            attached: RefCell::new(Vec::new()),
            host_size: Cell::new(Size::new(1280, 800)),
            session_handlers: RefCell::new(HashMap::new()),
        }
    }

    pub fn surfaces(&self) -> Vec<Rc<FakeSurface>> {
        self.surfaces.borrow().clone()
    }

    /// Most recently created surface
    pub fn last_surface(&self) -> Rc<FakeSurface> {
        self.surfaces
            .borrow()
            .last()
            .cloned()
            .expect("no surface created")
    }

    pub fn windows(&self) -> Vec<Rc<FakeWindow>> {
        self.windows.borrow().clone()
    }

    /// Most recently opened window
    pub fn last_window(&self) -> Rc<FakeWindow> {
        self.windows
            .borrow()
            .last()
            .cloned()
            .expect("no window opened")
    }

    pub fn open_windows(&self) -> Vec<Rc<FakeWindow>> {
        self.windows()
            .into_iter()
            .filter(|window| !window.is_closed())
            .collect()
    }

    pub fn is_attached(&self, id: SurfaceId) -> bool {
        self.attached.borrow().contains(&id)
    }

    pub fn set_host_size(&self, size: Size) {
        self.host_size.set(size);
    }

    pub fn session_handlers(&self, partition: &str) -> Option<SessionHandlers> {
        self.session_handlers.borrow().get(partition).cloned()
    }
}

impl WindowSystem for FakeWindowSystem {
    fn create_surface(&self, _partition: &str) -> Rc<dyn ContentSurface> {
        let surface = Rc::new(FakeSurface::new(None));
        self.surfaces.borrow_mut().push(Rc::clone(&surface));
        surface
    }

    fn attach_surface(&self, surface: &dyn ContentSurface) {
        self.attached.borrow_mut().push(surface.id());
    }

    fn detach_surface(&self, surface: &dyn ContentSurface) {
        let id = surface.id();
        self.attached.borrow_mut().retain(|attached| *attached != id);
    }

    fn host_content_size(&self) -> Size {
        self.host_size.get()
    }

    fn open_window(&self, spec: WindowSpec, handlers: WindowHandlers) -> Rc<dyn NativeWindow> {
        let window = FakeWindow::new(spec, handlers);
        self.windows.borrow_mut().push(Rc::clone(&window));
        window
    }

    fn set_session_handlers(&self, partition: &str, handlers: SessionHandlers) {
        self.session_handlers
            .borrow_mut()
            .insert(partition.to_string(), handlers);
    }
}

#[derive(Default)]
pub struct RecordingHost {
    messages: RefCell<Vec<HostMessage>>,
}

impl RecordingHost {
    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.borrow().clone()
    }
}

impl HostChannel for RecordingHost {
    fn send(&self, message: HostMessage) {
        self.messages.borrow_mut().push(message);
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    urls: RefCell<Vec<String>>,
}

impl RecordingOpener {
    pub fn urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }
}

impl ExternalOpener for RecordingOpener {
    fn open_external(&self, url: &str) {
        self.urls.borrow_mut().push(url.to_string());
    }
}

pub struct FixedLicense(Cell<bool>);

impl FixedLicense {
    pub fn new(valid: bool) -> Self {
        Self(Cell::new(valid))
    }

    pub fn set(&self, valid: bool) {
        self.0.set(valid);
    }
}

impl LicenseCheck for FixedLicense {
    fn is_valid(&self) -> bool {
        self.0.get()
    }
}

/// Fakes wired together around `https://mail.example.com/`
pub struct Fixture {
    pub windows: Rc<FakeWindowSystem>,
    pub host: Rc<RecordingHost>,
    pub opener: Rc<RecordingOpener>,
    pub license: Rc<FixedLicense>,
    pub config: Rc<ConfigStore>,
    pub urls: Rc<AppUrls>,
    pub user_stylesheet: PathBuf,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    pub fn with_config(mut config: ShellConfig) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        config.data_dir = dir.path().join("data");
        Self {
            windows: Rc::new(FakeWindowSystem::new()),
            host: Rc::new(RecordingHost::default()),
            opener: Rc::new(RecordingOpener::default()),
            license: Rc::new(FixedLicense::new(true)),
            config: Rc::new(ConfigStore::in_memory(config)),
            urls: Rc::new(AppUrls::for_app(Url::parse(TEST_APP_URL).expect("test url"))),
            user_stylesheet: dir.path().join("user.css"),
            _dir: dir,
        }
    }

    pub fn deps(&self) -> ShellDeps {
        ShellDeps {
            windows: self.windows.clone(),
            host: self.host.clone(),
            opener: self.opener.clone(),
            license: self.license.clone(),
            config: Rc::clone(&self.config),
            urls: Rc::clone(&self.urls),
            user_stylesheet: self.user_stylesheet.clone(),
        }
    }
}
