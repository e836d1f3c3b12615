//! wry-backed content surfaces
//!
//! A [`WrySurface`] may exist before its webview does: child windows are
//! materialized on the next event-loop turn, so calls made in between are
//! recorded and replayed once the webview is attached.
//!
//! Note: nothing here is `Send`. WebView handles are not thread-safe and
//! every call happens on the UI thread.

use crate::ipc::{SurfaceMessage, CONTENT_BRIDGE_JS};
use crate::UserEvent;
use mailwave_core::{Bounds, SurfaceId};
use mailwave_shell::{
    ContentSurface, Disposition, DisplayMediaResponse, EventResponse, FindResult, SurfaceEvent,
    SurfaceEventSink, WindowOpenRequest,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tao::event_loop::EventLoopProxy;
use tracing::{debug, info, warn};
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::{PageLoadEvent, Rect, WebView, WebViewBuilder};

/// Convert logical bounds to a wry [`Rect`]
pub fn make_rect(bounds: Bounds) -> Rect {
    Rect {
        position: LogicalPosition::new(bounds.x, bounds.y).into(),
        size: LogicalSize::new(bounds.width, bounds.height).into(),
    }
}

/// Evaluate a script on a WebView, ignoring failures
pub fn eval_script(webview: &WebView, script: &str) {
    let _ = webview.evaluate_script(script);
}

/// Quote `value` as a JavaScript string literal
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Back,
    Forward,
}

/// Back/forward availability of a surface.
///
/// wry exposes no history list, so committed loads and in-page navigations
/// are recorded here and traversals requested through the surface move the
/// cursor.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    entries: Vec<String>,
    index: Option<usize>,
    pending: Option<Traversal>,
}

impl HistoryTracker {
    pub fn begin_back(&mut self) {
        self.pending = Some(Traversal::Back);
    }

    pub fn begin_forward(&mut self) {
        self.pending = Some(Traversal::Forward);
    }

    /// Record a committed load of `url`
    pub fn commit(&mut self, url: &str) {
        match (self.pending.take(), self.index) {
            (Some(Traversal::Back), Some(index)) if index > 0 => {
                self.index = Some(index - 1);
                self.entries[index - 1] = url.to_string();
            }
            (Some(Traversal::Forward), Some(index)) if index + 1 < self.entries.len() => {
                self.index = Some(index + 1);
                self.entries[index + 1] = url.to_string();
            }
            _ => {
                if self.current() == Some(url) {
                    return;
                }
                let next = self.index.map_or(0, |index| index + 1);
                self.entries.truncate(next);
                self.entries.push(url.to_string());
                self.index = Some(next);
            }
        }
    }

    /// Record a rewrite of the current entry (`history.replaceState`)
    pub fn replace(&mut self, url: &str) {
        match self.index.and_then(|index| self.entries.get_mut(index)) {
            Some(entry) => *entry = url.to_string(),
            None => self.commit(url),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.index
            .and_then(|index| self.entries.get(index))
            .map(String::as_str)
    }

    pub fn can_go_back(&self) -> bool {
        self.index.is_some_and(|index| index > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.index
            .is_some_and(|index| index + 1 < self.entries.len())
    }
}

/// State shared between a surface and its webview callbacks
struct SurfaceShared {
    id: SurfaceId,
    partition: String,
    sink: RefCell<Option<SurfaceEventSink>>,
    history: RefCell<HistoryTracker>,
    current_url: RefCell<Option<String>>,
    loading: Cell<bool>,
}

impl SurfaceShared {
    fn emit(&self, event: SurfaceEvent) -> EventResponse {
        // Clone the sink out so a handler may replace it while running
        let sink = self.sink.borrow().clone();
        match sink {
            Some(sink) => sink(event),
            None => EventResponse::Proceed,
        }
    }

    fn committed(&self, url: String) {
        self.history.borrow_mut().commit(&url);
        *self.current_url.borrow_mut() = Some(url.clone());
        self.emit(SurfaceEvent::DidNavigate { url });
        self.emit(SurfaceEvent::DocumentReady);
    }

    fn navigated_in_page(&self, url: String, replace: bool) {
        {
            let mut history = self.history.borrow_mut();
            if replace {
                history.replace(&url);
            } else {
                history.commit(&url);
            }
        }
        *self.current_url.borrow_mut() = Some(url.clone());
        self.emit(SurfaceEvent::DidNavigateInPage { url });
    }
}

/// Calls made before the webview exists
#[derive(Debug, Default)]
struct Deferred {
    url: Option<String>,
    bounds: Option<Bounds>,
    visible: Option<bool>,
    zoom: Option<f64>,
}

pub struct WrySurface {
    shared: Rc<SurfaceShared>,
    webview: RefCell<Option<WebView>>,
    deferred: RefCell<Deferred>,
    closed: Cell<bool>,
}

impl WrySurface {
    pub fn new(partition: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(SurfaceShared {
                id: SurfaceId::new(),
                partition: partition.into(),
                sink: RefCell::new(None),
                history: RefCell::new(HistoryTracker::default()),
                current_url: RefCell::new(None),
                loading: Cell::new(false),
            }),
            webview: RefCell::new(None),
            deferred: RefCell::new(Deferred::default()),
            closed: Cell::new(false),
        }
    }

    /// Wire the engine callbacks of `builder` to this surface
    pub fn configure<'a>(
        &self,
        builder: WebViewBuilder<'a>,
        proxy: &EventLoopProxy<UserEvent>,
    ) -> WebViewBuilder<'a> {
        let navigation = Rc::clone(&self.shared);
        let page_load = Rc::clone(&self.shared);
        let title = Rc::clone(&self.shared);
        let new_window = Rc::clone(&self.shared);
        let ipc = Rc::clone(&self.shared);
        let proxy = proxy.clone();

        builder
            .with_devtools(cfg!(debug_assertions))
            .with_clipboard(true)
            .with_initialization_script(CONTENT_BRIDGE_JS)
            .with_navigation_handler(move |url| {
                // wry reports redirects through the same callback; a
                // navigation starting while a load is running is one.
                let event = if navigation.loading.get() {
                    SurfaceEvent::WillRedirect { url }
                } else {
                    SurfaceEvent::WillNavigate { url }
                };
                navigation.emit(event) == EventResponse::Proceed
            })
            .with_on_page_load_handler(move |event, url| match event {
                PageLoadEvent::Started => page_load.loading.set(true),
                PageLoadEvent::Finished => {
                    page_load.loading.set(false);
                    page_load.committed(url);
                }
            })
            .with_document_title_changed_handler(move |text| {
                title.emit(SurfaceEvent::TitleChanged(text));
            })
            .with_new_window_req_handler(move |url| {
                debug!("New window request: {}", url);
                // The engine never opens the popup itself; the shell creates
                // whatever window the request is routed to.
                new_window.emit(SurfaceEvent::NewWindow(WindowOpenRequest::new(
                    url,
                    Disposition::Foreground,
                )));
                false
            })
            .with_ipc_handler(move |request| {
                let body = request.body();
                let message = match serde_json::from_str::<SurfaceMessage>(body) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Ignoring surface IPC {}: {}", body, e);
                        return;
                    }
                };
                match message {
                    SurfaceMessage::FoundInPage {
                        matches,
                        active_match_ordinal,
                        final_update,
                    } => {
                        ipc.emit(SurfaceEvent::FoundInPage(FindResult {
                            matches,
                            active_match_ordinal,
                            final_update,
                        }));
                    }
                    SurfaceMessage::DidNavigateInPage { url, replace } => {
                        ipc.navigated_in_page(url, replace);
                    }
                    message => {
                        let _ = proxy.send_event(UserEvent::Surface {
                            surface: ipc.id,
                            partition: ipc.partition.clone(),
                            message,
                        });
                    }
                }
            })
    }

    /// Take ownership of the built webview and replay deferred calls
    pub fn attach_webview(&self, webview: WebView) {
        let deferred = std::mem::take(&mut *self.deferred.borrow_mut());
        if let Some(bounds) = deferred.bounds {
            let _ = webview.set_bounds(make_rect(bounds));
        }
        if let Some(visible) = deferred.visible {
            let _ = webview.set_visible(visible);
        }
        if let Some(zoom) = deferred.zoom {
            let _ = webview.zoom(zoom);
        }
        *self.webview.borrow_mut() = Some(webview);
        if let Some(url) = deferred.url {
            self.load_url(&url);
        }
    }

    /// URL the webview should start on, if one was requested before it existed
    pub fn take_deferred_url(&self) -> Option<String> {
        self.deferred.borrow_mut().url.take()
    }

    pub fn evaluate_script(&self, script: &str) {
        if let Some(webview) = self.webview.borrow().as_ref() {
            eval_script(webview, script);
        }
    }

    /// Answer a display-media request raised by the content bridge
    pub fn resolve_display_media(&self, request_id: u64, response: &DisplayMediaResponse) {
        let verdict = match response {
            DisplayMediaResponse::Source(_) | DisplayMediaResponse::UseSystemPicker => "capture",
            DisplayMediaResponse::Empty => "deny",
        };
        self.evaluate_script(&format!(
            "window.__mailwave && window.__mailwave.resolveDisplayMedia({}, '{}');",
            request_id, verdict
        ));
    }

    /// Answer a permission request raised by the content bridge
    pub fn resolve_permission(&self, request_id: u64, granted: bool) {
        self.evaluate_script(&format!(
            "window.__mailwave && window.__mailwave.resolvePermission({}, {});",
            request_id, granted
        ));
    }
}

impl ContentSurface for WrySurface {
    fn id(&self) -> SurfaceId {
        self.shared.id
    }

    fn load_url(&self, url: &str) {
        match self.webview.borrow().as_ref() {
            Some(webview) => {
                if let Err(e) = webview.load_url(url) {
                    warn!("Failed to load {}: {}", url, e);
                }
            }
            None => self.deferred.borrow_mut().url = Some(url.to_string()),
        }
    }

    fn url(&self) -> Option<String> {
        if let Some(url) = self.shared.current_url.borrow().clone() {
            return Some(url);
        }
        if let Some(url) = self.deferred.borrow().url.clone() {
            return Some(url);
        }
        self.webview
            .borrow()
            .as_ref()
            .and_then(|webview| webview.url().ok())
    }

    fn reload(&self) {
        if let Some(webview) = self.webview.borrow().as_ref() {
            let _ = webview.reload();
        }
    }

    fn go_back(&self) {
        self.shared.history.borrow_mut().begin_back();
        self.evaluate_script("history.back();");
    }

    fn go_forward(&self) {
        self.shared.history.borrow_mut().begin_forward();
        self.evaluate_script("history.forward();");
    }

    fn can_go_back(&self) -> bool {
        self.shared.history.borrow().can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.shared.history.borrow().can_go_forward()
    }

    fn insert_css(&self, css: &str) {
        self.evaluate_script(&format!(
            "(function(){{var s=document.createElement('style');s.textContent={};\
             (document.head||document.documentElement).appendChild(s);}})();",
            js_string(css)
        ));
    }

    fn set_bounds(&self, bounds: Bounds) {
        match self.webview.borrow().as_ref() {
            Some(webview) => {
                let _ = webview.set_bounds(make_rect(bounds));
            }
            None => self.deferred.borrow_mut().bounds = Some(bounds),
        }
    }

    fn set_visible(&self, visible: bool) {
        match self.webview.borrow().as_ref() {
            Some(webview) => {
                let _ = webview.set_visible(visible);
            }
            None => self.deferred.borrow_mut().visible = Some(visible),
        }
    }

    fn set_zoom(&self, factor: f64) {
        match self.webview.borrow().as_ref() {
            Some(webview) => {
                let _ = webview.zoom(factor);
            }
            None => self.deferred.borrow_mut().zoom = Some(factor),
        }
    }

    fn find_in_page(&self, text: &str, forward: bool) {
        self.evaluate_script(&format!(
            "window.__mailwave && window.__mailwave.find({}, {});",
            js_string(text),
            forward
        ));
    }

    fn stop_find_in_page(&self) {
        self.evaluate_script("window.__mailwave && window.__mailwave.stopFind();");
    }

    fn download_url(&self, url: &str) {
        // Routed through an anchor so the engine's download handling applies
        self.evaluate_script(&format!(
            "(function(){{var a=document.createElement('a');a.href={};a.download='';\
             document.body.appendChild(a);a.click();a.remove();}})();",
            js_string(url)
        ));
    }

    fn set_event_sink(&self, sink: Option<SurfaceEventSink>) {
        *self.shared.sink.borrow_mut() = sink;
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        info!("Closing surface {:?}", self.shared.id);
        *self.shared.sink.borrow_mut() = None;
        let webview = self.webview.borrow_mut().take();
        drop(webview);
    }
}
