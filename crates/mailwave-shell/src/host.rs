//! Seams between the orchestration core and the windowing backend
//!
//! The core never talks to a webview engine directly. A backend implements
//! [`WindowSystem`], [`ContentSurface`] and [`NativeWindow`] and forwards every
//! engine callback as a [`SurfaceEvent`].
//!
//! Note: none of these traits are `Send`. Webview handles are not thread-safe
//! and every call happens on the UI thread.

use crate::screen_share::PendingDisplayMedia;
use crate::session::{PermissionRequest, PermissionResponse};
use crate::state::ObservableState;
use mailwave_core::{AccountId, Bounds, Size, SurfaceId, WindowId};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Hint accompanying a new-context request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Foreground,
    Background,
    NewWindow,
    Other,
}

/// A request to open a new browsing context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOpenRequest {
    pub url: String,
    pub disposition: Disposition,
}

impl WindowOpenRequest {
    pub fn new(url: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            url: url.into(),
            disposition,
        }
    }
}

/// In-page search results reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindResult {
    pub matches: u32,
    pub active_match_ordinal: u32,
    pub final_update: bool,
}

/// Lifecycle events of a content surface or window
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The document finished loading and can take injected styles
    DocumentReady,
    TitleChanged(String),
    /// A navigation is about to start; cancellable
    WillNavigate { url: String },
    /// A main-frame navigation committed
    DidNavigate { url: String },
    /// A same-document navigation (fragment or history API)
    DidNavigateInPage { url: String },
    /// A server redirect is about to be followed; cancellable
    WillRedirect { url: String },
    FoundInPage(FindResult),
    /// The page asked for a new browsing context
    NewWindow(WindowOpenRequest),
}

/// Answer to a [`SurfaceEvent`]
///
/// For [`SurfaceEvent::NewWindow`], `Proceed` means a browsing context was
/// created for the request and `Cancel` means none was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Proceed,
    Cancel,
}

pub type SurfaceEventSink = Rc<dyn Fn(SurfaceEvent) -> EventResponse>;

/// An embedded view rendering web content
pub trait ContentSurface {
    fn id(&self) -> SurfaceId;

    fn load_url(&self, url: &str);

    /// Current URL (if available)
    fn url(&self) -> Option<String>;

    fn reload(&self);

    fn go_back(&self);

    fn go_forward(&self);

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    fn insert_css(&self, css: &str);

    fn set_bounds(&self, bounds: Bounds);

    fn set_visible(&self, visible: bool);

    /// Set zoom level (1.0 = 100%)
    fn set_zoom(&self, factor: f64);

    fn find_in_page(&self, text: &str, forward: bool);

    fn stop_find_in_page(&self);

    /// Download `url` without navigating
    fn download_url(&self, url: &str);

    /// Route lifecycle events to `sink`; `None` drops every subscription
    fn set_event_sink(&self, sink: Option<SurfaceEventSink>);

    /// Close the underlying content process
    fn close(&self);
}

/// A native top-level window hosting one content surface
pub trait NativeWindow {
    fn id(&self) -> WindowId;

    fn surface(&self) -> &dyn ContentSurface;

    fn focus(&self);

    /// Close the window; the backend reports it through `on_closed`
    fn close(&self);
}

/// Options for [`WindowSystem::open_window`]
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub url: String,
    pub size: Size,
    /// Storage partition the window's surface is created in
    pub partition: String,
    pub parent: Option<WindowId>,
    pub title: Option<String>,
    pub visible: bool,
}

impl WindowSpec {
    pub fn new(url: impl Into<String>, size: Size, partition: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size,
            partition: partition.into(),
            parent: None,
            title: None,
            visible: true,
        }
    }
}

pub type WindowEventHandler = Rc<dyn Fn(&dyn NativeWindow, SurfaceEvent) -> EventResponse>;
pub type WindowClosedHandler = Rc<dyn Fn(WindowId)>;

/// Callbacks a backend invokes for one native window
#[derive(Clone, Default)]
pub struct WindowHandlers {
    /// Lifecycle events of the window's surface; unhandled events proceed
    pub on_event: Option<WindowEventHandler>,
    /// Fired once, after the window has closed
    pub on_closed: Option<WindowClosedHandler>,
}

impl WindowHandlers {
    pub fn dispatch(&self, window: &dyn NativeWindow, event: SurfaceEvent) -> EventResponse {
        match &self.on_event {
            Some(handler) => handler(window, event),
            None => EventResponse::Proceed,
        }
    }

    pub fn closed(&self, id: WindowId) {
        if let Some(handler) = &self.on_closed {
            handler(id);
        }
    }
}

pub type PermissionHandler = Rc<dyn Fn(&PermissionRequest) -> PermissionResponse>;
pub type DisplayMediaHandler = Rc<dyn Fn() -> PendingDisplayMedia>;

/// Session-level callbacks shared by every surface of a partition
#[derive(Clone)]
pub struct SessionHandlers {
    pub on_permission: PermissionHandler,
    pub on_display_media: DisplayMediaHandler,
}

/// Creates surfaces and windows, and owns the host window
pub trait WindowSystem {
    /// Create a surface in `partition`, not yet attached to the host window
    fn create_surface(&self, partition: &str) -> Rc<dyn ContentSurface>;

    fn attach_surface(&self, surface: &dyn ContentSurface);

    fn detach_surface(&self, surface: &dyn ContentSurface);

    /// Size of the host window's content area
    fn host_content_size(&self) -> Size;

    fn open_window(&self, spec: WindowSpec, handlers: WindowHandlers) -> Rc<dyn NativeWindow>;

    /// Install permission and display-media handlers for `partition`
    fn set_session_handlers(&self, partition: &str, handlers: SessionHandlers);
}

/// Outbound messages on the host control channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostMessage {
    StateChanged {
        account: AccountId,
        state: ObservableState,
        previous: ObservableState,
    },
    FindInPage {
        account: AccountId,
        result: FindResult,
    },
    /// Present the add-account flow of the settings UI
    ShowAddAccount,
    ShowNotice {
        title: String,
        message: String,
    },
}

/// Sink for [`HostMessage`]s
pub trait HostChannel {
    fn send(&self, message: HostMessage);
}

/// Opens URLs in the user's default browser
pub trait ExternalOpener {
    fn open_external(&self, url: &str);
}

/// License validity, consulted at every decision point
pub trait LicenseCheck {
    fn is_valid(&self) -> bool;
}
