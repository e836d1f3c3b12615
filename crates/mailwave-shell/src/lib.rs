//! Mailwave shell - per-account views, child windows, permissions and screen sharing
//!
//! Everything here is single-threaded and backend agnostic. A windowing
//! backend implements the traits in [`host`] and drives a
//! [`ViewController`] per account.

pub mod controller;
pub mod host;
pub mod registry;
pub mod router;
pub mod screen_share;
pub mod session;
pub mod state;
pub mod styles;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{NavigationDirection, ShellDeps, ViewController, TITLEBAR_HEIGHT};
pub use host::{
    ContentSurface, Disposition, EventResponse, ExternalOpener, FindResult, HostChannel,
    HostMessage, LicenseCheck, NativeWindow, SessionHandlers, SurfaceEvent, SurfaceEventSink,
    WindowHandlers, WindowOpenRequest, WindowSpec, WindowSystem,
};
pub use registry::ChildWindowRegistry;
pub use router::{WindowOpenDecision, WindowOpenRouter, CHILD_WINDOW_SIZE};
pub use screen_share::{
    DesktopSource, DisplayMediaResponse, PendingDisplayMedia, ScreenShareNegotiator, PICKER_URL,
};
pub use session::{BrowsingSession, PermissionKind, PermissionRequest, PermissionResponse};
pub use state::{
    NavigationHistory, ObservableState, StatePatch, StateStore, Subscription, UnreadCount,
};
