//! Routing of new-window requests coming from web content

use crate::controller::ShellDeps;
use crate::host::{
    ContentSurface, Disposition, EventResponse, ExternalOpener, HostChannel, HostMessage,
    LicenseCheck, NativeWindow, SurfaceEvent, WindowClosedHandler, WindowHandlers,
    WindowOpenRequest, WindowSpec, WindowSystem,
};
use crate::registry::ChildWindowRegistry;
use mailwave_core::urls::{host_of, BLANK_URL};
use mailwave_core::{AppUrls, Size, WindowId};
use std::rc::{Rc, Weak};

/// Size of windows opened for companion apps and app links
pub const CHILD_WINDOW_SIZE: Size = Size::new(800, 600);

/// Outcome of routing a [`WindowOpenRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOpenDecision {
    /// Allow a blank context that hands its first real navigation to the
    /// external browser
    ExternalOnFirstNavigation,
    /// Reuse the tracked window already showing that companion app
    FocusExisting(WindowId),
    OpenChild,
    AddAccount,
    Download,
    OpenExternal,
}

impl WindowOpenDecision {
    /// Whether the request gets a new browsing context
    pub fn creates_context(self) -> bool {
        matches!(self, Self::ExternalOnFirstNavigation | Self::OpenChild)
    }
}

pub struct WindowOpenRouter {
    this: Weak<Self>,
    windows: Rc<dyn WindowSystem>,
    host: Rc<dyn HostChannel>,
    opener: Rc<dyn ExternalOpener>,
    license: Rc<dyn LicenseCheck>,
    urls: Rc<AppUrls>,
    partition: String,
    registry: Rc<ChildWindowRegistry>,
}

impl WindowOpenRouter {
    pub fn new(
        deps: &ShellDeps,
        partition: impl Into<String>,
        registry: Rc<ChildWindowRegistry>,
    ) -> Rc<Self> {
        let partition = partition.into();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            windows: Rc::clone(&deps.windows),
            host: Rc::clone(&deps.host),
            opener: Rc::clone(&deps.opener),
            license: Rc::clone(&deps.license),
            urls: Rc::clone(&deps.urls),
            partition,
            registry,
        })
    }

    pub fn registry(&self) -> &Rc<ChildWindowRegistry> {
        &self.registry
    }

    /// Decide what to do with `request` without side effects
    pub fn decide(&self, request: &WindowOpenRequest) -> WindowOpenDecision {
        let url = request.url.as_str();

        if url == BLANK_URL {
            return WindowOpenDecision::ExternalOnFirstNavigation;
        }

        let companion = self.urls.is_companion_app(url);
        let in_app = self.urls.is_canonical(url)
            || self.urls.is_direct_render(url)
            || (companion && self.license.is_valid());

        if in_app && request.disposition != Disposition::Background {
            if companion {
                let existing = host_of(url).and_then(|host| self.registry.find_by_host(&host));
                if let Some(window) = existing {
                    return WindowOpenDecision::FocusExisting(window.id());
                }
            }
            return WindowOpenDecision::OpenChild;
        }

        if self.urls.is_add_account(url) {
            return WindowOpenDecision::AddAccount;
        }

        if self.urls.is_attachment_download(url) {
            return WindowOpenDecision::Download;
        }

        WindowOpenDecision::OpenExternal
    }

    /// Route `request` raised by `opener` and perform the side effects.
    ///
    /// Returns [`EventResponse::Proceed`] exactly when a browsing context was
    /// created for the request.
    pub fn handle(&self, opener: &dyn ContentSurface, request: WindowOpenRequest) -> EventResponse {
        let decision = self.decide(&request);
        log::debug!(
            "Window open {} ({:?}) -> {:?}",
            request.url,
            request.disposition,
            decision
        );

        match decision {
            WindowOpenDecision::ExternalOnFirstNavigation => {
                self.open_blank_popup();
                EventResponse::Proceed
            }
            WindowOpenDecision::FocusExisting(id) => match self.registry.get(id) {
                Some(window) => {
                    window.surface().load_url(&request.url);
                    window.focus();
                    EventResponse::Cancel
                }
                None => {
                    self.open_child(&request.url);
                    EventResponse::Proceed
                }
            },
            WindowOpenDecision::OpenChild => {
                self.open_child(&request.url);
                EventResponse::Proceed
            }
            WindowOpenDecision::AddAccount => {
                self.host.send(HostMessage::ShowAddAccount);
                EventResponse::Cancel
            }
            WindowOpenDecision::Download => {
                opener.download_url(&request.url);
                EventResponse::Cancel
            }
            WindowOpenDecision::OpenExternal => {
                self.opener.open_external(&request.url);
                EventResponse::Cancel
            }
        }
    }

    /// Open a tracked child window on `url`. New-window requests from the
    /// child go through this router as well.
    pub fn open_child(&self, url: &str) -> Rc<dyn NativeWindow> {
        let spec = WindowSpec::new(url, CHILD_WINDOW_SIZE, self.partition.as_str());
        let window = self.windows.open_window(spec, self.child_handlers(true));
        log::info!("Opened child window {:?} for {}", window.id(), url);
        self.registry.insert(Rc::clone(&window));
        window
    }

    /// Open a window on `url` that routes its new-window requests here but is
    /// never tracked
    pub fn open_untracked(&self, url: &str) -> Rc<dyn NativeWindow> {
        let spec = WindowSpec::new(url, CHILD_WINDOW_SIZE, self.partition.as_str());
        let window = self.windows.open_window(spec, self.child_handlers(false));
        log::info!("Opened window {:?} for {}", window.id(), url);
        window
    }

    fn child_handlers(&self, tracked: bool) -> WindowHandlers {
        let router = self.this.clone();
        let registry = Rc::downgrade(&self.registry);
        let on_closed: Option<WindowClosedHandler> = tracked.then(|| {
            Rc::new(move |id: WindowId| {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(id);
                }
            }) as WindowClosedHandler
        });
        WindowHandlers {
            on_event: Some(Rc::new(
                move |window: &dyn NativeWindow, event: SurfaceEvent| match event {
                    SurfaceEvent::NewWindow(request) => match router.upgrade() {
                        Some(router) => router.handle(window.surface(), request),
                        None => EventResponse::Cancel,
                    },
                    _ => EventResponse::Proceed,
                },
            )),
            on_closed,
        }
    }

    /// Hidden, untracked window for `about:blank` popups. Scripts commonly
    /// open a blank window and then point it somewhere; that first real
    /// navigation goes to the external browser instead.
    fn open_blank_popup(&self) {
        let mut spec = WindowSpec::new(BLANK_URL, CHILD_WINDOW_SIZE, self.partition.as_str());
        spec.visible = false;

        let opener = Rc::clone(&self.opener);
        let handlers = WindowHandlers {
            on_event: Some(Rc::new(
                move |window: &dyn NativeWindow, event: SurfaceEvent| match event {
                    SurfaceEvent::WillNavigate { url } | SurfaceEvent::WillRedirect { url }
                        if url != BLANK_URL =>
                    {
                        log::debug!("Blank popup navigated to {}, opening externally", url);
                        opener.open_external(&url);
                        window.close();
                        EventResponse::Cancel
                    }
                    SurfaceEvent::NewWindow(_) => EventResponse::Cancel,
                    _ => EventResponse::Proceed,
                },
            )),
            on_closed: None,
        };

        let window = self.windows.open_window(spec, handlers);
        log::debug!("Opened blank popup {:?}", window.id());
    }
}
