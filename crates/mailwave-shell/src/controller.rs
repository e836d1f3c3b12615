//! View controller: one account's primary content surface
//!
//! The controller owns the account's surface, browsing session, child
//! window registry and window-open router, and turns surface lifecycle
//! events into [`ObservableState`] updates.

use crate::host::{
    ContentSurface, EventResponse, ExternalOpener, HostChannel, HostMessage, LicenseCheck,
    NativeWindow, SurfaceEvent, WindowSystem,
};
use crate::registry::ChildWindowRegistry;
use crate::router::WindowOpenRouter;
use crate::session::BrowsingSession;
use crate::state::{NavigationHistory, ObservableState, StatePatch, StateStore, Subscription};
use crate::styles::{UserStylesheet, APP_STYLESHEET, SHELL_STYLESHEET};
use mailwave_core::{AccountConfig, AccountId, AppUrls, Bounds, ConfigStore};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

/// Height of the shell title bar above the content surface, in logical pixels
pub const TITLEBAR_HEIGHT: u32 = 32;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Collaborators shared by every controller of the shell
#[derive(Clone)]
pub struct ShellDeps {
    pub windows: Rc<dyn WindowSystem>,
    pub host: Rc<dyn HostChannel>,
    pub opener: Rc<dyn ExternalOpener>,
    pub license: Rc<dyn LicenseCheck>,
    pub config: Rc<ConfigStore>,
    pub urls: Rc<AppUrls>,
    pub user_stylesheet: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    Back,
    Forward,
}

pub struct ViewController {
    account: AccountId,
    deps: ShellDeps,
    session: Rc<BrowsingSession>,
    registry: Rc<ChildWindowRegistry>,
    router: Rc<WindowOpenRouter>,
    surface: RefCell<Option<Rc<dyn ContentSurface>>>,
    state: StateStore,
    user_stylesheet: UserStylesheet,
    passkey_notice_shown: Cell<bool>,
    host_forwarding: RefCell<Option<Subscription>>,
}

impl ViewController {
    /// Create the account's session and primary surface, attach it to the
    /// host window and start loading the mail application.
    pub fn new(deps: ShellDeps, account: &AccountConfig) -> Rc<Self> {
        log::info!("Creating view controller for account {}", account.id);

        let registry = Rc::new(ChildWindowRegistry::new());
        let session = BrowsingSession::new(
            account.id.clone(),
            Rc::clone(&deps.config),
            Rc::clone(&deps.urls),
            Rc::clone(&deps.windows),
            Rc::clone(&registry),
        );
        session.install(deps.windows.as_ref());

        let router = WindowOpenRouter::new(&deps, session.partition(), Rc::clone(&registry));
        let surface = deps.windows.create_surface(session.partition());
        let user_stylesheet = UserStylesheet::new(deps.user_stylesheet.clone());

        let controller = Rc::new(Self {
            account: account.id.clone(),
            session,
            registry,
            router,
            surface: RefCell::new(Some(Rc::clone(&surface))),
            state: StateStore::new(ObservableState::new(account.unread_badge)),
            user_stylesheet,
            passkey_notice_shown: Cell::new(false),
            host_forwarding: RefCell::new(None),
            deps,
        });

        let host = Rc::clone(&controller.deps.host);
        let forwarded_account = account.id.clone();
        let forwarding = controller.state.subscribe(move |state, previous| {
            host.send(HostMessage::StateChanged {
                account: forwarded_account.clone(),
                state: state.clone(),
                previous: previous.clone(),
            });
        });
        *controller.host_forwarding.borrow_mut() = Some(forwarding);

        let weak = Rc::downgrade(&controller);
        surface.set_event_sink(Some(Rc::new(move |event: SurfaceEvent| {
            match weak.upgrade() {
                Some(controller) => controller.handle_event(event),
                None => EventResponse::Proceed,
            }
        })));
        controller.deps.windows.attach_surface(surface.as_ref());
        controller.update_view_bounds();
        controller.load_initial_url();

        controller
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn session(&self) -> &Rc<BrowsingSession> {
        &self.session
    }

    pub fn registry(&self) -> &Rc<ChildWindowRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Rc<WindowOpenRouter> {
        &self.router
    }

    /// The primary content surface.
    ///
    /// # Panics
    ///
    /// Panics once the controller has been destroyed.
    pub fn surface(&self) -> Rc<dyn ContentSurface> {
        match self.surface.borrow().as_ref() {
            Some(surface) => Rc::clone(surface),
            None => panic!(
                "content surface of account {} accessed after destroy",
                self.account
            ),
        }
    }

    pub fn state(&self) -> ObservableState {
        self.state.get()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ObservableState, &ObservableState) + 'static,
    ) -> Subscription {
        self.state.subscribe(listener)
    }

    /// Merge `patch` into the state and notify subscribers
    pub fn set_state(&self, patch: StatePatch) -> ObservableState {
        self.state.apply(&patch)
    }

    pub fn set_unread_count(&self, count: u32) {
        if !self.state.get().unread_count.is_enabled() {
            return;
        }
        self.set_state(StatePatch::unread_count(count));
    }

    /// Unread count reported by the page itself. Pages off the canonical
    /// origin have nothing unread, so their reports are dropped.
    pub fn report_unread_count(&self, count: u32) {
        let on_app = self
            .surface()
            .url()
            .is_some_and(|url| self.deps.urls.is_canonical(&url));
        if !on_app {
            log::debug!("Ignoring unread count {} reported off the app origin", count);
            return;
        }
        self.set_unread_count(count);
    }

    /// Fit the surface to the host content area below the title bar
    pub fn update_view_bounds(&self) {
        let area = self.deps.windows.host_content_size();
        self.surface()
            .set_bounds(Bounds::below_top_inset(area, TITLEBAR_HEIGHT));
    }

    pub fn go(&self, direction: NavigationDirection) {
        let surface = self.surface();
        match direction {
            NavigationDirection::Back if surface.can_go_back() => surface.go_back(),
            NavigationDirection::Forward if surface.can_go_forward() => surface.go_forward(),
            _ => log::debug!("Cannot go {:?} in account {}", direction, self.account),
        }
    }

    pub fn reload(&self) {
        self.surface().reload();
    }

    pub fn set_visible(&self, visible: bool) {
        self.surface().set_visible(visible);
    }

    /// Set the zoom factor, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`]
    pub fn set_zoom(&self, factor: f64) -> f64 {
        let factor = factor.clamp(MIN_ZOOM, MAX_ZOOM);
        self.surface().set_zoom(factor);
        factor
    }

    pub fn find_in_page(&self, text: &str, forward: bool) {
        if text.is_empty() {
            self.stop_find_in_page();
            return;
        }
        self.surface().find_in_page(text, forward);
    }

    pub fn stop_find_in_page(&self) {
        self.surface().stop_find_in_page();
    }

    /// Open the compose view for a `mailto:` link in a separate window of
    /// this account's session
    pub fn mailto_compose(&self, mailto: &str) -> Rc<dyn NativeWindow> {
        let url = self.deps.urls.compose_url(mailto);
        self.router.open_untracked(url.as_str())
    }

    /// Tear down the primary surface. Calling this twice panics.
    pub fn destroy(&self) {
        let surface = self.surface();
        log::info!("Destroying view controller for account {}", self.account);

        if let Some(forwarding) = self.host_forwarding.borrow_mut().take() {
            forwarding.unsubscribe();
        }
        self.session.screen_share().cancel();

        surface.set_event_sink(None);
        surface.close();
        self.deps.windows.detach_surface(surface.as_ref());
        *self.surface.borrow_mut() = None;
    }

    /// React to a lifecycle event of the primary surface
    pub fn handle_event(&self, event: SurfaceEvent) -> EventResponse {
        match event {
            SurfaceEvent::DocumentReady => {
                self.inject_styles();
                EventResponse::Proceed
            }
            SurfaceEvent::TitleChanged(title) => {
                self.set_state(StatePatch::title(title));
                EventResponse::Proceed
            }
            SurfaceEvent::WillNavigate { .. } => EventResponse::Proceed,
            SurfaceEvent::DidNavigate { url } => {
                self.did_navigate(&url);
                EventResponse::Proceed
            }
            SurfaceEvent::DidNavigateInPage { .. } => {
                self.set_state(StatePatch::navigation_history(self.navigation_history()));
                EventResponse::Proceed
            }
            SurfaceEvent::WillRedirect { url } => self.will_redirect(&url),
            SurfaceEvent::FoundInPage(result) => {
                self.deps.host.send(HostMessage::FindInPage {
                    account: self.account.clone(),
                    result,
                });
                EventResponse::Proceed
            }
            SurfaceEvent::NewWindow(request) => {
                let surface = self.surface();
                self.router.handle(surface.as_ref(), request)
            }
        }
    }

    fn load_initial_url(&self) {
        let ui = self.deps.config.ui();
        let reverse_conversation = ui.reverse_conversation && self.deps.license.is_valid();
        let url = self
            .deps
            .urls
            .initial_url(ui.hide_logo, ui.hide_footer, reverse_conversation);
        log::debug!("Loading {} for account {}", url, self.account);
        self.surface().load_url(url.as_str());
    }

    fn navigation_history(&self) -> NavigationHistory {
        let surface = self.surface();
        NavigationHistory {
            can_go_back: surface.can_go_back(),
            can_go_forward: surface.can_go_forward(),
        }
    }

    fn inject_styles(&self) {
        let surface = self.surface();
        let on_app = surface
            .url()
            .is_some_and(|url| self.deps.urls.is_canonical(&url));

        if on_app {
            surface.insert_css(APP_STYLESHEET);
            if self.deps.license.is_valid() {
                if let Some(css) = self.user_stylesheet.contents() {
                    surface.insert_css(css);
                }
            }
        }
        surface.insert_css(SHELL_STYLESHEET);
    }

    fn did_navigate(&self, url: &str) {
        let on_app = self.deps.urls.is_canonical(url);
        let mut patch = StatePatch::navigation_history(self.navigation_history())
            .with_attention_required(!on_app);
        if !on_app && self.state.get().unread_count.is_enabled() {
            patch = patch.with_unread_count(0);
        }
        self.set_state(patch);

        if self.deps.urls.is_passkey_challenge(url) && !self.passkey_notice_shown.replace(true) {
            log::info!("Passkey sign-in requested for account {}", self.account);
            self.deps.host.send(HostMessage::ShowNotice {
                title: "Passkeys are not supported".to_string(),
                message: "Choose another way to sign in, such as your password.".to_string(),
            });
        }
    }

    fn will_redirect(&self, url: &str) -> EventResponse {
        if !self.deps.urls.is_bare_web_search(url) {
            return EventResponse::Proceed;
        }
        // Signing out lands on the bare search page; send the user back to
        // the mail sign-in instead.
        let sign_in = self.deps.urls.sign_in_url.as_str();
        log::info!("Redirect to {} replaced with {}", url, sign_in);
        self.surface().load_url(sign_in);
        EventResponse::Cancel
    }
}
