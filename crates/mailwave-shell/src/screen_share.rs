//! Display-media negotiation through a picker window
//!
//! A negotiation is settled by whichever comes first: the picker reporting a
//! source, or the picker window closing. Settling takes the pending slot, so
//! the losing path finds nothing to resolve.

use crate::host::{NativeWindow, WindowHandlers, WindowSpec, WindowSystem};
use crate::registry::ChildWindowRegistry;
use futures::channel::oneshot;
use mailwave_core::{AppUrls, ConfigStore, ScreenSharePickerMode, Size, WindowId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Address of the picker page; backends serve it themselves
pub const PICKER_URL: &str = "mailwave://screen-share-picker";

const PICKER_SIZE: Size = Size::new(720, 520);

/// Opaque capture source chosen in the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSource {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMediaResponse {
    Source(DesktopSource),
    /// No capture
    Empty,
    /// Let the engine show its own picker
    UseSystemPicker,
}

/// Resolves once the negotiation settles. A dropped negotiation resolves to
/// [`DisplayMediaResponse::Empty`].
pub struct PendingDisplayMedia {
    receiver: oneshot::Receiver<DisplayMediaResponse>,
}

impl PendingDisplayMedia {
    fn ready(response: DisplayMediaResponse) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(response);
        Self { receiver }
    }

    pub fn empty() -> Self {
        Self::ready(DisplayMediaResponse::Empty)
    }
}

impl Future for PendingDisplayMedia {
    type Output = DisplayMediaResponse;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(DisplayMediaResponse::Empty))
    }
}

struct Negotiation {
    picker: Rc<dyn NativeWindow>,
    respond: oneshot::Sender<DisplayMediaResponse>,
}

type PendingSlot = RefCell<Option<Negotiation>>;

pub struct ScreenShareNegotiator {
    partition: String,
    urls: Rc<AppUrls>,
    config: Rc<ConfigStore>,
    windows: Rc<dyn WindowSystem>,
    registry: Rc<ChildWindowRegistry>,
    pending: Rc<PendingSlot>,
}

impl ScreenShareNegotiator {
    pub fn new(
        partition: String,
        urls: Rc<AppUrls>,
        config: Rc<ConfigStore>,
        windows: Rc<dyn WindowSystem>,
        registry: Rc<ChildWindowRegistry>,
    ) -> Self {
        Self {
            partition,
            urls,
            config,
            windows,
            registry,
            pending: Rc::new(RefCell::new(None)),
        }
    }

    /// Start a negotiation for a display-media request.
    ///
    /// Only one negotiation runs per session; a request arriving while a
    /// picker is open resolves empty right away.
    pub fn request(&self) -> PendingDisplayMedia {
        if self.config.screen_share_picker() == ScreenSharePickerMode::System {
            return PendingDisplayMedia::ready(DisplayMediaResponse::UseSystemPicker);
        }

        if self.pending.borrow().is_some() {
            log::warn!(
                "Screen share requested in {} while a picker is open",
                self.partition
            );
            return PendingDisplayMedia::empty();
        }

        let Some(call_window) = self.registry.find_by_host(&self.urls.video_call_host) else {
            log::info!("Screen share requested without a video call window");
            return PendingDisplayMedia::empty();
        };

        let (respond, receiver) = oneshot::channel();
        let pending = Rc::downgrade(&self.pending);
        let handlers = WindowHandlers {
            on_event: None,
            on_closed: Some(Rc::new(move |id| {
                if let Some(pending) = pending.upgrade() {
                    settle(&pending, Some(id), DisplayMediaResponse::Empty);
                }
            })),
        };

        let mut spec = WindowSpec::new(PICKER_URL, PICKER_SIZE, self.partition.as_str());
        spec.parent = Some(call_window.id());
        spec.title = Some("Choose what to share".to_string());

        let picker = self.windows.open_window(spec, handlers);
        log::info!(
            "Opened screen share picker {:?} for call window {:?}",
            picker.id(),
            call_window.id()
        );
        *self.pending.borrow_mut() = Some(Negotiation { picker, respond });

        PendingDisplayMedia { receiver }
    }

    /// The picker reported a source
    pub fn source_selected(&self, source: DesktopSource) {
        settle(&self.pending, None, DisplayMediaResponse::Source(source));
    }

    /// Abandon the running negotiation, if any
    pub fn cancel(&self) {
        settle(&self.pending, None, DisplayMediaResponse::Empty);
    }

    pub fn is_idle(&self) -> bool {
        self.pending.borrow().is_none()
    }

    pub fn picker_window(&self) -> Option<WindowId> {
        self.pending
            .borrow()
            .as_ref()
            .map(|negotiation| negotiation.picker.id())
    }
}

/// Resolve the pending negotiation once. `closed` names the window whose close
/// event triggered this; a close from any other window is ignored.
fn settle(pending: &PendingSlot, closed: Option<WindowId>, response: DisplayMediaResponse) {
    let negotiation = {
        let mut slot = pending.borrow_mut();
        let applies = match (slot.as_ref(), closed) {
            (None, _) => false,
            (Some(negotiation), Some(id)) => negotiation.picker.id() == id,
            (Some(_), None) => true,
        };
        if !applies {
            return;
        }
        slot.take()
    };

    let Some(negotiation) = negotiation else {
        return;
    };

    log::info!("Screen share negotiation settled: {:?}", response);
    let _ = negotiation.respond.send(response);
    if closed.is_none() {
        negotiation.picker.close();
    }
}
