//! Per-account browsing sessions and permission mediation

use crate::host::{SessionHandlers, WindowSystem};
use crate::registry::ChildWindowRegistry;
use crate::screen_share::{PendingDisplayMedia, ScreenShareNegotiator};
use mailwave_core::{AccountId, AppUrls, ConfigStore};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Permission kinds a page can ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionKind {
    /// Camera and microphone
    Media,
    Notifications,
    Geolocation,
    ClipboardRead,
    Fullscreen,
    OpenExternal,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    pub kind: PermissionKind,
    pub origin: String,
}

impl PermissionRequest {
    pub fn new(kind: PermissionKind, origin: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
        }
    }
}

/// `Unanswered` leaves the request pending, which engines treat as a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    Unanswered,
}

/// Isolated storage partition of one account.
///
/// The partition name only depends on the account id, so the same account
/// resumes its cookies and cache across restarts.
pub struct BrowsingSession {
    account: AccountId,
    partition: String,
    config: Rc<ConfigStore>,
    screen_share: ScreenShareNegotiator,
}

impl BrowsingSession {
    pub fn new(
        account: AccountId,
        config: Rc<ConfigStore>,
        urls: Rc<AppUrls>,
        windows: Rc<dyn WindowSystem>,
        registry: Rc<ChildWindowRegistry>,
    ) -> Rc<Self> {
        let partition = Self::partition_name(&account);
        let storage_dir = Self::storage_dir_for(&config.data_dir(), &account);
        log::info!(
            "Creating browsing session {} at {:?}",
            partition,
            storage_dir
        );

        let screen_share = ScreenShareNegotiator::new(
            partition.clone(),
            urls,
            Rc::clone(&config),
            windows,
            registry,
        );

        Rc::new(Self {
            account,
            partition,
            config,
            screen_share,
        })
    }

    pub fn partition_name(account: &AccountId) -> String {
        format!("persist:{}", account)
    }

    /// Storage directory of `account` under `data_dir`
    pub fn storage_dir_for(data_dir: &Path, account: &AccountId) -> PathBuf {
        let safe: String = account
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        data_dir.join("partitions").join(safe)
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn screen_share(&self) -> &ScreenShareNegotiator {
        &self.screen_share
    }

    /// Media capture is always granted, notifications only when companion
    /// apps may notify, anything else is left unanswered.
    pub fn handle_permission(&self, request: &PermissionRequest) -> PermissionResponse {
        let response = match request.kind {
            PermissionKind::Media => PermissionResponse::Granted,
            PermissionKind::Notifications if self.config.notifications_from_companion_apps() => {
                PermissionResponse::Granted
            }
            _ => PermissionResponse::Unanswered,
        };
        log::debug!(
            "Permission {:?} from {} -> {:?}",
            request.kind,
            request.origin,
            response
        );
        response
    }

    pub fn request_display_media(&self) -> PendingDisplayMedia {
        self.screen_share.request()
    }

    /// Route the partition's permission and display-media requests here
    pub fn install(self: &Rc<Self>, windows: &dyn WindowSystem) {
        let for_permissions = Rc::downgrade(self);
        let for_display_media = Rc::downgrade(self);
        windows.set_session_handlers(
            &self.partition,
            SessionHandlers {
                on_permission: Rc::new(move |request: &PermissionRequest| {
                    match for_permissions.upgrade() {
                        Some(session) => session.handle_permission(request),
                        None => PermissionResponse::Unanswered,
                    }
                }),
                on_display_media: Rc::new(move || match for_display_media.upgrade() {
                    Some(session) => session.request_display_media(),
                    None => PendingDisplayMedia::empty(),
                }),
            },
        );
    }
}
