//! IPC between the webviews and the Rust side
//!
//! The titlebar page sends [`IpcMessage`]s and receives [`HostMessage`]s.
//! Content surfaces and the screen-share picker send [`SurfaceMessage`]s
//! through the injected [`CONTENT_BRIDGE_JS`].

use mailwave_shell::{HostChannel, HostMessage};
use serde::Deserialize;
use tracing::{debug, error};
use wry::WebView;

/// IPC message from the titlebar page
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum IpcMessage {
    // Navigation of the selected account
    GoBack,
    GoForward,
    Reload,
    SetZoom {
        factor: f64,
    },

    // Find in page
    FindInPage {
        text: String,
        #[serde(default = "default_forward")]
        forward: bool,
    },
    StopFindInPage,

    // Accounts
    SelectAccount {
        id: String,
    },
    AddAccount {
        id: String,
        label: String,
    },

    ComposeMailto {
        url: String,
    },
}

fn default_forward() -> bool {
    true
}

/// IPC message from a content surface or the screen-share picker
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum SurfaceMessage {
    SetUnreadCount {
        count: u32,
    },
    DidNavigateInPage {
        url: String,
        /// The current history entry was rewritten rather than added
        #[serde(default)]
        replace: bool,
    },
    FoundInPage {
        matches: u32,
        active_match_ordinal: u32,
        final_update: bool,
    },
    RequestDisplayMedia {
        request_id: u64,
    },
    RequestPermission {
        request_id: u64,
        kind: String,
    },

    // Screen-share picker
    SelectSource {
        id: String,
        name: String,
    },
    CancelPicker,
}

/// Script delivering `message` to the titlebar page
pub fn host_script(message: &HostMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(format!(
            "window.mailwave && window.mailwave.receive({});",
            json
        )),
        Err(e) => {
            error!("Failed to serialize host message: {}", e);
            None
        }
    }
}

/// [`HostChannel`] evaluating messages in the titlebar webview
pub struct HostBridge {
    webview: WebView,
}

impl HostBridge {
    pub fn new(webview: WebView) -> Self {
        Self { webview }
    }

    pub fn webview(&self) -> &WebView {
        &self.webview
    }
}

impl HostChannel for HostBridge {
    fn send(&self, message: HostMessage) {
        if let Some(script) = host_script(&message) {
            debug!("Host message: {:?}", message);
            let _ = self.webview.evaluate_script(&script);
        }
    }
}

/// Bridge injected into the titlebar page
pub const HOST_BRIDGE_JS: &str = r#"
(function() {
    const post = (message) => window.ipc.postMessage(JSON.stringify(message));

    window.mailwave = {
        // Navigation
        goBack: () => post({ cmd: 'go_back' }),
        goForward: () => post({ cmd: 'go_forward' }),
        reload: () => post({ cmd: 'reload' }),
        setZoom: (factor) => post({ cmd: 'set_zoom', factor }),

        // Find in page
        findInPage: (text, forward = true) => post({ cmd: 'find_in_page', text, forward }),
        stopFindInPage: () => post({ cmd: 'stop_find_in_page' }),

        // Accounts
        selectAccount: (id) => post({ cmd: 'select_account', id }),
        addAccount: (id, label) => post({ cmd: 'add_account', id, label }),

        composeMailto: (url) => post({ cmd: 'compose_mailto', url }),

        // Host messages are re-dispatched as DOM events
        receive: (message) => {
            window.dispatchEvent(new CustomEvent('mailwave-message', { detail: message }));
        },
    };
})();
"#;

/// Bridge injected into every content surface
pub const CONTENT_BRIDGE_JS: &str = r#"
(function() {
    if (window.top !== window || window.__mailwave) {
        return;
    }

    const post = (message) => window.ipc.postMessage(JSON.stringify(message));
    const displayMedia = new Map();
    const permissions = new Map();
    let nextRequest = 1;

    // UI tweaks requested through the initial URL survive in-app navigation
    const TWEAKS = {
        mw_hide_logo: 'mailwave-hide-logo',
        mw_hide_footer: 'mailwave-hide-footer',
        mw_reverse_conversation: 'mailwave-reverse-conversation',
    };
    const applyTweaks = () => {
        const params = new URLSearchParams(location.search);
        for (const [param, cls] of Object.entries(TWEAKS)) {
            const key = 'mailwave.' + param;
            if (params.get(param) === 'true') {
                sessionStorage.setItem(key, 'true');
            }
            if (sessionStorage.getItem(key) === 'true') {
                document.documentElement.classList.add(cls);
            }
        }
        if (navigator.platform.startsWith('Mac')) {
            document.documentElement.classList.add('mailwave-macos');
        }
    };

    // Unread count is carried by the document title, e.g. "Inbox (3) - ..."
    let lastUnread = null;
    const reportUnread = () => {
        const match = /\((\d+)\)/.exec(document.title);
        const count = match ? parseInt(match[1], 10) : 0;
        if (count !== lastUnread) {
            lastUnread = count;
            post({ cmd: 'set_unread_count', count });
        }
    };

    const reportInPage = (replace) =>
        post({ cmd: 'did_navigate_in_page', url: location.href, replace: replace === true });
    window.addEventListener('hashchange', () => reportInPage(false));
    window.addEventListener('popstate', () => reportInPage(false));
    for (const name of ['pushState', 'replaceState']) {
        const original = history[name].bind(history);
        history[name] = (...args) => {
            const result = original(...args);
            reportInPage(name === 'replaceState');
            return result;
        };
    }

    // Screen sharing is negotiated by the shell before capture starts
    const media = navigator.mediaDevices;
    if (media && media.getDisplayMedia) {
        const originalGetDisplayMedia = media.getDisplayMedia.bind(media);
        media.getDisplayMedia = (constraints) => new Promise((resolve, reject) => {
            const id = nextRequest++;
            displayMedia.set(id, (verdict) => {
                if (verdict === 'capture') {
                    originalGetDisplayMedia(constraints).then(resolve, reject);
                } else {
                    reject(new DOMException('Permission denied', 'NotAllowedError'));
                }
            });
            post({ cmd: 'request_display_media', request_id: id });
        });
    }

    if (window.Notification && Notification.requestPermission) {
        Notification.requestPermission = () => new Promise((resolve) => {
            const id = nextRequest++;
            permissions.set(id, (granted) => resolve(granted ? 'granted' : 'default'));
            post({ cmd: 'request_permission', request_id: id, kind: 'notifications' });
        });
    }

    // Find in page
    let findText = null;
    let findIndex = 0;
    const countMatches = (text) => {
        const haystack = (document.body ? document.body.innerText : '').toLowerCase();
        const needle = text.toLowerCase();
        let count = 0;
        let from = 0;
        while (needle && (from = haystack.indexOf(needle, from)) !== -1) {
            count++;
            from += needle.length;
        }
        return count;
    };

    window.__mailwave = {
        resolveDisplayMedia: (id, verdict) => {
            const settle = displayMedia.get(id);
            displayMedia.delete(id);
            if (settle) settle(verdict);
        },
        resolvePermission: (id, granted) => {
            const settle = permissions.get(id);
            permissions.delete(id);
            if (settle) settle(granted);
        },
        find: (text, forward) => {
            const matches = countMatches(text);
            if (text !== findText) {
                findText = text;
                findIndex = 0;
                window.getSelection().removeAllRanges();
            }
            if (matches > 0) {
                window.find(text, false, !forward, true);
                findIndex = forward ? (findIndex % matches) + 1 : ((findIndex + matches - 2) % matches) + 1;
            } else {
                findIndex = 0;
            }
            post({ cmd: 'found_in_page', matches, active_match_ordinal: findIndex, final_update: true });
        },
        stopFind: () => {
            findText = null;
            findIndex = 0;
            window.getSelection().removeAllRanges();
        },
    };

    const start = () => {
        applyTweaks();
        reportUnread();
        const title = document.querySelector('title');
        if (title) {
            new MutationObserver(reportUnread).observe(title, { childList: true, characterData: true, subtree: true });
        }
    };
    if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', start);
    } else {
        start();
    }
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use mailwave_core::{AccountId, AppUrls};
    use mailwave_shell::{FindResult, ObservableState};

    #[test]
    fn test_parse_titlebar_commands() {
        let message: IpcMessage =
            serde_json::from_str(r#"{"cmd":"find_in_page","text":"invoice"}"#).unwrap();
        assert_eq!(
            message,
            IpcMessage::FindInPage {
                text: "invoice".to_string(),
                forward: true
            }
        );

        let message: IpcMessage =
            serde_json::from_str(r#"{"cmd":"select_account","id":"work"}"#).unwrap();
        assert_eq!(
            message,
            IpcMessage::SelectAccount {
                id: "work".to_string()
            }
        );

        assert!(serde_json::from_str::<IpcMessage>(r#"{"cmd":"launch_missiles"}"#).is_err());
    }

    #[test]
    fn test_parse_surface_messages() {
        let message: SurfaceMessage = serde_json::from_str(
            r#"{"cmd":"found_in_page","matches":4,"active_match_ordinal":2,"final_update":true}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            SurfaceMessage::FoundInPage {
                matches: 4,
                active_match_ordinal: 2,
                final_update: true
            }
        );

        let message: SurfaceMessage =
            serde_json::from_str(r#"{"cmd":"select_source","id":"screen:0","name":"Built-in"}"#)
                .unwrap();
        assert_eq!(
            message,
            SurfaceMessage::SelectSource {
                id: "screen:0".to_string(),
                name: "Built-in".to_string()
            }
        );

        let message: SurfaceMessage =
            serde_json::from_str(r#"{"cmd":"cancel_picker"}"#).unwrap();
        assert_eq!(message, SurfaceMessage::CancelPicker);

        let message: SurfaceMessage = serde_json::from_str(
            r#"{"cmd":"did_navigate_in_page","url":"https://mail.example.com/#sent"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            SurfaceMessage::DidNavigateInPage {
                url: "https://mail.example.com/#sent".to_string(),
                replace: false
            }
        );
    }

    #[test]
    fn test_host_script_wraps_json() {
        let script = host_script(&HostMessage::FindInPage {
            account: AccountId::new("work"),
            result: FindResult {
                matches: 1,
                active_match_ordinal: 1,
                final_update: true,
            },
        })
        .unwrap();
        assert!(script.starts_with("window.mailwave && window.mailwave.receive({"));
        assert!(script.contains(r#""event":"find_in_page""#));
        assert!(script.contains(r#""account":"work""#));

        let state = ObservableState::new(true);
        let script = host_script(&HostMessage::StateChanged {
            account: AccountId::new("work"),
            state: state.clone(),
            previous: state,
        })
        .unwrap();
        assert!(script.contains(r#""event":"state_changed""#));
    }

    #[test]
    fn test_bridges_post_known_commands() {
        for cmd in ["set_unread_count", "request_display_media", "found_in_page"] {
            assert!(CONTENT_BRIDGE_JS.contains(cmd), "missing {}", cmd);
        }
        assert!(HOST_BRIDGE_JS.contains("'select_account'"));
    }

    #[test]
    fn test_content_bridge_reads_initial_url_toggles() {
        use mailwave_core::urls::{
            PARAM_HIDE_FOOTER, PARAM_HIDE_LOGO, PARAM_REVERSE_CONVERSATION, TOGGLE_ENABLED,
        };

        for param in [PARAM_HIDE_LOGO, PARAM_HIDE_FOOTER, PARAM_REVERSE_CONVERSATION] {
            assert!(
                CONTENT_BRIDGE_JS.contains(&format!("{}: 'mailwave-", param)),
                "bridge ignores {}",
                param
            );
        }
        assert!(CONTENT_BRIDGE_JS.contains(&format!("params.get(param) === '{}'", TOGGLE_ENABLED)));

        let url = AppUrls::for_app(url::Url::parse("https://mail.example.com/").unwrap())
            .initial_url(true, true, true);
        for (_, value) in url.query_pairs() {
            assert_eq!(value, TOGGLE_ENABLED);
        }
    }
}
