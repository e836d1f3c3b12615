//! URL policy of the hosted mail application
//!
//! Every origin, allow-list and pattern the routing core consults lives in
//! [`AppUrls`], so the same decisions can be exercised against a test origin.

use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameter asking the injected bridge to hide the application logo
pub const PARAM_HIDE_LOGO: &str = "mw_hide_logo";
/// Query parameter asking the injected bridge to hide the application footer
pub const PARAM_HIDE_FOOTER: &str = "mw_hide_footer";
/// Query parameter asking the injected bridge to reverse conversation order
pub const PARAM_REVERSE_CONVERSATION: &str = "mw_reverse_conversation";
/// Value of an enabled UI toggle parameter
pub const TOGGLE_ENABLED: &str = "true";

/// Placeholder document some origins open before deciding where to go
pub const BLANK_URL: &str = "about:blank";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppUrls {
    /// Canonical URL of the mail application. Its origin is the canonical origin.
    pub app_url: Url,

    /// Hosts of companion applications allowed to open in tracked windows
    pub companion_hosts: Vec<String>,

    /// Companion host whose windows can request a screen share
    pub video_call_host: String,

    /// URLs rendered directly in a tracked window (secure PDF viewer...)
    pub direct_render_prefixes: Vec<String>,

    /// Sign-in endpoint used to add another account
    pub add_account_prefix: String,

    /// Attachment URLs downloaded instead of opened
    pub download_prefixes: Vec<String>,

    /// Bare web-search origin the sign-in flow sometimes redirects to
    pub web_search_url: Url,

    /// Accounts sign-in endpoint for the mail service
    pub sign_in_url: Url,

    /// Passkey challenge step of the sign-in flow
    pub passkey_challenge_prefix: String,
}

impl Default for AppUrls {
    fn default() -> Self {
        Self::for_app(parse_static("https://mail.google.com/mail/u/0/"))
    }
}

impl AppUrls {
    /// Default policy with a different canonical application URL
    pub fn for_app(app_url: Url) -> Self {
        Self {
            app_url,
            companion_hosts: [
                "calendar.google.com",
                "meet.google.com",
                "docs.google.com",
                "drive.google.com",
                "chat.google.com",
                "contacts.google.com",
                "keep.google.com",
                "tasks.google.com",
            ]
            .iter()
            .map(|host| host.to_string())
            .collect(),
            video_call_host: "meet.google.com".to_string(),
            direct_render_prefixes: vec![
                "https://mail-attachment.googleusercontent.com/securepdf/".to_string(),
            ],
            add_account_prefix: "https://accounts.google.com/AddSession".to_string(),
            download_prefixes: vec![
                "https://mail-attachment.googleusercontent.com/attachment/".to_string(),
                "https://drive.usercontent.google.com/download".to_string(),
            ],
            web_search_url: parse_static("https://www.google.com/"),
            sign_in_url: parse_static("https://accounts.google.com/ServiceLogin?service=mail"),
            passkey_challenge_prefix: "https://accounts.google.com/v3/signin/challenge/pk"
                .to_string(),
        }
    }

    /// True if `url` shares the canonical application origin
    pub fn is_canonical(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| parsed.origin() == self.app_url.origin())
            .unwrap_or(false)
    }

    /// True if `url` is served by one of the companion applications
    pub fn is_companion_app(&self, url: &str) -> bool {
        host_of(url)
            .map(|host| self.companion_hosts.iter().any(|allowed| *allowed == host))
            .unwrap_or(false)
    }

    pub fn is_direct_render(&self, url: &str) -> bool {
        self.direct_render_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    pub fn is_add_account(&self, url: &str) -> bool {
        url.starts_with(self.add_account_prefix.as_str())
    }

    pub fn is_attachment_download(&self, url: &str) -> bool {
        self.download_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// True only for the web-search origin itself, not for any page under it
    pub fn is_bare_web_search(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        parsed.origin() == self.web_search_url.origin()
            && matches!(parsed.path(), "" | "/")
            && parsed.query().is_none()
    }

    pub fn is_passkey_challenge(&self, url: &str) -> bool {
        url.starts_with(self.passkey_challenge_prefix.as_str())
    }

    /// Canonical URL with the UI toggle parameters appended
    pub fn initial_url(&self, hide_logo: bool, hide_footer: bool, reverse_conversation: bool) -> Url {
        let mut url = self.app_url.clone();
        let toggles = [
            (PARAM_HIDE_LOGO, hide_logo),
            (PARAM_HIDE_FOOTER, hide_footer),
            (PARAM_REVERSE_CONVERSATION, reverse_conversation),
        ];
        if toggles.iter().any(|(_, enabled)| *enabled) {
            let mut pairs = url.query_pairs_mut();
            for (name, enabled) in toggles {
                if enabled {
                    pairs.append_pair(name, TOGGLE_ENABLED);
                }
            }
        }
        url
    }

    /// Compose view of the canonical URL for a `mailto:` target
    pub fn compose_url(&self, mailto: &str) -> Url {
        let mut url = self.app_url.clone();
        url.query_pairs_mut()
            .append_pair("extsrc", "mailto")
            .append_pair("url", mailto);
        url
    }
}

/// Lowercase host name of `url`, if it has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_ascii_lowercase()))
}

fn parse_static(url: &str) -> Url {
    Url::parse(url).unwrap_or_else(|e| panic!("invalid built-in URL {url}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> AppUrls {
        AppUrls::for_app(Url::parse("https://mail.example.com/").unwrap())
    }

    #[test]
    fn test_canonical_origin_ignores_path() {
        let urls = urls();
        assert!(urls.is_canonical("https://mail.example.com/inbox"));
        assert!(urls.is_canonical("https://mail.example.com/"));
        assert!(!urls.is_canonical("http://mail.example.com/inbox"));
        assert!(!urls.is_canonical("https://mail.example.com.evil.test/"));
        assert!(!urls.is_canonical("not a url"));
    }

    #[test]
    fn test_companion_apps_match_by_host() {
        let urls = urls();
        assert!(urls.is_companion_app("https://meet.google.com/abc-defg-hij"));
        assert!(urls.is_companion_app("https://CALENDAR.google.com/calendar/r"));
        assert!(!urls.is_companion_app("https://meet.google.com.example/"));
    }

    #[test]
    fn test_bare_web_search_only() {
        let urls = urls();
        assert!(urls.is_bare_web_search("https://www.google.com/"));
        assert!(urls.is_bare_web_search("https://www.google.com"));
        assert!(!urls.is_bare_web_search("https://www.google.com/search?q=mail"));
        assert!(!urls.is_bare_web_search("https://accounts.google.com/"));
    }

    #[test]
    fn test_initial_url_parameters() {
        let urls = urls();
        assert_eq!(
            urls.initial_url(false, false, false).as_str(),
            "https://mail.example.com/"
        );

        let url = urls.initial_url(true, false, true);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (PARAM_HIDE_LOGO.to_string(), "true".to_string()),
                (PARAM_REVERSE_CONVERSATION.to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_compose_url_encodes_target() {
        let urls = urls();
        assert_eq!(
            urls.compose_url("mailto:a@b.test?subject=Hi there").as_str(),
            "https://mail.example.com/?extsrc=mailto&url=mailto%3Aa%40b.test%3Fsubject%3DHi+there"
        );
    }

    #[test]
    fn test_compose_url_keeps_existing_query() {
        let urls = AppUrls::for_app(Url::parse("https://mail.example.com/mail/?authuser=1").unwrap());
        let url = urls.compose_url("mailto:a@b.test");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("authuser".to_string(), "1".to_string()),
                ("extsrc".to_string(), "mailto".to_string()),
                ("url".to_string(), "mailto:a@b.test".to_string()),
            ]
        );
    }

    #[test]
    fn test_prefix_lists() {
        let urls = urls();
        assert!(urls.is_add_account("https://accounts.google.com/AddSession?continue=x"));
        assert!(urls.is_attachment_download(
            "https://mail-attachment.googleusercontent.com/attachment/u/0/?view=att"
        ));
        assert!(urls.is_direct_render(
            "https://mail-attachment.googleusercontent.com/securepdf/u/0/doc"
        ));
        assert!(urls.is_passkey_challenge(
            "https://accounts.google.com/v3/signin/challenge/pk?TL=abc"
        ));
    }
}
