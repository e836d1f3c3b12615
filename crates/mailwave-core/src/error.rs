//! Error types for Mailwave

use thiserror::Error;

/// Result type alias for Mailwave operations
pub type MailwaveResult<T> = Result<T, MailwaveError>;

/// Main error type for Mailwave
#[derive(Error, Debug)]
pub enum MailwaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebView error: {0}")]
    WebView(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MailwaveError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new WebView error
    pub fn webview(msg: impl Into<String>) -> Self {
        Self::WebView(msg.into())
    }

    /// Create a new window error
    pub fn window(msg: impl Into<String>) -> Self {
        Self::Window(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = MailwaveError::config("unknown account 'work'");
        assert_eq!(err.to_string(), "Configuration error: unknown account 'work'");

        let err = MailwaveError::webview("surface closed");
        assert_eq!(err.to_string(), "WebView error: surface closed");
    }

    #[test]
    fn test_url_errors_convert() {
        fn parse(input: &str) -> MailwaveResult<url::Url> {
            Ok(url::Url::parse(input)?)
        }

        let err = parse("not a url").unwrap_err();
        assert!(matches!(err, MailwaveError::Url(_)));
    }
}
