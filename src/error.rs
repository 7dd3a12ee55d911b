//! Error taxonomy for the import workflow
//!
//! Every failure that can reach the wizard is one of these variants. They are
//! cloneable so the session can keep the last one around for display.

/// Errors surfaced by the remote client, the file parser and the session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// Malformed or unsupported file (or response body)
    #[error("Could not read data: {0}")]
    Parse(String),

    /// Transport failure, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server answered but rejected the request
    #[error("Server rejected the request ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// A required field is missing or an action is not allowed right now
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested object no longer exists
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ImportError {
    /// Classify an HTTP status code together with the response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = summarize_body(body);
        match status {
            401 | 403 => ImportError::Auth(if detail.is_empty() {
                format!("HTTP {}", status)
            } else {
                detail
            }),
            408 => ImportError::Network(format!("request timed out (HTTP {})", status)),
            _ => ImportError::Server { status, detail },
        }
    }

    /// Classify a reqwest error
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ImportError::Network(format!("request timed out: {}", error))
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), &error.to_string())
        } else if error.is_decode() {
            ImportError::Parse(format!("unexpected response body: {}", error))
        } else {
            ImportError::Network(error.to_string())
        }
    }

    /// Error returned when an operation exceeds the configured timeout
    pub fn timed_out(operation: &str, after: std::time::Duration) -> Self {
        ImportError::Network(format!("{} timed out after {}s", operation, after.as_secs()))
    }

    /// Short label used by the views
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Parse(_) => "ParseError",
            ImportError::Network(_) => "NetworkError",
            ImportError::Auth(_) => "AuthError",
            ImportError::Server { .. } => "ServerError",
            ImportError::Validation(_) => "ValidationError",
            ImportError::NotFound(_) => "NotFoundError",
        }
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(error: reqwest::Error) -> Self {
        Self::from_reqwest(&error)
    }
}

/// DHIS2 error bodies are JSON with a `message` field; fall back to the raw text
fn summarize_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        let cut: String = trimmed.chars().take(200).collect();
        format!("{}…", cut)
    } else {
        trimmed.to_string()
    }
}
