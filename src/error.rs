//! Error types for slack-void.

/// Top-level error type for a sweep run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),
}

impl Error {
    /// The full response payload when the service reported the failure itself.
    pub fn platform_response(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Slack(SlackError::Platform { response, .. }) => Some(response),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the Slack Web API transport.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Slack answered with `ok: false`.
    #[error("Slack {method} failed: {error}")]
    Platform {
        method: String,
        error: String,
        response: serde_json::Value,
    },

    #[error("Slack {method} still rate limited after {attempts} attempts")]
    RateLimited { method: String, attempts: u32 },

    #[error("HTTP error calling {method}: {reason}")]
    Http { method: String, reason: String },

    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl SlackError {
    /// The Slack error code (`not_in_channel`, `missing_scope`, ...) if any.
    pub fn platform_code(&self) -> Option<&str> {
        match self {
            SlackError::Platform { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A quarantine action that could not be completed for one user.
#[derive(Debug, thiserror::Error)]
pub enum QuarantineError {
    #[error("Failed to list channels for {user}: {source}")]
    ListChannels { user: String, source: SlackError },

    #[error("Failed to invite {user} to the holding channel: {source}")]
    Invite { user: String, source: SlackError },
}

/// Result type alias for a sweep run.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_response_exposed_for_platform_errors() {
        let err = Error::from(SlackError::Platform {
            method: "conversations.kick".into(),
            error: "missing_scope".into(),
            response: serde_json::json!({
                "ok": false,
                "error": "missing_scope",
                "needed": "channels:manage"
            }),
        });
        let payload = err.platform_response().unwrap();
        assert_eq!(payload["needed"], "channels:manage");
        assert_eq!(
            err.to_string(),
            "Slack error: Slack conversations.kick failed: missing_scope"
        );
    }

    #[test]
    fn platform_response_absent_for_transport_errors() {
        let err = Error::from(SlackError::Http {
            method: "users.list".into(),
            reason: "connection refused".into(),
        });
        assert!(err.platform_response().is_none());
    }

    #[test]
    fn platform_code() {
        let err = SlackError::Platform {
            method: "conversations.invite".into(),
            error: "already_in_channel".into(),
            response: serde_json::Value::Null,
        };
        assert_eq!(err.platform_code(), Some("already_in_channel"));
        let err = SlackError::RateLimited {
            method: "users.list".into(),
            attempts: 3,
        };
        assert_eq!(err.platform_code(), None);
    }
}
