//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Slack Web API root.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Sweep configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Slack API token.
    pub token: SecretString,
    /// Holding ("void") channel id users are moved into.
    pub holding_channel: String,
    /// Channel name users are never removed from.
    pub exempt_channel: String,
    /// Users whose profile was last updated longer ago than this are stale.
    pub cutoff_age: Duration,
    /// Maximum number of quarantine attempts per run.
    pub max_users: usize,
    /// Log intended mutations without performing them.
    pub preview: bool,
    /// Exempt candidates that have posted any message.
    pub check_recent_messages: bool,
    /// Page-size hint for `users.list`.
    pub page_size: u32,
    /// Slack API root, overridable for testing.
    pub api_base_url: String,
    /// How many times a rate-limited call is retried before giving up.
    pub max_retries: u32,
}

impl SweepConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let token = SecretString::from(required("SLACK_TOKEN")?);
        let holding_channel = required("VOID_CHANNEL_ID")?;

        let exempt_channel = lookup("VOID_EXEMPT_CHANNEL")
            .map(|v| v.trim().trim_start_matches('#').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "hello".to_string());

        let cutoff_age = match lookup("VOID_CUTOFF") {
            Some(raw) => parse_cutoff(&raw)?,
            None => Duration::from_secs(30 * 24 * 60 * 60),
        };

        let max_users: usize = parse_number(&lookup, "VOID_MAX_USERS", 10)?;
        let preview = parse_flag(&lookup, "VOID_PREVIEW", true)?;
        let check_recent_messages = parse_flag(&lookup, "VOID_CHECK_RECENT_MESSAGES", true)?;
        let page_size: u32 = parse_number(&lookup, "VOID_PAGE_SIZE", 200)?;
        let max_retries: u32 = parse_number(&lookup, "SLACK_MAX_RETRIES", 10)?;

        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "VOID_PAGE_SIZE".into(),
                message: "must be greater than zero".into(),
            });
        }

        let api_base_url = lookup("SLACK_API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            token,
            holding_channel,
            exempt_channel,
            cutoff_age,
            max_users,
            preview,
            check_recent_messages,
            page_size,
            api_base_url,
            max_retries,
        })
    }
}

/// Parse the inactivity cutoff, e.g. "30days", "1year", "6 weeks".
fn parse_cutoff(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: "VOID_CUTOFF".into(),
        message: format!("'{raw}': {e}"),
    })
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a boolean"),
        }),
    }
}
