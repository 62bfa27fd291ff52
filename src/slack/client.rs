//! Slack Web API client: form-encoded POSTs with bearer auth.
//!
//! Owns the two transport concerns the sweep does not: cursor pages and
//! waiting out HTTP 429 rate limits. No per-request timeout is set, so a
//! long `Retry-After` never trips a local deadline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::SweepConfig;
use crate::error::SlackError;
use crate::slack::{Channel, Directory, DirectoryUser, MessageMatch, Page, SlackResult};

/// Wait used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack Web API client.
pub struct SlackClient {
    token: SecretString,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(
        token: SecretString,
        base_url: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("slack-void/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SlackError::Http {
                method: "client".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
            client,
        })
    }

    pub fn from_config(config: &SweepConfig) -> Result<Self, SlackError> {
        Self::new(
            config.token.clone(),
            config.api_base_url.clone(),
            config.max_retries,
        )
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Call a Web API method, retrying while Slack answers 429.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> SlackResult<T> {
        let mut retries = 0;

        loop {
            let resp = self
                .client
                .post(self.api_url(method))
                .bearer_auth(self.token.expose_secret())
                .form(params)
                .send()
                .await
                .map_err(|e| SlackError::Http {
                    method: method.into(),
                    reason: e.to_string(),
                })?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.max_retries {
                    return Err(SlackError::RateLimited {
                        method: method.into(),
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                let wait = retry_after(resp.headers());
                tracing::warn!(
                    method,
                    attempt = retries,
                    "Slack rate limited; retrying in {} seconds",
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let status = resp.status();
            let body: serde_json::Value = resp.json().await.map_err(|e| {
                SlackError::InvalidResponse {
                    method: method.into(),
                    reason: format!("HTTP {status}: {e}"),
                }
            })?;

            return decode(method, body);
        }
    }
}

/// Unwrap Slack's `{ok, error, ...}` envelope.
fn decode<T: DeserializeOwned>(method: &str, body: serde_json::Value) -> SlackResult<T> {
    if body.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
        let error = body
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        return Err(SlackError::Platform {
            method: method.into(),
            error,
            response: body,
        });
    }

    serde_json::from_value(body).map_err(|e| SlackError::InvalidResponse {
        method: method.into(),
        reason: e.to_string(),
    })
}

fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn with_cursor(
    mut params: Vec<(&'static str, String)>,
    cursor: Option<&str>,
) -> Vec<(&'static str, String)> {
    if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
        params.push(("cursor", cursor.to_string()));
    }
    params
}

// ── Response shapes ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

fn next_cursor(meta: Option<ResponseMetadata>) -> Option<String> {
    meta.map(|m| m.next_cursor).filter(|c| !c.is_empty())
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    #[serde(default)]
    members: Vec<DirectoryUser>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<String>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    #[serde(default)]
    channels: Vec<Channel>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    messages: SearchMessages,
}

#[derive(Debug, Deserialize)]
struct SearchMessages {
    #[serde(default)]
    matches: Vec<MessageMatch>,
}

#[derive(Debug, Deserialize)]
struct Empty {}

// ── Directory trait implementation ──────────────────────────────────

#[async_trait]
impl Directory for SlackClient {
    async fn list_users(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> SlackResult<Page<DirectoryUser>> {
        let params = with_cursor(vec![("limit", limit.to_string())], cursor);
        let resp: UsersListResponse = self.call("users.list", &params).await?;
        Ok(Page {
            items: resp.members,
            next_cursor: next_cursor(resp.response_metadata),
        })
    }

    async fn channel_members(
        &self,
        channel: &str,
        cursor: Option<&str>,
    ) -> SlackResult<Page<String>> {
        let params = with_cursor(vec![("channel", channel.to_string())], cursor);
        let resp: MembersResponse = self.call("conversations.members", &params).await?;
        Ok(Page {
            items: resp.members,
            next_cursor: next_cursor(resp.response_metadata),
        })
    }

    async fn user_channels(&self, user: &str, cursor: Option<&str>) -> SlackResult<Page<Channel>> {
        let params = with_cursor(
            vec![
                ("user", user.to_string()),
                ("types", "public_channel".to_string()),
                ("exclude_archived", "true".to_string()),
            ],
            cursor,
        );
        let resp: ConversationsResponse = self.call("users.conversations", &params).await?;
        Ok(Page {
            items: resp.channels,
            next_cursor: next_cursor(resp.response_metadata),
        })
    }

    async fn invite(&self, channel: &str, user: &str) -> SlackResult<()> {
        let params = [("channel", channel.to_string()), ("users", user.to_string())];
        let _: Empty = self.call("conversations.invite", &params).await?;
        Ok(())
    }

    async fn kick(&self, channel: &str, user: &str) -> SlackResult<()> {
        let params = [("channel", channel.to_string()), ("user", user.to_string())];
        let _: Empty = self.call("conversations.kick", &params).await?;
        Ok(())
    }

    async fn latest_message_by(&self, user_name: &str) -> SlackResult<Option<MessageMatch>> {
        let params = [
            ("query", format!("from:@{user_name}")),
            ("count", "1".to_string()),
            ("sort", "timestamp".to_string()),
            ("sort_dir", "desc".to_string()),
        ];
        let resp: SearchResponse = self.call("search.messages", &params).await?;
        Ok(resp.messages.matches.into_iter().next())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
