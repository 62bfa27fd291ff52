//! Recent-activity override.
//!
//! Profile update times drift from real activity, so a candidate that has
//! posted anything searchable is left alone for this run.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};

use crate::error::SlackError;
use crate::slack::{Directory, MessageMatch};
use crate::sweep::user::NormalizedUser;

/// The most recent message found for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastMessage {
    pub user_name: String,
    pub text: String,
    /// ISO-8601 time of the message, or the raw Slack `ts` if unparsable.
    pub timestamp: String,
}

impl From<MessageMatch> for LastMessage {
    fn from(m: MessageMatch) -> Self {
        let timestamp = ts_to_iso(&m.ts).unwrap_or_else(|| m.ts.clone());
        Self {
            user_name: m.username,
            text: m.text,
            timestamp,
        }
    }
}

/// Convert a Slack `"<seconds>.<micros>"` timestamp to ISO-8601.
fn ts_to_iso(ts: &str) -> Option<String> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<6}").get(..6)?.parse().ok()?
    };
    DateTime::from_timestamp(secs, micros * 1_000)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Looks up each candidate's latest message.
pub struct RecencyCheck {
    directory: Arc<dyn Directory>,
}

impl RecencyCheck {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// `Some` when `user` has posted a message the search can see.
    pub async fn last_message(
        &self,
        user: &NormalizedUser,
    ) -> Result<Option<LastMessage>, SlackError> {
        let found = self.directory.latest_message_by(&user.name).await?;
        Ok(found.map(LastMessage::from))
    }
}
