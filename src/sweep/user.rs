//! Reduced view of a directory member.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::slack::DirectoryUser;

/// The fields eligibility decisions look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUser {
    pub id: String,
    pub name: String,
    /// Profile title; empty when the profile has none.
    pub title: String,
    pub deleted: bool,
    pub real_name: String,
    pub is_admin: bool,
    pub is_bot: bool,
    /// Last profile update; `None` when absent or out of range.
    pub updated: Option<DateTime<Utc>>,
    /// `updated` as an ISO-8601 string.
    pub updated_at: Option<String>,
}

impl From<&DirectoryUser> for NormalizedUser {
    fn from(user: &DirectoryUser) -> Self {
        let updated = user.updated.and_then(|secs| DateTime::from_timestamp(secs, 0));
        let real_name = user
            .real_name
            .clone()
            .or_else(|| user.profile.real_name.clone())
            .unwrap_or_default();

        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            title: user.profile.title.clone().unwrap_or_default(),
            deleted: user.deleted,
            real_name,
            is_admin: user.is_admin,
            is_bot: user.is_bot,
            updated,
            updated_at: updated.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Normalize one directory record, tracing it for verbose runs.
pub fn normalize(user: &DirectoryUser) -> NormalizedUser {
    let normalized = NormalizedUser::from(user);
    tracing::trace!(
        id = %normalized.id,
        name = %normalized.name,
        title = %normalized.title,
        admin = normalized.is_admin,
        bot = normalized.is_bot,
        deleted = normalized.deleted,
        updated_at = normalized.updated_at.as_deref().unwrap_or("unknown"),
        "Normalized directory user"
    );
    normalized
}
