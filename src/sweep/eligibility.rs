//! Eligibility rules for quarantining a member.
//!
//! Rules run in a fixed order and the first one that excludes a user is
//! reported, so exclusions can be logged with a reason. A user with no
//! exclusion is a candidate.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::sweep::user::NormalizedUser;

/// Name of Slack's built-in bot account.
pub const SYSTEM_BOT_NAME: &str = "slackbot";

/// Ids of users already in the holding channel.
pub type QuarantineSet = HashSet<String>;

/// Why a user is not a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// No usable last-update time; the user's age is unknown.
    UnknownUpdate,
    /// Profile updated on or after the cutoff.
    RecentlyUpdated,
    Admin,
    Bot,
    Deleted,
    /// Has a profile title.
    HasTitle,
    SystemBot,
    AlreadyQuarantined,
}

impl Exclusion {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnknownUpdate => "unknown_update",
            Self::RecentlyUpdated => "recently_updated",
            Self::Admin => "admin",
            Self::Bot => "bot",
            Self::Deleted => "deleted",
            Self::HasTitle => "has_title",
            Self::SystemBot => "system_bot",
            Self::AlreadyQuarantined => "already_quarantined",
        }
    }
}

/// Cutoff instant for an inactivity age measured back from `now`.
pub fn cutoff_from(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Pure eligibility predicate over normalized users.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter<'a> {
    cutoff: DateTime<Utc>,
    quarantined: &'a QuarantineSet,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new(cutoff: DateTime<Utc>, quarantined: &'a QuarantineSet) -> Self {
        Self {
            cutoff,
            quarantined,
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// `Ok(())` for a candidate, otherwise the first rule that excludes it.
    pub fn evaluate(&self, user: &NormalizedUser) -> Result<(), Exclusion> {
        let Some(updated) = user.updated else {
            return Err(Exclusion::UnknownUpdate);
        };
        if updated >= self.cutoff {
            return Err(Exclusion::RecentlyUpdated);
        }
        if user.is_admin {
            return Err(Exclusion::Admin);
        }
        if user.is_bot {
            return Err(Exclusion::Bot);
        }
        if user.deleted {
            return Err(Exclusion::Deleted);
        }
        if !user.title.is_empty() {
            return Err(Exclusion::HasTitle);
        }
        if user.name == SYSTEM_BOT_NAME {
            return Err(Exclusion::SystemBot);
        }
        if self.quarantined.contains(&user.id) {
            return Err(Exclusion::AlreadyQuarantined);
        }
        Ok(())
    }

    pub fn is_candidate(&self, user: &NormalizedUser) -> bool {
        self.evaluate(user).is_ok()
    }

    /// Candidates among `users`, in input order.
    pub fn candidates<'u, I>(&self, users: I) -> Vec<&'u NormalizedUser>
    where
        I: IntoIterator<Item = &'u NormalizedUser>,
    {
        users.into_iter().filter(|u| self.is_candidate(u)).collect()
    }
}
