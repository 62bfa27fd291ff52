//! Quarantine action: move a user into the holding channel and out of
//! every other public channel except the exempt one.
//!
//! In preview mode nothing is mutated; each step is logged the same way
//! with `preview = true` and reported in the outcome.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{QuarantineError, SlackError};
use crate::slack::{self, Channel, Directory};
use crate::sweep::user::NormalizedUser;

/// What happened (or would have happened) to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineOutcome {
    pub user_id: String,
    pub user_name: String,
    pub preview: bool,
    /// Whether the user was (or would be) invited to the holding channel;
    /// false when Slack reported them already there.
    pub invited: bool,
    /// Channels the user was (or would be) removed from.
    pub kicked: Vec<Channel>,
    /// Channels whose removal failed, with the error.
    pub failed_kicks: Vec<(Channel, String)>,
}

pub struct QuarantineAction {
    directory: Arc<dyn Directory>,
    holding_channel: String,
    exempt_channel: String,
    preview: bool,
}

impl QuarantineAction {
    pub fn new(
        directory: Arc<dyn Directory>,
        holding_channel: impl Into<String>,
        exempt_channel: impl Into<String>,
        preview: bool,
    ) -> Self {
        Self {
            directory,
            holding_channel: holding_channel.into(),
            exempt_channel: exempt_channel.into(),
            preview,
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Channels a user should be removed from: all but the holding channel
    /// and the exempt channel.
    pub fn channels_to_leave<'c>(&self, channels: &'c [Channel]) -> Vec<&'c Channel> {
        channels
            .iter()
            .filter(|c| c.id != self.holding_channel && c.name != self.exempt_channel)
            .collect()
    }

    /// Quarantine `user`. A failed kick is logged and skipped; failing to
    /// list channels or to invite aborts this user only.
    pub async fn apply(&self, user: &NormalizedUser) -> Result<QuarantineOutcome, QuarantineError> {
        let channels = slack::all_user_channels(self.directory.as_ref(), &user.id)
            .await
            .map_err(|source| QuarantineError::ListChannels {
                user: user.name.clone(),
                source,
            })?;

        info!(
            user = %user.name,
            channel = %self.holding_channel,
            preview = self.preview,
            "Inviting {} to the void", user.name
        );
        let invited = self.preview || self.invite(user).await?;

        let mut outcome = QuarantineOutcome {
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            preview: self.preview,
            invited,
            kicked: Vec::new(),
            failed_kicks: Vec::new(),
        };

        for channel in self.channels_to_leave(&channels) {
            info!(
                user = %user.name,
                channel = %channel.name,
                preview = self.preview,
                "Kicking {} from {}", user.name, channel.name
            );
            if self.preview {
                outcome.kicked.push(channel.clone());
                continue;
            }

            match self.kick(channel, user).await {
                Ok(()) => outcome.kicked.push(channel.clone()),
                Err(e) => {
                    warn!(
                        user = %user.name,
                        channel = %channel.name,
                        error = %e,
                        "Kick failed, continuing with remaining channels"
                    );
                    outcome.failed_kicks.push((channel.clone(), e.to_string()));
                }
            }
        }

        Ok(outcome)
    }

    /// `Ok(false)` when the user already sits in the holding channel.
    async fn invite(&self, user: &NormalizedUser) -> Result<bool, QuarantineError> {
        match self.directory.invite(&self.holding_channel, &user.id).await {
            Ok(()) => Ok(true),
            Err(e) if e.platform_code() == Some("already_in_channel") => Ok(false),
            Err(source) => Err(QuarantineError::Invite {
                user: user.name.clone(),
                source,
            }),
        }
    }

    async fn kick(&self, channel: &Channel, user: &NormalizedUser) -> Result<(), SlackError> {
        match self.directory.kick(&channel.id, &user.id).await {
            Err(e) if e.platform_code() == Some("not_in_channel") => Ok(()),
            result => result,
        }
    }
}
