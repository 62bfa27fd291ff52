//! The sweep run loop.
//!
//! Flow:
//! 1. Load the quarantine set from the holding channel's members
//! 2. Page through the directory, normalizing and filtering each page
//! 3. For each candidate: optional recency override, then quarantine
//! 4. Stop at the processed-user cap or when the directory is exhausted

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::TryStreamExt;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::error::Result;
use crate::slack::{self, Directory};
use crate::sweep::eligibility::{EligibilityFilter, QuarantineSet, cutoff_from};
use crate::sweep::quarantine::QuarantineAction;
use crate::sweep::recency::RecencyCheck;
use crate::sweep::user::normalize;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub preview: bool,
    /// Members of the holding channel at start.
    pub already_quarantined: usize,
    /// Directory records examined.
    pub scanned: usize,
    pub candidates: usize,
    /// Candidates spared by the recency override.
    pub exempted: usize,
    pub quarantined: usize,
    /// Quarantine attempts that failed for the whole user.
    pub failed: usize,
    /// Individual channel removals that failed.
    pub failed_kicks: usize,
    /// Whether the run stopped at the processed-user cap.
    pub capped: bool,
}

impl RunSummary {
    fn new(run_id: Uuid, preview: bool) -> Self {
        Self {
            run_id,
            preview,
            already_quarantined: 0,
            scanned: 0,
            candidates: 0,
            exempted: 0,
            quarantined: 0,
            failed: 0,
            failed_kicks: 0,
            capped: false,
        }
    }

    /// Quarantine attempts so far; this is what the cap counts.
    pub fn attempted(&self) -> usize {
        self.quarantined + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.preview {
            f.write_str("[preview] ")?;
        }
        write!(
            f,
            "voided {} users ({} scanned, {} candidates, {} exempted, {} failed, {} failed kicks)",
            self.quarantined,
            self.scanned,
            self.candidates,
            self.exempted,
            self.failed,
            self.failed_kicks
        )
    }
}

/// Runs one sweep against a directory.
pub struct Sweeper {
    directory: Arc<dyn Directory>,
    holding_channel: String,
    cutoff_age: Duration,
    max_users: usize,
    page_size: u32,
    quarantine: QuarantineAction,
    recency: Option<RecencyCheck>,
}

impl Sweeper {
    pub fn new(config: &SweepConfig, directory: Arc<dyn Directory>) -> Self {
        let quarantine = QuarantineAction::new(
            Arc::clone(&directory),
            config.holding_channel.clone(),
            config.exempt_channel.clone(),
            config.preview,
        );
        let recency = config
            .check_recent_messages
            .then(|| RecencyCheck::new(Arc::clone(&directory)));

        Self {
            directory,
            holding_channel: config.holding_channel.clone(),
            cutoff_age: config.cutoff_age,
            max_users: config.max_users,
            page_size: config.page_size,
            quarantine,
            recency,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit "now" for the cutoff computation.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Uuid::new_v4(), self.quarantine.is_preview());
        let cutoff = cutoff_from(now, self.cutoff_age);

        info!(
            run_id = %summary.run_id,
            cutoff = %cutoff.to_rfc3339_opts(SecondsFormat::Millis, true),
            max_users = self.max_users,
            preview = summary.preview,
            recency_check = self.recency.is_some(),
            "Starting sweep"
        );

        let quarantined = self.load_quarantined().await?;
        summary.already_quarantined = quarantined.len();

        if self.max_users == 0 {
            info!("Processed-user cap is 0; nothing to do");
            summary.capped = true;
            return Ok(summary);
        }

        let filter = EligibilityFilter::new(cutoff, &quarantined);
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages = slack::users(self.directory.as_ref(), self.page_size);

        'scan: while let Some(page) = pages.try_next().await? {
            summary.scanned += page.len();

            for user in page.iter().map(normalize) {
                if !seen.insert(user.id.clone()) {
                    continue;
                }
                if let Err(exclusion) = filter.evaluate(&user) {
                    debug!(user = %user.name, reason = exclusion.label(), "Not a candidate");
                    continue;
                }
                summary.candidates += 1;

                if let Some(recency) = &self.recency {
                    if let Some(last) = recency.last_message(&user).await? {
                        info!(
                            user = %user.name,
                            last_author = %last.user_name,
                            last_at = %last.timestamp,
                            last_text = %last.text,
                            "Found recent message for {} - not voiding", user.name
                        );
                        summary.exempted += 1;
                        continue;
                    }
                }

                match self.quarantine.apply(&user).await {
                    Ok(outcome) => {
                        info!(
                            user_id = %outcome.user_id,
                            user = %outcome.user_name,
                            invited = outcome.invited,
                            kicked = outcome.kicked.len(),
                            failed_kicks = outcome.failed_kicks.len(),
                            preview = outcome.preview,
                            "Voided {}", outcome.user_name
                        );
                        summary.quarantined += 1;
                        summary.failed_kicks += outcome.failed_kicks.len();
                    }
                    Err(e) => {
                        error!(user = %user.name, error = %e, "Quarantine failed, skipping user");
                        summary.failed += 1;
                    }
                }

                if summary.attempted() >= self.max_users {
                    info!(max_users = self.max_users, "Processed-user cap reached");
                    summary.capped = true;
                    break 'scan;
                }
            }
        }

        info!(
            run_id = %summary.run_id,
            quarantined = summary.quarantined,
            exempted = summary.exempted,
            failed = summary.failed,
            failed_kicks = summary.failed_kicks,
            "Sweep finished"
        );
        Ok(summary)
    }

    async fn load_quarantined(&self) -> Result<QuarantineSet> {
        let members =
            slack::all_channel_members(self.directory.as_ref(), &self.holding_channel).await?;
        info!(
            channel = %self.holding_channel,
            count = members.len(),
            "Loaded already-voided users"
        );
        debug!(members = ?members, "Already voided");
        Ok(members.into_iter().collect())
    }
}
