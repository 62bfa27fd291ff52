//! Inactive-member sweep: normalize, filter, optionally check recency,
//! then quarantine.

pub mod eligibility;
pub mod quarantine;
pub mod recency;
pub mod runner;
pub mod user;

pub use eligibility::{EligibilityFilter, Exclusion, QuarantineSet};
pub use quarantine::{QuarantineAction, QuarantineOutcome};
pub use recency::{LastMessage, RecencyCheck};
pub use runner::{RunSummary, Sweeper};
pub use user::{NormalizedUser, normalize};
