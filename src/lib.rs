//! slack-void: moves inactive workspace members into a holding channel.

pub mod config;
pub mod error;
pub mod slack;
pub mod sweep;
