//! Error types for the recruitment orchestrator
//!
//! The taxonomy follows how callers must react:
//! - `RateLimited` and `Disabled` abort an entire call; the caller backs
//!   off and retries later.
//! - `Storage` is an infrastructure fault.
//! - Eligibility skips (not unclaimed, opted out, no strategy, dry-run)
//!   are *values*, not errors — see `orchestrator::RecruitOutcome`.

use thiserror::Error;

use agentry_state::StorageError;

/// Errors surfaced by the recruitment orchestrator and pipeline.
#[derive(Error, Debug)]
pub enum RecruitError {
    /// Candidate id does not exist
    #[error("Candidate not found: {0}")]
    NotFound(String),

    /// Hourly/daily ceiling or per-domain politeness window violated.
    /// Fatal to the current batch; retry later.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Live sends requested while the global recruitment switch is off
    #[error("Recruitment is disabled (set AGENTRY_RECRUITMENT_ENABLED=true)")]
    Disabled,

    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for recruitment operations
pub type Result<T> = std::result::Result<T, RecruitError>;
