//! Storage trait definitions for the Agentry recruitment subsystem
//!
//! These traits define the durable abstractions the orchestrator runs on:
//! - `CandidateStore`: imported candidate listings (read-mostly)
//! - `AttemptLedger`: one evolving row per (target URL, contact channel)
//! - `OptOutRegistry`: domains that must never be contacted again
//! - `InviteStore`: single-use invite tokens
//! - `PrincipalRegistry`: the system recruiter identity
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Shared enums
// ---------------------------------------------------------------------------

/// One supported way of contacting a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    /// JSON invitation POSTed to the candidate's own endpoint
    Rest,
    /// Agent-to-agent JSON-RPC invitation
    A2a,
    /// Tool-invocation protocol (probe tool listing, call a contact tool)
    Mcp,
    /// Discovery-document probe (`/.well-known/agent-card.json`)
    WellKnown,
    /// Issue opened on the hosting repository
    RepoIssue,
    /// Generic webhook-style ping
    Webhook,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactChannel::Rest => "rest",
            ContactChannel::A2a => "a2a",
            ContactChannel::Mcp => "mcp",
            ContactChannel::WellKnown => "well_known",
            ContactChannel::RepoIssue => "repo_issue",
            ContactChannel::Webhook => "webhook",
        }
    }

    /// All channels, in no particular order.
    pub const ALL: [ContactChannel; 6] = [
        ContactChannel::Rest,
        ContactChannel::A2a,
        ContactChannel::Mcp,
        ContactChannel::WellKnown,
        ContactChannel::RepoIssue,
        ContactChannel::Webhook,
    ];
}

impl std::fmt::Display for ContactChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContactChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown contact channel: {s}"))
    }
}

/// Outcome of the most recent attempt on a (target, channel) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    Sent,
    Delivered,
    Interested,
    Registered,
    Declined,
    Failed,
    OptedOut,
}

impl AttemptStatus {
    /// Terminal outcomes: no further attempts are ever made on the pair.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Declined
                | AttemptStatus::OptedOut
                | AttemptStatus::Registered
                | AttemptStatus::Interested
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Sent => "sent",
            AttemptStatus::Delivered => "delivered",
            AttemptStatus::Interested => "interested",
            AttemptStatus::Registered => "registered",
            AttemptStatus::Declined => "declined",
            AttemptStatus::Failed => "failed",
            AttemptStatus::OptedOut => "opted_out",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an imported candidate listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Unclaimed,
    ClaimPending,
    Claimed,
    Rejected,
}

// ---------------------------------------------------------------------------
// CandidateStore — imported candidate listings
// ---------------------------------------------------------------------------

/// An externally discovered, not-yet-registered agent listing.
///
/// Written by importer collaborators; the orchestrator treats it as
/// read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Unique identity of the listing (repository URL, model page, ...)
    pub source_url: String,
    pub name: String,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub endpoint_url: Option<String>,
    pub website_url: Option<String>,
    /// Hosting platform tag: "github", "huggingface", "csv", ...
    pub source_platform: String,
    /// Raw importer metadata (stars, likes, updated_at, protocols, ...)
    pub source_data: serde_json::Value,
    pub status: CandidateStatus,
    pub imported_at: DateTime<Utc>,
}

/// Input for inserting/refreshing a candidate listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub source_url: String,
    pub name: String,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub endpoint_url: Option<String>,
    pub website_url: Option<String>,
    pub source_platform: String,
    pub source_data: serde_json::Value,
}

/// Filter for listing unclaimed candidates.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    /// Restrict to one hosting platform.
    pub source_platform: Option<String>,
    /// Restrict to an explicit id set.
    pub ids: Option<Vec<String>>,
    /// Maximum rows returned.
    pub limit: usize,
}

/// Imported candidate persistence.
///
/// Guarantees:
/// - `source_url` is unique; re-importing refreshes attributes but
///   preserves id, status, and `imported_at`.
/// - `list_unclaimed` returns newest-imported first.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Insert a new candidate or refresh an existing one by `source_url`.
    async fn upsert(&self, draft: CandidateDraft) -> StorageResult<Candidate>;

    /// Fetch a candidate by id.
    async fn get(&self, id: &str) -> StorageResult<Candidate>;

    /// List unclaimed candidates matching the filter, newest first.
    async fn list_unclaimed(&self, filter: CandidateFilter) -> StorageResult<Vec<Candidate>>;
}

// ---------------------------------------------------------------------------
// AttemptLedger — contact attempt persistence
// ---------------------------------------------------------------------------

/// The durable record of one (target URL, channel) contact relationship.
///
/// A retry does not create a new row: the same row is mutated with a
/// monotonically increasing `attempt_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub candidate_id: String,
    pub target_name: String,
    pub target_url: String,
    /// The URL the invitation was actually delivered to (may differ from
    /// `target_url`, e.g. a contact endpoint discovered via an agent card).
    pub contact_url: String,
    pub channel: ContactChannel,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub response_status: Option<u16>,
    pub error: Option<String>,
    /// When the pair becomes eligible for another attempt; `None` once
    /// terminal or retry-exhausted.
    pub next_retry_at: Option<DateTime<Utc>>,
    pub campaign: String,
    pub invite_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for one attempt upsert. The store assigns `attempt_number`
/// (existing + 1, or 1) and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDraft {
    pub candidate_id: String,
    pub target_name: String,
    pub target_url: String,
    pub contact_url: String,
    pub channel: ContactChannel,
    pub status: AttemptStatus,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub response_status: Option<u16>,
    pub error: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub campaign: String,
    pub invite_token: Option<String>,
}

/// Target/contact URL pair of a past attempt, for domain politeness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactedRef {
    pub target_url: String,
    pub contact_url: String,
}

/// Aggregated ledger counters for the status report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total: u64,
    pub by_status: std::collections::BTreeMap<String, u64>,
    pub by_channel: std::collections::BTreeMap<String, u64>,
    pub by_campaign: std::collections::BTreeMap<String, u64>,
}

/// Contact attempt ledger.
///
/// Guarantees:
/// - At most one row per (target_url, channel), enforced by the backing
///   store's unique index.
/// - `upsert` is find-or-create-then-mutate: an existing row is updated
///   in place with `attempt_number + 1`; `created_at` is preserved.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    /// Load the ledger row for a pair, if one exists.
    async fn find(
        &self,
        target_url: &str,
        channel: ContactChannel,
    ) -> StorageResult<Option<AttemptRecord>>;

    /// Record an attempt, creating or mutating the pair's single row.
    async fn upsert(&self, draft: AttemptDraft) -> StorageResult<AttemptRecord>;

    /// Count non-pending attempts created at or after `since`.
    async fn count_active_since(&self, since: DateTime<Utc>) -> StorageResult<u64>;

    /// Target/contact URLs of attempts created at or after `since` whose
    /// status is in `statuses`.
    async fn contacts_since(
        &self,
        since: DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<Vec<ContactedRef>>;

    /// Whether `target_url` has any attempt created at or after `since`
    /// with a status in `statuses`.
    async fn target_contacted_since(
        &self,
        target_url: &str,
        since: DateTime<Utc>,
        statuses: &[AttemptStatus],
    ) -> StorageResult<bool>;

    /// Force every non-opted-out attempt whose target or contact URL
    /// contains `domain` to `OptedOut`, clearing retry schedules.
    /// Returns the number of rows retired.
    async fn retire_domain(&self, domain: &str, note: &str) -> StorageResult<u64>;

    /// Aggregate counters across the whole ledger.
    async fn stats(&self) -> StorageResult<LedgerStats>;

    /// Most recently updated attempts, newest first.
    async fn recent(&self, limit: usize) -> StorageResult<Vec<AttemptRecord>>;
}

// ---------------------------------------------------------------------------
// OptOutRegistry — do-not-contact domains
// ---------------------------------------------------------------------------

/// A domain that must never be contacted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptOutRecord {
    pub domain: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Opt-out registry keyed by normalized domain.
///
/// `add` is an upsert: re-adding a domain refreshes the reason but never
/// duplicates the entry.
#[async_trait]
pub trait OptOutRegistry: Send + Sync {
    /// Add (or refresh) an opt-out entry. `domain` must be pre-normalized.
    async fn add(&self, domain: &str, reason: Option<String>) -> StorageResult<OptOutRecord>;

    /// Whether any of the candidate domains is opted out.
    async fn contains_any(&self, domains: &[String]) -> StorageResult<bool>;

    /// Fetch one entry by exact domain.
    async fn get(&self, domain: &str) -> StorageResult<Option<OptOutRecord>>;

    /// All entries, newest first.
    async fn list(&self) -> StorageResult<Vec<OptOutRecord>>;

    /// Remove an entry. Returns whether it existed.
    async fn remove(&self, domain: &str) -> StorageResult<bool>;

    /// Total entry count.
    async fn count(&self) -> StorageResult<u64>;
}

// ---------------------------------------------------------------------------
// InviteStore — single-use invite tokens
// ---------------------------------------------------------------------------

/// A pre-filled registration invite, consumable through `/join/<token>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRecord {
    pub token: String,
    pub campaign: String,
    pub agent_name: Option<String>,
    /// Snapshot of candidate data used to pre-fill the registration form.
    pub agent_data: Option<serde_json::Value>,
    pub max_uses: u32,
    pub used_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    /// Principal id of the recruiter that minted this invite.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Input for minting an invite token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteDraft {
    pub token: String,
    pub campaign: String,
    pub agent_name: Option<String>,
    pub agent_data: Option<serde_json::Value>,
    pub max_uses: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

/// Invite token persistence.
#[async_trait]
pub trait InviteStore: Send + Sync {
    /// Persist a freshly minted token. Tokens are unique.
    async fn create(&self, draft: InviteDraft) -> StorageResult<InviteRecord>;

    /// Fetch an invite by token.
    async fn get(&self, token: &str) -> StorageResult<Option<InviteRecord>>;

    /// Consume one use of a token. Fails with `InviteExhausted` when the
    /// token is expired or fully used.
    async fn redeem(&self, token: &str) -> StorageResult<InviteRecord>;
}

// ---------------------------------------------------------------------------
// PrincipalRegistry — the system recruiter identity
// ---------------------------------------------------------------------------

/// Declarative profile of a system principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalProfile {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub protocols: Vec<String>,
}

/// A registered system principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub skills: Vec<String>,
    pub protocols: Vec<String>,
    pub api_key_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of an idempotent `ensure` call. The plaintext API key is only
/// present the first time the principal is created.
#[derive(Debug, Clone)]
pub struct EnsuredPrincipal {
    pub principal: PrincipalRecord,
    pub minted_api_key: Option<String>,
}

/// System principal persistence.
///
/// `ensure` is idempotent: an existing principal (by slug) is refreshed
/// and reused, never duplicated.
#[async_trait]
pub trait PrincipalRegistry: Send + Sync {
    /// Create the principal if absent, refresh its profile otherwise.
    async fn ensure(&self, profile: &PrincipalProfile) -> StorageResult<EnsuredPrincipal>;

    /// Fetch a principal by slug.
    async fn get(&self, slug: &str) -> StorageResult<Option<PrincipalRecord>>;
}
