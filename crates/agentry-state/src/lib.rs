//! Agentry-State: SurrealDB persistence for the recruitment orchestrator
//!
//! This crate is the durable layer under the outreach pipeline. It defines
//! backend-agnostic storage traits, the SurrealDB-backed implementation,
//! and in-memory fakes for testing.
//!
//! ## Key invariants (enforced by schema, see `migrations`)
//!
//! - One attempt ledger row per (target_url, channel) pair
//! - One opt-out entry per normalized domain
//! - One candidate per source URL, one invite per token

mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
mod surreal_store;

pub use error::StorageError;
pub use migrations::init_schema;
pub use storage_traits::{
    AttemptDraft, AttemptLedger, AttemptRecord, AttemptStatus, Candidate, CandidateDraft,
    CandidateFilter, CandidateStatus, CandidateStore, ContactChannel, ContactedRef,
    EnsuredPrincipal, InviteDraft, InviteRecord, InviteStore, LedgerStats, OptOutRecord,
    OptOutRegistry, PrincipalProfile, PrincipalRecord, PrincipalRegistry, StorageResult,
};
pub use surreal_store::SurrealStore;
