//! Agentry Core Library
//!
//! Re-exports the recruitment orchestrator and its collaborators for
//! programmatic access.

pub mod classify;
pub mod config;
pub mod error;
pub mod executors;
pub mod guard;
pub mod identity;
pub mod invite;
pub mod messages;
pub mod metrics;
pub mod obs;
pub mod optout;
pub mod orchestrator;
pub mod pipeline;
pub mod qualify;
pub mod strategy;
pub mod telemetry;
pub mod util;

pub use classify::{analyze_response, contact_status, Confidence, ResponseAnalysis, ResponseIntent};
pub use config::RecruitConfig;
pub use error::{RecruitError, Result};
pub use executors::{ChannelRegistry, ContactExecutor, ContactOutcome};
pub use guard::{check_domain, check_global};
pub use identity::{ensure_recruiter, recruiter_profile, RECRUITER_SLUG};
pub use invite::{invite_url, mint_invite_token};
pub use messages::{
    build_a2a_invitation, build_preview_text, build_repo_issue_invitation, build_rest_invitation,
    build_webhook_invitation, MessageContext,
};
pub use metrics::{Metrics, METRICS};
pub use optout::{is_domain_opted_out, record_opt_out};
pub use orchestrator::{
    BatchOptions, BatchReport, Funnel, Orchestrator, RecruitOptions, RecruitOutcome, RecruitStatus,
    StatusReport, Stores,
};
pub use pipeline::{
    execute_messages, preview_messages, run_discover, run_pipeline, CandidateSource,
    DiscoverSummary, DiscoveryReport, PipelineOptions, PipelineReport, PreviewMessage,
};
pub use qualify::{qualify_candidates, score_candidate, CandidateScore, QualifiedCandidate};
pub use strategy::{plan_strategies, ContactStrategy};
pub use telemetry::{init_tracing, LogFormat};

pub use agentry_state::{
    AttemptDraft, AttemptLedger, AttemptRecord, AttemptStatus, Candidate, CandidateDraft,
    CandidateFilter, CandidateStatus, CandidateStore, ContactChannel, ContactedRef,
    EnsuredPrincipal, InviteDraft, InviteRecord, InviteStore, LedgerStats, OptOutRecord,
    OptOutRegistry, PrincipalProfile, PrincipalRecord, PrincipalRegistry, StorageError,
    SurrealStore,
};
