//! Rate-cap and domain-politeness behavior across candidates.

use agentry_core::{
    build_rest_invitation, ChannelRegistry, ContactExecutor, ContactOutcome, MessageContext,
    Orchestrator, RecruitConfig, RecruitError, RecruitOptions, RecruitStatus, Stores,
};
use agentry_state::fakes::{
    MemoryAttemptLedger, MemoryCandidateStore, MemoryInviteStore, MemoryOptOutRegistry,
    MemoryPrincipalRegistry,
};
use agentry_state::{AttemptRecord, AttemptStatus, Candidate, CandidateStatus, ContactChannel};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl ContactExecutor for CountingExecutor {
    async fn contact(&self, _target_url: &str, _payload: &Value) -> ContactOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ContactOutcome {
            success: true,
            sent: true,
            status: Some(200),
            response: None,
            error: None,
            note: None,
        }
    }
}

fn rest_payload(ctx: &MessageContext<'_>) -> Value {
    build_rest_invitation(ctx)
}

fn setup(
    config: RecruitConfig,
) -> (
    Arc<MemoryCandidateStore>,
    Arc<MemoryAttemptLedger>,
    Arc<CountingExecutor>,
    Orchestrator,
) {
    let candidates = Arc::new(MemoryCandidateStore::new());
    let ledger = Arc::new(MemoryAttemptLedger::new());
    let executor = Arc::new(CountingExecutor {
        calls: AtomicUsize::new(0),
    });

    let stores = Stores {
        candidates: candidates.clone(),
        ledger: ledger.clone(),
        opt_outs: Arc::new(MemoryOptOutRegistry::new()),
        invites: Arc::new(MemoryInviteStore::new()),
        principals: Arc::new(MemoryPrincipalRegistry::new()),
    };

    let mut registry = ChannelRegistry::empty();
    for channel in ContactChannel::ALL {
        registry.register(channel, rest_payload, executor.clone());
    }

    (
        candidates.clone(),
        ledger,
        executor.clone(),
        Orchestrator::new(config, stores, registry),
    )
}

fn live_config() -> RecruitConfig {
    RecruitConfig {
        enabled: true,
        default_dry_run: false,
        contact_delay: Duration::ZERO,
        ..RecruitConfig::default()
    }
}

fn candidate(id: &str, host: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        source_url: format!("https://{host}/agents/{id}"),
        name: format!("bot-{id}"),
        description: Some("An agent with a long enough description to count".into()),
        skills: vec!["chat".into()],
        endpoint_url: Some(format!("https://{host}/api")),
        website_url: None,
        source_platform: "huggingface".into(),
        source_data: json!({}),
        status: CandidateStatus::Unclaimed,
        imported_at: Utc::now(),
    }
}

fn seeded_attempt(target: &str, status: AttemptStatus, days_ago: i64) -> AttemptRecord {
    let at = Utc::now() - ChronoDuration::days(days_ago);
    AttemptRecord {
        id: format!("seed-{target}"),
        candidate_id: "seed".into(),
        target_name: "seed".into(),
        target_url: target.to_string(),
        contact_url: target.to_string(),
        channel: ContactChannel::Rest,
        attempt_number: 1,
        status,
        request_payload: json!({}),
        response_payload: None,
        response_status: None,
        error: None,
        next_retry_at: None,
        campaign: "seed".into(),
        invite_token: None,
        created_at: at,
        updated_at: at,
    }
}

fn live_opts() -> RecruitOptions {
    RecruitOptions {
        campaign: Some("test".into()),
        dry_run: Some(false),
        channels: None,
    }
}

#[tokio::test]
async fn same_domain_is_contacted_once_per_window() {
    let (candidates, ledger, executor, orchestrator) = setup(live_config());
    candidates.seed(candidate("a", "shared.example.com"));
    ledger.seed(seeded_attempt(
        "https://shared.example.com/agents/other",
        AttemptStatus::Sent,
        2,
    ));

    let result = orchestrator.recruit_candidate("a", &live_opts()).await;
    assert!(matches!(result, Err(RecruitError::RateLimited(_))));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn different_domains_are_independent() {
    let (candidates, ledger, executor, orchestrator) = setup(live_config());
    candidates.seed(candidate("a", "first.example.com"));
    ledger.seed(seeded_attempt(
        "https://second.example.org/agents/other",
        AttemptStatus::Sent,
        2,
    ));

    let outcome = orchestrator
        .recruit_candidate("a", &live_opts())
        .await
        .unwrap();
    assert_eq!(outcome.status, RecruitStatus::Delivered);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_contacts_do_not_block_the_domain() {
    let (candidates, ledger, executor, orchestrator) = setup(live_config());
    candidates.seed(candidate("a", "shared.example.com"));
    ledger.seed(seeded_attempt(
        "https://shared.example.com/agents/other",
        AttemptStatus::Sent,
        10,
    ));

    let outcome = orchestrator
        .recruit_candidate("a", &live_opts())
        .await
        .unwrap();
    assert_eq!(outcome.status, RecruitStatus::Delivered);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hourly_cap_aborts_before_any_executor_call() {
    let config = RecruitConfig {
        max_per_hour: 1,
        ..live_config()
    };
    let (candidates, ledger, executor, orchestrator) = setup(config);
    candidates.seed(candidate("a", "fresh.example.com"));
    // One non-pending attempt in the trailing hour saturates the cap.
    ledger.seed(seeded_attempt(
        "https://elsewhere.example.org/agents/x",
        AttemptStatus::Delivered,
        0,
    ));

    let result = orchestrator.recruit_candidate("a", &live_opts()).await;
    assert!(matches!(result, Err(RecruitError::RateLimited(_))));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_ignores_rate_guards() {
    let config = RecruitConfig {
        max_per_hour: 1,
        ..live_config()
    };
    let (candidates, ledger, executor, orchestrator) = setup(config);
    candidates.seed(candidate("a", "fresh.example.com"));
    ledger.seed(seeded_attempt(
        "https://elsewhere.example.org/agents/x",
        AttemptStatus::Delivered,
        0,
    ));

    let outcome = orchestrator
        .recruit_candidate(
            "a",
            &RecruitOptions {
                campaign: Some("test".into()),
                dry_run: Some(true),
                channels: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, RecruitStatus::Skipped);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}
