//! End-to-end orchestrator behavior against in-memory stores and
//! scripted executors.

use agentry_core::{
    build_rest_invitation, BatchOptions, ChannelRegistry, ContactExecutor, ContactOutcome,
    MessageContext, Orchestrator, RecruitConfig, RecruitOptions, RecruitStatus, Stores,
};
use agentry_state::fakes::{
    MemoryAttemptLedger, MemoryCandidateStore, MemoryInviteStore, MemoryOptOutRegistry,
    MemoryPrincipalRegistry,
};
use agentry_state::{
    AttemptLedger, AttemptStatus, Candidate, CandidateStatus, ContactChannel, OptOutRegistry,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Executor that returns a scripted outcome and records every call.
struct ScriptedExecutor {
    outcome: Mutex<Vec<ContactOutcome>>,
    fallback: ContactOutcome,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    fn always(outcome: ContactOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Vec::new()),
            fallback: outcome,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactExecutor for ScriptedExecutor {
    async fn contact(&self, _target_url: &str, _payload: &Value) -> ContactOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut queued = self.outcome.lock().unwrap();
        queued.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

fn delivered_outcome() -> ContactOutcome {
    ContactOutcome {
        success: true,
        sent: true,
        status: Some(200),
        response: Some(json!({"queued": true})),
        error: None,
        note: None,
    }
}

fn failed_outcome() -> ContactOutcome {
    ContactOutcome {
        success: false,
        sent: false,
        status: None,
        response: None,
        error: Some("connection refused".into()),
        note: None,
    }
}

fn rest_payload(ctx: &MessageContext<'_>) -> Value {
    build_rest_invitation(ctx)
}

struct Harness {
    candidates: Arc<MemoryCandidateStore>,
    ledger: Arc<MemoryAttemptLedger>,
    opt_outs: Arc<MemoryOptOutRegistry>,
    executor: Arc<ScriptedExecutor>,
    orchestrator: Orchestrator,
}

fn harness(executor: Arc<ScriptedExecutor>, config: RecruitConfig) -> Harness {
    let candidates = Arc::new(MemoryCandidateStore::new());
    let ledger = Arc::new(MemoryAttemptLedger::new());
    let opt_outs = Arc::new(MemoryOptOutRegistry::new());
    let stores = Stores {
        candidates: candidates.clone(),
        ledger: ledger.clone(),
        opt_outs: opt_outs.clone(),
        invites: Arc::new(MemoryInviteStore::new()),
        principals: Arc::new(MemoryPrincipalRegistry::new()),
    };

    let mut registry = ChannelRegistry::empty();
    for channel in ContactChannel::ALL {
        registry.register(channel, rest_payload, executor.clone());
    }

    Harness {
        candidates,
        ledger,
        opt_outs,
        executor: executor.clone(),
        orchestrator: Orchestrator::new(config, stores, registry),
    }
}

fn live_config() -> RecruitConfig {
    RecruitConfig {
        enabled: true,
        default_dry_run: false,
        contact_delay: Duration::ZERO,
        ..RecruitConfig::default()
    }
}

fn endpoint_candidate(id: &str, host: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        source_url: format!("https://{host}/agents/{id}"),
        name: format!("bot-{id}"),
        description: Some("A capable autonomous assistant for scheduling and triage".into()),
        skills: vec!["scheduling".into()],
        endpoint_url: Some(format!("https://{host}/api/messages")),
        website_url: None,
        source_platform: "huggingface".into(),
        source_data: json!({}),
        status: CandidateStatus::Unclaimed,
        imported_at: Utc::now(),
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
async fn successful_contact_writes_one_ledger_row() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let outcome = h
        .orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();

    assert_eq!(outcome.status, RecruitStatus::Delivered);
    assert_eq!(outcome.attempt_number, Some(1));
    assert!(outcome.invite_url.as_deref().unwrap().contains("/join/inv_"));
    // First strategy (well-known on the endpoint origin) succeeded, so
    // exactly one executor call and one ledger row.
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.ledger.len(), 1);
}

#[tokio::test]
async fn repeat_contact_mutates_the_same_row() {
    let config = live_config();
    let h = harness(ScriptedExecutor::always(failed_outcome()), config);
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let first = h
        .orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();
    assert_eq!(first.status, RecruitStatus::Failed);

    // Every strategy failed once: well-known, rest, webhook.
    let rows_after_first = h.ledger.len();
    assert_eq!(rows_after_first, 3);

    // Clear the retry schedule so the pairs are immediately eligible.
    for channel in [
        ContactChannel::WellKnown,
        ContactChannel::Rest,
        ContactChannel::Webhook,
    ] {
        let row = h
            .ledger
            .find("https://bot.example.com/agents/c1", channel)
            .await
            .unwrap()
            .unwrap();
        let mut eligible = row.clone();
        eligible.next_retry_at = None;
        h.ledger.seed(eligible);
    }

    h.orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();

    // No new rows, only mutated ones.
    assert_eq!(h.ledger.len(), rows_after_first);
    let row = h
        .ledger
        .find("https://bot.example.com/agents/c1", ContactChannel::WellKnown)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.attempt_number, 2);
}

#[tokio::test]
async fn opted_out_domain_is_never_contacted() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));
    h.opt_outs
        .add("bot.example.com", Some("operator request".into()))
        .await
        .unwrap();

    let outcome = h
        .orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();

    assert_eq!(outcome.status, RecruitStatus::OptedOut);
    assert_eq!(h.executor.calls(), 0);
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn opt_out_response_registers_domain_and_retires_attempts() {
    let outcome = ContactOutcome {
        success: true,
        sent: true,
        status: Some(200),
        response: Some(json!({"message": "please do not contact us again, unsubscribe"})),
        error: None,
        note: None,
    };
    let h = harness(ScriptedExecutor::always(outcome), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let result = h
        .orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();

    assert_eq!(result.status, RecruitStatus::OptedOut);
    assert!(h.opt_outs.get("bot.example.com").await.unwrap().is_some());
    let row = h
        .ledger
        .find("https://bot.example.com/agents/c1", ContactChannel::WellKnown)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, AttemptStatus::OptedOut);
    assert!(row.next_retry_at.is_none());
    // One contact, then the walk stopped.
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test]
async fn failed_attempts_stop_at_the_retry_ceiling() {
    let config = live_config();
    let h = harness(ScriptedExecutor::always(failed_outcome()), config.clone());
    let candidate = endpoint_candidate("c1", "bot.example.com");
    h.candidates.seed(candidate.clone());

    // Exhausted history on every channel the plan will produce.
    for channel in [
        ContactChannel::WellKnown,
        ContactChannel::Rest,
        ContactChannel::Webhook,
    ] {
        let at = Utc::now() - chrono::Duration::days(2);
        h.ledger.seed(agentry_state::AttemptRecord {
            id: format!("att-{channel}"),
            candidate_id: "c1".into(),
            target_name: candidate.name.clone(),
            target_url: candidate.source_url.clone(),
            contact_url: candidate.endpoint_url.clone().unwrap(),
            channel,
            attempt_number: config.max_retry_attempts,
            status: AttemptStatus::Failed,
            request_payload: json!({}),
            response_payload: None,
            response_status: None,
            error: Some("connection refused".into()),
            next_retry_at: None,
            campaign: "test".into(),
            invite_token: None,
            created_at: at,
            updated_at: at,
        });
    }

    let outcome = h
        .orchestrator
        .recruit_candidate("c1", &live_opts())
        .await
        .unwrap();

    assert_eq!(outcome.status, RecruitStatus::Failed);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("All recruitment strategies failed")
    );
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test]
async fn executing_twice_skips_the_second_pass() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let batch = BatchOptions {
        campaign: Some("test".into()),
        dry_run: Some(false),
        candidate_ids: Some(vec!["c1".into()]),
        ..BatchOptions::default()
    };

    let first = h.orchestrator.recruit_batch(&batch).await.unwrap();
    assert_eq!(first.sent, 1);
    assert_eq!(first.delivered, 1);

    // The second run finds a Delivered row inside the recency window on
    // the winning channel, and the politeness guard blocks everything
    // else on the same domain.
    let second = h.orchestrator.recruit_batch(&batch).await;
    assert!(second.is_err(), "politeness guard should abort the rerun");
    assert_eq!(h.executor.calls(), 1);
    assert_eq!(h.ledger.len(), 1);
}

#[tokio::test]
async fn disabled_live_batch_fails_fast() {
    let config = RecruitConfig {
        enabled: false,
        default_dry_run: false,
        contact_delay: Duration::ZERO,
        ..RecruitConfig::default()
    };
    let h = harness(ScriptedExecutor::always(delivered_outcome()), config);
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let batch = BatchOptions {
        dry_run: Some(false),
        ..BatchOptions::default()
    };
    let result = h.orchestrator.recruit_batch(&batch).await;
    assert!(matches!(
        result,
        Err(agentry_core::RecruitError::Disabled)
    ));
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test]
async fn dry_run_writes_no_ledger_rows() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let outcome = h
        .orchestrator
        .recruit_candidate(
            "c1",
            &RecruitOptions {
                campaign: Some("test".into()),
                dry_run: Some(true),
                channels: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, RecruitStatus::Skipped);
    assert_eq!(outcome.reason.as_deref(), Some("Dry-run mode; no invitation sent"));
    assert!(outcome.invite_url.is_some());
    assert_eq!(h.executor.calls(), 0);
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn channel_allow_list_filters_strategies() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    h.candidates.seed(endpoint_candidate("c1", "bot.example.com"));

    let outcome = h
        .orchestrator
        .recruit_candidate(
            "c1",
            &RecruitOptions {
                campaign: Some("test".into()),
                dry_run: Some(false),
                channels: Some(vec![ContactChannel::Rest]),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.channel, Some(ContactChannel::Rest));
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test]
async fn unknown_candidate_is_an_error() {
    let h = harness(ScriptedExecutor::always(delivered_outcome()), live_config());
    let result = h.orchestrator.recruit_candidate("ghost", &live_opts()).await;
    assert!(matches!(
        result,
        Err(agentry_core::RecruitError::NotFound(_))
    ));
}
