//! Qualification scoring, preview, and the dry-run pipeline.

use agentry_core::{
    build_rest_invitation, plan_strategies, preview_messages, qualify_candidates, run_pipeline,
    score_candidate, CandidateSource, ChannelRegistry, ContactExecutor, ContactOutcome,
    DiscoveryReport, MessageContext, Orchestrator, PipelineOptions, RecruitConfig, Result, Stores,
};
use agentry_state::fakes::{
    MemoryAttemptLedger, MemoryCandidateStore, MemoryInviteStore, MemoryOptOutRegistry,
    MemoryPrincipalRegistry,
};
use agentry_state::{
    AttemptRecord, AttemptStatus, Candidate, CandidateDraft, CandidateStatus, CandidateStore,
    ContactChannel, OptOutRegistry,
};
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

fn repo_issue_payload(ctx: &MessageContext<'_>) -> Value {
    let (title, body) = agentry_core::build_repo_issue_invitation(ctx);
    json!({ "title": title, "body": body })
}

struct Harness {
    candidates: Arc<MemoryCandidateStore>,
    ledger: Arc<MemoryAttemptLedger>,
    opt_outs: Arc<MemoryOptOutRegistry>,
    invites: Arc<MemoryInviteStore>,
    executor: Arc<CountingExecutor>,
    orchestrator: Orchestrator,
}

fn harness() -> Harness {
    let candidates = Arc::new(MemoryCandidateStore::new());
    let ledger = Arc::new(MemoryAttemptLedger::new());
    let opt_outs = Arc::new(MemoryOptOutRegistry::new());
    let invites = Arc::new(MemoryInviteStore::new());
    let executor = Arc::new(CountingExecutor {
        calls: AtomicUsize::new(0),
    });

    let stores = Stores {
        candidates: candidates.clone(),
        ledger: ledger.clone(),
        opt_outs: opt_outs.clone(),
        invites: invites.clone(),
        principals: Arc::new(MemoryPrincipalRegistry::new()),
    };

    let mut registry = ChannelRegistry::empty();
    for channel in ContactChannel::ALL {
        let builder: agentry_core::executors::PayloadBuilder = if channel == ContactChannel::RepoIssue {
            repo_issue_payload
        } else {
            rest_payload
        };
        registry.register(channel, builder, executor.clone());
    }

    let config = RecruitConfig {
        enabled: true,
        default_dry_run: true,
        contact_delay: Duration::ZERO,
        ..RecruitConfig::default()
    };

    Harness {
        candidates,
        ledger,
        opt_outs,
        invites,
        executor: executor.clone(),
        orchestrator: Orchestrator::new(config, stores, registry),
    }
}

fn strong_github_candidate(id: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        source_url: format!("https://github.com/acme/{id}"),
        name: id.to_string(),
        description: Some(
            "An autonomous code review agent that integrates with CI pipelines, posts \
             inline suggestions, and adapts to each team's conventions over time."
                .into(),
        ),
        skills: vec!["code-review".into(), "ci".into()],
        endpoint_url: None,
        website_url: None,
        source_platform: "github".into(),
        source_data: json!({
            "stargazers_count": 240,
            "documentation_url": "https://acme.github.io/docs",
            "updated_at": (Utc::now() - ChronoDuration::days(10)).to_rfc3339(),
        }),
        status: CandidateStatus::Unclaimed,
        imported_at: Utc::now(),
    }
}

#[tokio::test]
async fn strong_github_candidate_scores_high_with_repo_issue_first() {
    let candidate = strong_github_candidate("helper-bot");

    let scored = score_candidate(&candidate);
    assert!(scored.score >= 15, "score was {}", scored.score);

    let plan = plan_strategies(&candidate);
    assert_eq!(plan.first().map(|s| s.channel), Some(ContactChannel::RepoIssue));
}

#[tokio::test]
async fn qualification_filters_opted_out_and_recent() {
    let h = harness();
    h.candidates.seed(strong_github_candidate("fresh-bot"));

    let mut opted = strong_github_candidate("opted-bot");
    opted.source_url = "https://opted.example.com/bot".into();
    opted.endpoint_url = Some("https://opted.example.com/api".into());
    opted.source_platform = "huggingface".into();
    h.candidates.seed(opted);
    h.opt_outs.add("opted.example.com", None).await.unwrap();

    let mut recent = strong_github_candidate("recent-bot");
    recent.source_url = "https://hub.example.org/recent-bot".into();
    recent.endpoint_url = Some("https://hub.example.org/api".into());
    recent.source_platform = "huggingface".into();
    h.candidates.seed(recent.clone());
    let at = Utc::now() - ChronoDuration::days(1);
    h.ledger.seed(AttemptRecord {
        id: "seed".into(),
        candidate_id: recent.id.clone(),
        target_name: recent.name.clone(),
        target_url: recent.source_url.clone(),
        contact_url: recent.source_url.clone(),
        channel: ContactChannel::Rest,
        attempt_number: 1,
        status: AttemptStatus::Sent,
        request_payload: json!({}),
        response_payload: None,
        response_status: None,
        error: None,
        next_retry_at: None,
        campaign: "seed".into(),
        invite_token: None,
        created_at: at,
        updated_at: at,
    });

    let qualified = qualify_candidates(
        h.candidates.as_ref(),
        h.ledger.as_ref(),
        h.opt_outs.as_ref(),
        h.orchestrator.config(),
        Some(10),
        Some(1),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = qualified.iter().map(|q| q.candidate.id.as_str()).collect();
    assert!(ids.contains(&"fresh-bot"));
    assert!(!ids.contains(&"opted-bot"));
    assert!(!ids.contains(&"recent-bot"));
}

#[tokio::test]
async fn qualification_orders_by_score_then_recency() {
    let h = harness();
    let strong = strong_github_candidate("strong-bot");
    h.candidates.seed(strong);

    let mut weak = strong_github_candidate("weak-bot");
    weak.source_url = "https://hub.example.org/weak-bot".into();
    weak.endpoint_url = Some("https://hub.example.org/api".into());
    weak.source_platform = "huggingface".into();
    weak.source_data = json!({});
    weak.description = Some("Does one small thing reasonably well every day".into());
    h.candidates.seed(weak);

    let qualified = qualify_candidates(
        h.candidates.as_ref(),
        h.ledger.as_ref(),
        h.opt_outs.as_ref(),
        h.orchestrator.config(),
        Some(10),
        Some(1),
    )
    .await
    .unwrap();

    assert_eq!(qualified.len(), 2);
    assert_eq!(qualified[0].candidate.id, "strong-bot");
    assert!(qualified[0].score > qualified[1].score);
}

#[tokio::test]
async fn preview_builds_messages_without_contacting_anyone() {
    let h = harness();
    h.candidates.seed(strong_github_candidate("helper-bot"));

    let messages = preview_messages(&h.orchestrator, &["helper-bot".to_string()], "summer")
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.channel, ContactChannel::RepoIssue);
    assert!(message.subject.contains("helper-bot"));
    assert!(message.body.contains(&message.invite_token));
    assert!(message.invite_url.contains("/join/inv_"));

    // A real invite was minted, but nothing was sent or recorded.
    assert_eq!(h.invites.len(), 1);
    assert_eq!(h.executor.calls.load(Ordering::SeqCst), 0);
    assert!(h.ledger.is_empty());
}

struct StubSource {
    drafts: Vec<CandidateDraft>,
}

#[async_trait]
impl CandidateSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn discover(&self, store: &dyn CandidateStore) -> Result<DiscoveryReport> {
        let mut imported = 0;
        for draft in &self.drafts {
            store.upsert(draft.clone()).await?;
            imported += 1;
        }
        Ok(DiscoveryReport {
            source: "stub".into(),
            scanned: self.drafts.len() as u64,
            imported,
        })
    }
}

#[tokio::test]
async fn dry_run_pipeline_reports_without_sending() {
    let h = harness();
    let seed = strong_github_candidate("pipeline-bot");
    let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(StubSource {
        drafts: vec![CandidateDraft {
            source_url: seed.source_url.clone(),
            name: seed.name.clone(),
            description: seed.description.clone(),
            skills: seed.skills.clone(),
            endpoint_url: None,
            website_url: None,
            source_platform: "github".into(),
            source_data: seed.source_data.clone(),
        }],
    })];

    let report = run_pipeline(
        &h.orchestrator,
        &sources,
        &PipelineOptions {
            limit: Some(10),
            dry_run: Some(true),
            campaign: Some("summer".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.qualified, 1);
    assert_eq!(report.prepared, 1);
    assert_eq!(report.sent, 0);
    assert_eq!(report.new_opt_outs, 0);
    assert_eq!(report.preview.len(), 1);
    assert_eq!(h.executor.calls.load(Ordering::SeqCst), 0);
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn live_pipeline_sends_and_breaks_down_by_channel() {
    let h = harness();
    let mut candidate = strong_github_candidate("live-bot");
    candidate.source_url = "https://hub.example.org/live-bot".into();
    candidate.endpoint_url = Some("https://hub.example.org/api".into());
    candidate.source_platform = "huggingface".into();
    h.candidates.seed(candidate);

    let sources: Vec<Box<dyn CandidateSource>> = Vec::new();
    let report = run_pipeline(
        &h.orchestrator,
        &sources,
        &PipelineOptions {
            limit: Some(10),
            dry_run: Some(false),
            campaign: Some("summer".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(report.sent, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(h.executor.calls.load(Ordering::SeqCst), 1);
    let breakdown = report.by_channel.get("well_known").unwrap();
    assert_eq!(breakdown.sent, 1);
    assert_eq!(breakdown.delivered, 1);
}
