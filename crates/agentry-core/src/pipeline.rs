//! The end-to-end recruitment pipeline: discover, qualify, preview,
//! and (when live) execute.

use crate::error::Result;
use crate::identity::ensure_recruiter;
use crate::invite::{invite_url, mint_invite_token};
use crate::messages::{build_preview_text, MessageContext};
use crate::orchestrator::{BatchOptions, BatchReport, Orchestrator, RecruitStatus};
use crate::qualify::{qualify_candidates, QualifiedCandidate};
use agentry_state::{
    CandidateFilter, CandidateStore, ContactChannel, InviteDraft, InviteStore, OptOutRegistry,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A discovery backend that imports candidate listings into the store.
///
/// Importer internals (scraping, API pagination) live behind this seam;
/// the pipeline only cares how many listings landed.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn discover(&self, store: &dyn CandidateStore) -> Result<DiscoveryReport>;
}

/// Outcome of one discovery source.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub source: String,
    pub scanned: u64,
    pub imported: u64,
}

/// Aggregate outcome of a discovery pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoverSummary {
    pub new_candidates: u64,
    pub sources: Vec<DiscoveryReport>,
}

/// One prepared (not necessarily sent) invitation.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewMessage {
    pub candidate_id: String,
    pub agent_name: String,
    pub source: String,
    pub channel: ContactChannel,
    pub contact_url: String,
    pub subject: String,
    pub body: String,
    pub invite_url: String,
    pub invite_token: String,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub limit: Option<usize>,
    pub dry_run: Option<bool>,
    pub campaign: Option<String>,
}

/// Per-channel sent/delivered counts for the pipeline report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelBreakdown {
    pub sent: u64,
    pub delivered: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub discovered: u64,
    pub qualified: usize,
    pub prepared: usize,
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    pub new_opt_outs: u64,
    pub by_channel: BTreeMap<String, ChannelBreakdown>,
    pub preview: Vec<PreviewMessage>,
}

/// Run every discovery source in turn.
pub async fn run_discover(
    sources: &[Box<dyn CandidateSource>],
    store: &dyn CandidateStore,
) -> Result<DiscoverSummary> {
    let mut summary = DiscoverSummary::default();
    for source in sources {
        let report = source.discover(store).await?;
        info!(
            source = %report.source,
            scanned = report.scanned,
            imported = report.imported,
            "discovery source finished"
        );
        summary.new_candidates += report.imported;
        summary.sources.push(report);
    }
    Ok(summary)
}

fn preview_subject(channel: ContactChannel, payload: &serde_json::Value) -> String {
    if channel == ContactChannel::RepoIssue {
        if let Some(title) = payload.get("title").and_then(|t| t.as_str()) {
            return title.to_string();
        }
    }
    format!("Agentry invitation via {channel}")
}

fn preview_body(channel: ContactChannel, payload: &serde_json::Value) -> String {
    if channel == ContactChannel::RepoIssue {
        if let Some(body) = payload.get("body").and_then(|b| b.as_str()) {
            return body.to_string();
        }
    }
    build_preview_text(channel.as_str(), payload)
}

/// Build the exact invitation each candidate would receive, minting a
/// real invite per candidate but making no executor calls and writing
/// no ledger rows.
pub async fn preview_messages(
    orchestrator: &Orchestrator,
    candidate_ids: &[String],
    campaign: &str,
) -> Result<Vec<PreviewMessage>> {
    let stores = orchestrator.stores();
    let recruiter = ensure_recruiter(stores.principals.as_ref()).await?;

    let candidates = stores
        .candidates
        .list_unclaimed(CandidateFilter {
            ids: Some(candidate_ids.to_vec()),
            limit: candidate_ids.len(),
            ..CandidateFilter::default()
        })
        .await?;

    let mut messages = Vec::new();
    for candidate in &candidates {
        let Some(strategy) = crate::strategy::plan_strategies(candidate).into_iter().next() else {
            continue;
        };

        let invite = stores
            .invites
            .create(InviteDraft {
                token: mint_invite_token(),
                campaign: campaign.to_string(),
                agent_name: Some(candidate.name.clone()),
                agent_data: Some(serde_json::json!({
                    "name": candidate.name,
                    "description": candidate.description,
                    "skills": candidate.skills,
                    "source_url": candidate.source_url,
                    "endpoint_url": candidate.endpoint_url,
                })),
                max_uses: 1,
                expires_at: None,
                created_by: recruiter.principal.id.clone(),
            })
            .await?;

        let ctx = MessageContext {
            candidate,
            invite_token: &invite.token,
            campaign,
            base_url: &orchestrator.config().base_url,
        };
        let Some(payload) = orchestrator
            .channel_registry()
            .build_payload(strategy.channel, &ctx)
        else {
            continue;
        };

        messages.push(PreviewMessage {
            candidate_id: candidate.id.clone(),
            agent_name: candidate.name.clone(),
            source: candidate.source_platform.clone(),
            channel: strategy.channel,
            contact_url: strategy.url.clone(),
            subject: preview_subject(strategy.channel, &payload),
            body: preview_body(strategy.channel, &payload),
            invite_url: invite_url(&orchestrator.config().base_url, &invite.token),
            invite_token: invite.token,
        });
    }

    Ok(messages)
}

/// Send invitations to an explicit candidate set, dry-run off.
pub async fn execute_messages(
    orchestrator: &Orchestrator,
    candidate_ids: &[String],
    campaign: &str,
) -> Result<BatchReport> {
    orchestrator
        .recruit_batch(&BatchOptions {
            limit: Some(candidate_ids.len().max(1)),
            campaign: Some(campaign.to_string()),
            dry_run: Some(false),
            candidate_ids: Some(candidate_ids.to_vec()),
            ..BatchOptions::default()
        })
        .await
}

/// Full pipeline: discover, qualify, preview, and (live only) execute.
pub async fn run_pipeline(
    orchestrator: &Orchestrator,
    sources: &[Box<dyn CandidateSource>],
    opts: &PipelineOptions,
) -> Result<PipelineReport> {
    let campaign = opts.campaign.clone().unwrap_or_else(|| "auto".to_string());
    let dry_run = opts.dry_run.unwrap_or(true);
    let limit = opts.limit.unwrap_or(20).clamp(1, 100);
    let stores = orchestrator.stores();

    ensure_recruiter(stores.principals.as_ref()).await?;
    let opt_outs_before = stores.opt_outs.count().await?;

    let discovery = run_discover(sources, stores.candidates.as_ref()).await?;

    let qualified: Vec<QualifiedCandidate> = qualify_candidates(
        stores.candidates.as_ref(),
        stores.ledger.as_ref(),
        stores.opt_outs.as_ref(),
        orchestrator.config(),
        Some(limit),
        Some(1),
    )
    .await?;

    let qualified_ids: Vec<String> = qualified.iter().map(|q| q.candidate.id.clone()).collect();
    let preview = preview_messages(orchestrator, &qualified_ids, &campaign).await?;

    if dry_run {
        let opt_outs_after = stores.opt_outs.count().await?;
        return Ok(PipelineReport {
            discovered: discovery.new_candidates,
            qualified: qualified.len(),
            prepared: preview.len(),
            new_opt_outs: opt_outs_after.saturating_sub(opt_outs_before),
            preview,
            ..PipelineReport::default()
        });
    }

    let target_ids: Vec<String> = preview.iter().map(|m| m.candidate_id.clone()).collect();
    let execution = execute_messages(orchestrator, &target_ids, &campaign).await?;

    let mut by_channel: BTreeMap<String, ChannelBreakdown> = BTreeMap::new();
    for result in &execution.results {
        let Some(channel) = result.channel else {
            continue;
        };
        let entry = by_channel.entry(channel.to_string()).or_default();
        if result.status != RecruitStatus::Skipped {
            entry.sent += 1;
        }
        if matches!(
            result.status,
            RecruitStatus::Delivered | RecruitStatus::Interested | RecruitStatus::Registered
        ) {
            entry.delivered += 1;
        }
    }

    let opt_outs_after = stores.opt_outs.count().await?;

    Ok(PipelineReport {
        discovered: discovery.new_candidates,
        qualified: qualified.len(),
        prepared: preview.len(),
        sent: execution.sent,
        delivered: execution.delivered,
        failed: execution.failed,
        new_opt_outs: opt_outs_after.saturating_sub(opt_outs_before),
        by_channel,
        preview,
    })
}
