//! Recruitment orchestrator: walks a candidate's contact strategies,
//! enforces politeness, sends invitations, and records outcomes.

use crate::classify::{analyze_response, contact_status};
use crate::config::RecruitConfig;
use crate::error::{RecruitError, Result};
use crate::executors::ChannelRegistry;
use crate::guard::{check_domain, check_global};
use crate::identity::ensure_recruiter;
use crate::invite::{invite_url, mint_invite_token};
use crate::messages::MessageContext;
use crate::metrics::METRICS;
use crate::obs::{
    emit_batch_finished, emit_contact_classified, emit_contact_sent, emit_recruit_started,
    CampaignSpan,
};
use crate::optout::{is_domain_opted_out, record_opt_out};
use crate::strategy::{plan_strategies, ContactStrategy};
use agentry_state::{
    AttemptDraft, AttemptLedger, AttemptRecord, AttemptStatus, Candidate, CandidateFilter,
    CandidateStatus, CandidateStore, ContactChannel, InviteDraft, InviteStore, LedgerStats,
    OptOutRegistry, PrincipalRegistry, StorageError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Final disposition of one candidate's recruitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecruitStatus {
    Skipped,
    Sent,
    Delivered,
    Interested,
    Registered,
    Declined,
    Failed,
    OptedOut,
}

impl From<AttemptStatus> for RecruitStatus {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::Pending | AttemptStatus::Sent => RecruitStatus::Sent,
            AttemptStatus::Delivered => RecruitStatus::Delivered,
            AttemptStatus::Interested => RecruitStatus::Interested,
            AttemptStatus::Registered => RecruitStatus::Registered,
            AttemptStatus::Declined => RecruitStatus::Declined,
            AttemptStatus::Failed => RecruitStatus::Failed,
            AttemptStatus::OptedOut => RecruitStatus::OptedOut,
        }
    }
}

/// Per-candidate result of a recruitment attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RecruitOutcome {
    pub candidate_id: String,
    pub target_name: String,
    pub target_url: String,
    pub status: RecruitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ContactChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
}

impl RecruitOutcome {
    fn skipped(candidate: &Candidate, reason: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            target_name: candidate.name.clone(),
            target_url: candidate.source_url.clone(),
            status: RecruitStatus::Skipped,
            reason: Some(reason.into()),
            channel: None,
            contact_url: None,
            invite_url: None,
            attempt_number: None,
        }
    }
}

/// Options for recruiting a single candidate.
#[derive(Debug, Clone, Default)]
pub struct RecruitOptions {
    pub campaign: Option<String>,
    pub dry_run: Option<bool>,
    /// Restrict the strategy walk to these channels.
    pub channels: Option<Vec<ContactChannel>>,
}

/// Options for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub limit: Option<usize>,
    pub campaign: Option<String>,
    pub dry_run: Option<bool>,
    pub source: Option<String>,
    pub candidate_ids: Option<Vec<String>>,
    pub channels: Option<Vec<ContactChannel>>,
}

/// Aggregate counts for a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub sent: u64,
    pub delivered: u64,
    pub interested: u64,
    pub failed: u64,
    pub skipped: u64,
    pub opted_out: u64,
    pub results: Vec<RecruitOutcome>,
}

/// Funnel counts for the status report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Funnel {
    pub contacted: u64,
    pub delivered: u64,
    pub interested: u64,
    pub registered: u64,
}

/// Operator-facing snapshot of recruitment state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub total_attempts: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_channel: BTreeMap<String, u64>,
    pub by_campaign: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    pub funnel: Funnel,
    pub recent: Vec<AttemptRecord>,
    pub opt_out_count: u64,
}

/// All storage handles the orchestrator needs.
#[derive(Clone)]
pub struct Stores {
    pub candidates: Arc<dyn CandidateStore>,
    pub ledger: Arc<dyn AttemptLedger>,
    pub opt_outs: Arc<dyn OptOutRegistry>,
    pub invites: Arc<dyn InviteStore>,
    pub principals: Arc<dyn PrincipalRegistry>,
}

pub struct Orchestrator {
    config: RecruitConfig,
    stores: Stores,
    registry: ChannelRegistry,
}

impl Orchestrator {
    pub fn new(config: RecruitConfig, stores: Stores, registry: ChannelRegistry) -> Self {
        Self {
            config,
            stores,
            registry,
        }
    }

    /// Registry wired to real network executors.
    pub fn live(config: RecruitConfig, stores: Stores) -> Self {
        let registry = ChannelRegistry::live(&config);
        Self::new(config, stores, registry)
    }

    pub fn config(&self) -> &RecruitConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn channel_registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Recruit a single candidate, walking its strategies in priority
    /// order until an invitation goes out.
    pub async fn recruit_candidate(
        &self,
        candidate_id: &str,
        opts: &RecruitOptions,
    ) -> Result<RecruitOutcome> {
        let candidate = match self.stores.candidates.get(candidate_id).await {
            Ok(c) => c,
            Err(StorageError::CandidateNotFound { id }) => {
                return Err(RecruitError::NotFound(id))
            }
            Err(e) => return Err(e.into()),
        };

        let campaign = opts.campaign.clone().unwrap_or_else(|| "auto".to_string());
        let dry_run = opts.dry_run.unwrap_or(self.config.default_dry_run);
        let _span = CampaignSpan::enter(&campaign);
        emit_recruit_started(&candidate.id, &candidate.source_url, dry_run);

        if candidate.status != CandidateStatus::Unclaimed {
            return Ok(RecruitOutcome::skipped(
                &candidate,
                "Candidate is no longer unclaimed",
            ));
        }

        if is_domain_opted_out(self.stores.opt_outs.as_ref(), &candidate.source_url).await? {
            return Ok(RecruitOutcome {
                status: RecruitStatus::OptedOut,
                reason: Some("Domain opted out from recruitment".into()),
                ..RecruitOutcome::skipped(&candidate, "")
            });
        }

        let strategies: Vec<ContactStrategy> = plan_strategies(&candidate)
            .into_iter()
            .filter(|s| {
                opts.channels
                    .as_ref()
                    .map(|allowed| allowed.contains(&s.channel))
                    .unwrap_or(true)
            })
            .collect();

        if strategies.is_empty() {
            return Ok(RecruitOutcome::skipped(
                &candidate,
                "No compatible contact strategy was found",
            ));
        }

        if !dry_run && !self.config.enabled {
            return Ok(RecruitOutcome::skipped(
                &candidate,
                "Recruitment is disabled (AGENTRY_RECRUITMENT_ENABLED=false)",
            ));
        }

        let recruiter = ensure_recruiter(self.stores.principals.as_ref()).await?;

        if !dry_run {
            if let Err(e) = check_global(self.stores.ledger.as_ref(), &self.config).await {
                METRICS.inc_rate_limit_hits();
                return Err(e);
            }
            if let Err(e) = check_domain(
                self.stores.ledger.as_ref(),
                &self.config,
                &candidate.source_url,
            )
            .await
            {
                METRICS.inc_rate_limit_hits();
                return Err(e);
            }
        }

        for strategy in &strategies {
            let existing = self
                .stores
                .ledger
                .find(&candidate.source_url, strategy.channel)
                .await?;
            if let Some(reason) = skip_reason(existing.as_ref(), &self.config) {
                debug!(
                    candidate_id = %candidate.id,
                    channel = %strategy.channel,
                    reason,
                    "skipping channel"
                );
                continue;
            }

            let invite = self
                .stores
                .invites
                .create(InviteDraft {
                    token: mint_invite_token(),
                    campaign: campaign.clone(),
                    agent_name: Some(candidate.name.clone()),
                    agent_data: Some(json!({
                        "name": candidate.name,
                        "description": candidate.description,
                        "skills": candidate.skills,
                        "endpoint_url": candidate.endpoint_url,
                        "website_url": candidate.website_url,
                        "source_url": candidate.source_url,
                    })),
                    max_uses: 1,
                    expires_at: None,
                    created_by: recruiter.principal.id.clone(),
                })
                .await?;
            let join_url = invite_url(&self.config.base_url, &invite.token);

            if dry_run {
                return Ok(RecruitOutcome {
                    status: RecruitStatus::Skipped,
                    reason: Some("Dry-run mode; no invitation sent".into()),
                    channel: Some(strategy.channel),
                    contact_url: Some(strategy.url.clone()),
                    invite_url: Some(join_url),
                    ..RecruitOutcome::skipped(&candidate, "")
                });
            }

            let ctx = MessageContext {
                candidate: &candidate,
                invite_token: &invite.token,
                campaign: &campaign,
                base_url: &self.config.base_url,
            };
            let Some(payload) = self.registry.build_payload(strategy.channel, &ctx) else {
                continue;
            };
            let Some(executor) = self.registry.executor(strategy.channel) else {
                continue;
            };

            METRICS.inc_contacts_attempted();
            let outcome = executor.contact(&strategy.url, &payload).await;

            let analysis = analyze_response(outcome.status, outcome.response.as_ref());
            let status = contact_status(outcome.success, outcome.status, &analysis);

            let next_number = existing.map(|e| e.attempt_number + 1).unwrap_or(1);
            let next_retry_at = if status == AttemptStatus::Failed
                && next_number < self.config.max_retry_attempts
            {
                Some(Utc::now() + self.config.retry_delay)
            } else {
                None
            };

            let attempt = self
                .stores
                .ledger
                .upsert(AttemptDraft {
                    candidate_id: candidate.id.clone(),
                    target_name: candidate.name.clone(),
                    target_url: candidate.source_url.clone(),
                    contact_url: strategy.url.clone(),
                    channel: strategy.channel,
                    status,
                    request_payload: payload,
                    response_payload: outcome.response.clone(),
                    response_status: outcome.status,
                    error: outcome.error.clone().or(outcome.note.clone()),
                    next_retry_at,
                    campaign: campaign.clone(),
                    invite_token: Some(invite.token.clone()),
                })
                .await?;

            emit_contact_classified(
                &candidate.id,
                strategy.channel.as_str(),
                attempt.status.as_str(),
                outcome.status,
            );

            if attempt.status == AttemptStatus::OptedOut {
                record_opt_out(
                    self.stores.opt_outs.as_ref(),
                    self.stores.ledger.as_ref(),
                    &candidate.source_url,
                    Some(
                        outcome
                            .error
                            .unwrap_or_else(|| "Opt-out signal detected from response".into()),
                    ),
                )
                .await?;
            }

            if outcome.success && outcome.sent {
                METRICS.inc_invitations_sent();
                emit_contact_sent(
                    &candidate.id,
                    strategy.channel.as_str(),
                    &strategy.url,
                    attempt.attempt_number,
                );
                return Ok(RecruitOutcome {
                    candidate_id: candidate.id.clone(),
                    target_name: candidate.name.clone(),
                    target_url: candidate.source_url.clone(),
                    status: attempt.status.into(),
                    reason: None,
                    channel: Some(strategy.channel),
                    contact_url: Some(strategy.url.clone()),
                    invite_url: Some(join_url),
                    attempt_number: Some(attempt.attempt_number),
                });
            }
        }

        Ok(RecruitOutcome {
            status: RecruitStatus::Failed,
            reason: Some("All recruitment strategies failed".into()),
            ..RecruitOutcome::skipped(&candidate, "")
        })
    }

    /// Recruit a batch of unclaimed candidates, newest-imported first.
    ///
    /// Live batches fail fast when recruitment is disabled, and a
    /// rate-limit violation aborts the remainder of the batch.
    pub async fn recruit_batch(&self, opts: &BatchOptions) -> Result<BatchReport> {
        let limit = opts.limit.unwrap_or(50).clamp(1, 200);
        let dry_run = opts.dry_run.unwrap_or(self.config.default_dry_run);

        if !dry_run && !self.config.enabled {
            return Err(RecruitError::Disabled);
        }

        let candidates = self
            .stores
            .candidates
            .list_unclaimed(CandidateFilter {
                source_platform: opts.source.clone(),
                ids: opts.candidate_ids.clone(),
                limit,
            })
            .await?;

        let per_candidate = RecruitOptions {
            campaign: opts.campaign.clone(),
            dry_run: Some(dry_run),
            channels: opts.channels.clone(),
        };

        let mut report = BatchReport {
            total: candidates.len(),
            ..BatchReport::default()
        };

        for candidate in &candidates {
            let outcome = self.recruit_candidate(&candidate.id, &per_candidate).await?;

            match outcome.status {
                RecruitStatus::Skipped => report.skipped += 1,
                RecruitStatus::Failed => report.failed += 1,
                RecruitStatus::OptedOut => report.opted_out += 1,
                other => {
                    report.sent += 1;
                    if matches!(other, RecruitStatus::Delivered | RecruitStatus::Registered) {
                        report.delivered += 1;
                    }
                    if matches!(other, RecruitStatus::Interested | RecruitStatus::Registered) {
                        report.interested += 1;
                    }
                }
            }
            report.results.push(outcome);

            if !dry_run {
                tokio::time::sleep(self.config.contact_delay).await;
            }
        }

        emit_batch_finished(report.total, report.sent, report.failed, report.skipped);
        METRICS.flush();
        Ok(report)
    }

    /// Operator status snapshot: ledger aggregates, funnel, recent
    /// attempts, and the by-source breakdown joined against candidates.
    pub async fn status(&self) -> Result<StatusReport> {
        let LedgerStats {
            total,
            by_status,
            by_channel,
            by_campaign,
        } = self.stores.ledger.stats().await?;
        let recent = self.stores.ledger.recent(100).await?;
        let opt_out_count = self.stores.opt_outs.count().await?;

        let mut by_source: BTreeMap<String, u64> = BTreeMap::new();
        for attempt in &recent {
            let source = match self.stores.candidates.get(&attempt.candidate_id).await {
                Ok(c) => c.source_platform,
                Err(StorageError::CandidateNotFound { .. }) => "unknown".to_string(),
                Err(e) => return Err(e.into()),
            };
            *by_source.entry(source).or_default() += 1;
        }

        let count = |status: AttemptStatus| by_status.get(status.as_str()).copied().unwrap_or(0);
        let funnel = Funnel {
            contacted: total,
            delivered: count(AttemptStatus::Delivered)
                + count(AttemptStatus::Interested)
                + count(AttemptStatus::Registered),
            interested: count(AttemptStatus::Interested) + count(AttemptStatus::Registered),
            registered: count(AttemptStatus::Registered),
        };

        Ok(StatusReport {
            total_attempts: total,
            by_status,
            by_channel,
            by_campaign,
            by_source,
            funnel,
            recent,
            opt_out_count,
        })
    }
}

/// Whether an existing ledger row makes a channel ineligible right now.
fn skip_reason(existing: Option<&AttemptRecord>, config: &RecruitConfig) -> Option<&'static str> {
    let existing = existing?;

    if existing.status.is_terminal() {
        return Some("Target already completed a terminal recruitment outcome");
    }

    let recent_cutoff: DateTime<Utc> = Utc::now() - config.recent_contact_window;
    if matches!(
        existing.status,
        AttemptStatus::Sent | AttemptStatus::Delivered
    ) && existing.updated_at > recent_cutoff
    {
        return Some("Target was contacted recently");
    }

    if existing.status == AttemptStatus::Failed
        && existing.attempt_number >= config.max_retry_attempts
    {
        return Some("Maximum retry attempts reached");
    }

    if let Some(next_retry) = existing.next_retry_at {
        if next_retry > Utc::now() {
            return Some("Retry is scheduled for later");
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(status: AttemptStatus, attempt_number: u32, updated_ago_days: i64) -> AttemptRecord {
        let at = Utc::now() - Duration::days(updated_ago_days);
        AttemptRecord {
            id: "att-1".into(),
            candidate_id: "cand-1".into(),
            target_name: "bot".into(),
            target_url: "https://example.com/bot".into(),
            contact_url: "https://example.com/bot".into(),
            channel: ContactChannel::Rest,
            attempt_number,
            status,
            request_payload: json!({}),
            response_payload: None,
            response_status: None,
            error: None,
            next_retry_at: None,
            campaign: "auto".into(),
            invite_token: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn terminal_statuses_always_skip() {
        let config = RecruitConfig::default();
        for status in [
            AttemptStatus::Declined,
            AttemptStatus::OptedOut,
            AttemptStatus::Registered,
            AttemptStatus::Interested,
        ] {
            assert!(skip_reason(Some(&record(status, 1, 30)), &config).is_some());
        }
    }

    #[test]
    fn recent_sent_skips_but_stale_sent_does_not() {
        let config = RecruitConfig::default();
        assert!(skip_reason(Some(&record(AttemptStatus::Sent, 1, 2)), &config).is_some());
        assert!(skip_reason(Some(&record(AttemptStatus::Sent, 1, 9)), &config).is_none());
    }

    #[test]
    fn failed_skips_only_at_retry_ceiling() {
        let config = RecruitConfig::default();
        assert!(skip_reason(Some(&record(AttemptStatus::Failed, 3, 2)), &config).is_some());
        assert!(skip_reason(Some(&record(AttemptStatus::Failed, 2, 2)), &config).is_none());
    }

    #[test]
    fn future_retry_schedule_skips() {
        let config = RecruitConfig::default();
        let mut rec = record(AttemptStatus::Failed, 1, 2);
        rec.next_retry_at = Some(Utc::now() + Duration::hours(12));
        assert!(skip_reason(Some(&rec), &config).is_some());

        rec.next_retry_at = Some(Utc::now() - Duration::hours(1));
        assert!(skip_reason(Some(&rec), &config).is_none());
    }

    #[test]
    fn no_history_never_skips() {
        assert!(skip_reason(None, &RecruitConfig::default()).is_none());
    }
}
