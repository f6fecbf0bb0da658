//! Candidate qualification: score imported listings and keep the ones
//! worth contacting.

use crate::config::RecruitConfig;
use crate::error::Result;
use crate::strategy::{plan_strategies, ContactStrategy};
use crate::util::domain_opt_out_candidates;
use agentry_state::{
    AttemptLedger, AttemptStatus, Candidate, CandidateFilter, CandidateStore, OptOutRegistry,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// Statuses that make a candidate "recently contacted" for qualification.
/// Broader than the politeness set: an opted-out target is excluded too.
const RECENTLY_CONTACTED: &[AttemptStatus] = &[
    AttemptStatus::Sent,
    AttemptStatus::Delivered,
    AttemptStatus::Interested,
    AttemptStatus::Registered,
    AttemptStatus::Declined,
    AttemptStatus::OptedOut,
];

/// A candidate that passed qualification, with its score breakdown and
/// planned contact strategies.
#[derive(Debug, Clone)]
pub struct QualifiedCandidate {
    pub candidate: Candidate,
    pub score: i32,
    pub reasons: Vec<String>,
    pub strategies: Vec<ContactStrategy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub score: i32,
    pub reasons: Vec<String>,
}

fn read_stars(candidate: &Candidate) -> i64 {
    ["stargazers_count", "stars"]
        .iter()
        .find_map(|key| candidate.source_data.get(key).and_then(|v| v.as_i64()))
        .unwrap_or(0)
}

fn read_documentation_url(candidate: &Candidate) -> Option<&str> {
    ["documentation_url", "documentationUrl"]
        .iter()
        .find_map(|key| candidate.source_data.get(key).and_then(|v| v.as_str()))
        .filter(|v| !v.is_empty())
}

fn read_updated_at(candidate: &Candidate) -> Option<DateTime<Utc>> {
    let raw = ["updated_at", "updatedAt"]
        .iter()
        .find_map(|key| candidate.source_data.get(key).and_then(|v| v.as_str()))?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Score a candidate listing. Deterministic given the listing and clock.
pub fn score_candidate(candidate: &Candidate) -> CandidateScore {
    let mut score = 0;
    let mut reasons = Vec::new();

    if read_stars(candidate) > 50 {
        score += 10;
        reasons.push("GitHub stars > 50 (+10)".to_string());
    }

    if candidate.endpoint_url.is_some() {
        score += 5;
        reasons.push("Has endpoint URL (+5)".to_string());
    }

    if read_documentation_url(candidate).is_some() {
        score += 3;
        reasons.push("Has documentation URL (+3)".to_string());
    }

    let description = candidate.description.as_deref().unwrap_or("");
    if description.len() > 100 {
        score += 2;
        reasons.push("Description length > 100 (+2)".to_string());
    }

    if let Some(updated) = read_updated_at(candidate) {
        if updated > Utc::now() - Duration::days(90) {
            score += 5;
            reasons.push("Updated in last 3 months (+5)".to_string());
        }
    }

    if description.trim().len() < 10 {
        score -= 10;
        reasons.push("Low-quality description (-10)".to_string());
    }

    if candidate.skills.is_empty() {
        score -= 10;
        reasons.push("No identifiable skills (-10)".to_string());
    }

    CandidateScore { score, reasons }
}

fn contactable(candidate: &Candidate) -> bool {
    candidate.endpoint_url.is_some() || candidate.source_platform.eq_ignore_ascii_case("github")
}

/// Select up to `limit` unclaimed candidates worth contacting, best
/// score first (ties broken by most recent import).
pub async fn qualify_candidates(
    candidates: &dyn CandidateStore,
    ledger: &dyn AttemptLedger,
    opt_outs: &dyn OptOutRegistry,
    config: &RecruitConfig,
    limit: Option<usize>,
    min_score: Option<i32>,
) -> Result<Vec<QualifiedCandidate>> {
    let limit = limit.unwrap_or(50).clamp(1, 300);
    let min_score = min_score.unwrap_or(1);
    let since = Utc::now() - config.recent_contact_window;

    let pool = candidates
        .list_unclaimed(CandidateFilter {
            limit: (limit * 4).max(100),
            ..CandidateFilter::default()
        })
        .await?;

    let mut qualified = Vec::new();
    for candidate in pool {
        if !contactable(&candidate) {
            continue;
        }
        if opt_outs
            .contains_any(&domain_opt_out_candidates(&candidate.source_url))
            .await?
        {
            debug!(candidate_id = %candidate.id, "skipping opted-out candidate");
            continue;
        }
        if ledger
            .target_contacted_since(&candidate.source_url, since, RECENTLY_CONTACTED)
            .await?
        {
            continue;
        }

        let strategies = plan_strategies(&candidate);
        if strategies.is_empty() {
            continue;
        }

        let CandidateScore { score, reasons } = score_candidate(&candidate);
        if score < min_score {
            continue;
        }

        qualified.push(QualifiedCandidate {
            candidate,
            score,
            reasons,
            strategies,
        });
    }

    qualified.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.candidate.imported_at.cmp(&a.candidate.imported_at))
    });
    qualified.truncate(limit);
    Ok(qualified)
}
