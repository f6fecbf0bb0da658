//! Rate and politeness guards.
//!
//! Both checks read the attempt ledger and return `RateLimited` on
//! violation; callers treat that as an abort, not a skip.

use crate::config::RecruitConfig;
use crate::error::{RecruitError, Result};
use crate::util::domain_politeness_key;
use agentry_state::{AttemptLedger, AttemptStatus};
use chrono::{Duration, Utc};
use tracing::warn;

/// Statuses that count as "this party has already been contacted".
pub const CONTACTED_STATUSES: &[AttemptStatus] = &[
    AttemptStatus::Sent,
    AttemptStatus::Delivered,
    AttemptStatus::Interested,
    AttemptStatus::Registered,
    AttemptStatus::Declined,
];

/// Enforce the hourly and daily outbound caps.
pub async fn check_global(ledger: &dyn AttemptLedger, config: &RecruitConfig) -> Result<()> {
    let now = Utc::now();

    let hourly = ledger.count_active_since(now - Duration::hours(1)).await?;
    if hourly >= u64::from(config.max_per_hour) {
        warn!(hourly, cap = config.max_per_hour, "hourly contact cap reached");
        return Err(RecruitError::RateLimited(format!(
            "hourly contact cap reached ({hourly}/{})",
            config.max_per_hour
        )));
    }

    let daily = ledger.count_active_since(now - Duration::days(1)).await?;
    if daily >= u64::from(config.max_per_day) {
        warn!(daily, cap = config.max_per_day, "daily contact cap reached");
        return Err(RecruitError::RateLimited(format!(
            "daily contact cap reached ({daily}/{})",
            config.max_per_day
        )));
    }

    Ok(())
}

/// Enforce the per-domain cooldown: no contact with the same party
/// (politeness key over target and contact URLs) within the window.
pub async fn check_domain(
    ledger: &dyn AttemptLedger,
    config: &RecruitConfig,
    target_url: &str,
) -> Result<()> {
    let key = domain_politeness_key(target_url);
    let since = Utc::now() - config.recent_contact_window;

    let recent = ledger.contacts_since(since, CONTACTED_STATUSES).await?;
    let hit = recent.iter().any(|r| {
        domain_politeness_key(&r.target_url) == key
            || domain_politeness_key(&r.contact_url) == key
    });

    if hit {
        warn!(%key, "domain contacted within the politeness window");
        return Err(RecruitError::RateLimited(format!(
            "domain {key} was contacted within the last {} days",
            config.recent_contact_window.num_days()
        )));
    }

    Ok(())
}
