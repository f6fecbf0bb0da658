//! Opt-out handling: registry upsert plus ledger retirement.
//!
//! Recording an opt-out is a two-step write: the normalized domain
//! lands in the registry, then every live attempt touching that domain
//! is forced to OptedOut so no retry schedule survives.

use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs::emit_opt_out_recorded;
use crate::util::{domain_from_url, domain_opt_out_candidates};
use agentry_state::{AttemptLedger, OptOutRecord, OptOutRegistry};

pub const RETIRE_NOTE: &str = "Domain opted out from automated recruitment";

/// Register a do-not-contact domain and retire its open attempts.
pub async fn record_opt_out(
    registry: &dyn OptOutRegistry,
    ledger: &dyn AttemptLedger,
    url_or_domain: &str,
    reason: Option<String>,
) -> Result<OptOutRecord> {
    let domain = domain_from_url(url_or_domain);
    let record = registry.add(&domain, reason).await?;
    let retired = ledger.retire_domain(&domain, RETIRE_NOTE).await?;
    METRICS.inc_opt_outs_recorded();
    emit_opt_out_recorded(&domain, retired);
    Ok(record)
}

/// Whether a URL's domain (or its registrable parent) has opted out.
pub async fn is_domain_opted_out(
    registry: &dyn OptOutRegistry,
    url_or_domain: &str,
) -> Result<bool> {
    let candidates = domain_opt_out_candidates(url_or_domain);
    Ok(registry.contains_any(&candidates).await?)
}
