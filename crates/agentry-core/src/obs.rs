//! Structured observability hooks for recruitment lifecycle events.
//!
//! Emission functions for the key moments: a candidate entering the
//! flow, an invitation going out, a response classification, an opt-out
//! landing, a batch finishing. Events are emitted at `info!` level.

use tracing::{info, warn};

/// RAII guard that enters a campaign-scoped tracing span.
pub struct CampaignSpan {
    _span: tracing::span::EnteredSpan,
}

impl CampaignSpan {
    /// Create and enter a span tagged with the campaign name.
    pub fn enter(campaign: &str) -> Self {
        let span = tracing::info_span!("agentry.recruit", campaign = %campaign);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: recruitment of one candidate started.
pub fn emit_recruit_started(candidate_id: &str, target_url: &str, dry_run: bool) {
    info!(
        event = "recruit.started",
        candidate_id = %candidate_id,
        target_url = %target_url,
        dry_run = dry_run,
    );
}

/// Emit event: an invitation went out over a channel.
pub fn emit_contact_sent(candidate_id: &str, channel: &str, contact_url: &str, attempt_number: u32) {
    info!(
        event = "contact.sent",
        candidate_id = %candidate_id,
        channel = %channel,
        contact_url = %contact_url,
        attempt_number = attempt_number,
    );
}

/// Emit event: a contact response was classified.
pub fn emit_contact_classified(candidate_id: &str, channel: &str, status: &str, http_status: Option<u16>) {
    info!(
        event = "contact.classified",
        candidate_id = %candidate_id,
        channel = %channel,
        status = %status,
        http_status = http_status,
    );
}

/// Emit event: a domain opted out (warning level — operators care).
pub fn emit_opt_out_recorded(domain: &str, retired_attempts: u64) {
    warn!(
        event = "optout.recorded",
        domain = %domain,
        retired_attempts = retired_attempts,
    );
}

/// Emit event: a batch finished with aggregate counts.
pub fn emit_batch_finished(total: usize, sent: u64, failed: u64, skipped: u64) {
    info!(
        event = "batch.finished",
        total = total,
        sent = sent,
        failed = failed,
        skipped = skipped,
    );
}
