//! Global atomic counters for recruitment observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    contacts_attempted: AtomicU64,
    invitations_sent: AtomicU64,
    opt_outs_recorded: AtomicU64,
    rate_limit_hits: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            contacts_attempted: AtomicU64::new(0),
            invitations_sent: AtomicU64::new(0),
            opt_outs_recorded: AtomicU64::new(0),
            rate_limit_hits: AtomicU64::new(0),
        }
    }

    /// Increment the contacts-attempted counter by one.
    pub fn inc_contacts_attempted(&self) {
        self.contacts_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the invitations-sent counter by one.
    pub fn inc_invitations_sent(&self) {
        self.invitations_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the opt-outs-recorded counter by one.
    pub fn inc_opt_outs_recorded(&self) {
        self.opt_outs_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the rate-limit-hits counter by one.
    pub fn inc_rate_limit_hits(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a batch, pipeline run)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            contacts_attempted = self.contacts_attempted(),
            invitations_sent = self.invitations_sent(),
            opt_outs_recorded = self.opt_outs_recorded(),
            rate_limit_hits = self.rate_limit_hits(),
        );
    }

    pub fn contacts_attempted(&self) -> u64 {
        self.contacts_attempted.load(Ordering::Relaxed)
    }

    pub fn invitations_sent(&self) -> u64 {
        self.invitations_sent.load(Ordering::Relaxed)
    }

    pub fn opt_outs_recorded(&self) -> u64 {
        self.opt_outs_recorded.load(Ordering::Relaxed)
    }

    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.contacts_attempted.store(0, Ordering::Relaxed);
        self.invitations_sent.store(0, Ordering::Relaxed);
        self.opt_outs_recorded.store(0, Ordering::Relaxed);
        self.rate_limit_hits.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.contacts_attempted(), 0);
        m.inc_contacts_attempted();
        m.inc_contacts_attempted();
        assert_eq!(m.contacts_attempted(), 2);

        m.inc_invitations_sent();
        assert_eq!(m.invitations_sent(), 1);

        m.inc_opt_outs_recorded();
        m.inc_rate_limit_hits();
        assert_eq!(m.opt_outs_recorded(), 1);
        assert_eq!(m.rate_limit_hits(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_contacts_attempted();
        m.inc_invitations_sent();
        m.reset();
        assert_eq!(m.contacts_attempted(), 0);
        assert_eq!(m.invitations_sent(), 0);
    }
}
