//! Recruitment configuration
//!
//! All tunables live in one explicit struct injected into the orchestrator
//! at construction. `from_env` is the only place environment variables are
//! read; nothing else in the crate touches process globals.

use std::time::Duration;

/// Configuration for the recruitment orchestrator.
#[derive(Debug, Clone)]
pub struct RecruitConfig {
    /// Global kill switch. Live sends are refused while false.
    pub enabled: bool,
    /// Default for batch calls that do not specify dry-run explicitly.
    pub default_dry_run: bool,
    /// Public base URL of the registry, used in invitation payloads
    /// (`<base>/join/<token>`, opt-out and policy links).
    pub base_url: String,
    /// Hourly ceiling on non-pending attempts.
    pub max_per_hour: u32,
    /// Daily ceiling on non-pending attempts.
    pub max_per_day: u32,
    /// Window during which a Sent/Delivered pair is not re-contacted,
    /// and during which one domain receives at most one live contact.
    pub recent_contact_window: chrono::Duration,
    /// Delay before a failed attempt becomes retry-eligible.
    pub retry_delay: chrono::Duration,
    /// Retry ceiling for failed attempts.
    pub max_retry_attempts: u32,
    /// Pause between live contacts within one batch.
    pub contact_delay: Duration,
    /// Timeout for invitation POSTs.
    pub request_timeout: Duration,
    /// Timeout for discovery probes (agent cards, tool listings).
    pub probe_timeout: Duration,
    /// Token for the issue-tracker channel. Absent means that channel
    /// fails fast without network calls.
    pub github_token: Option<String>,
}

impl Default for RecruitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_dry_run: true,
            base_url: "https://agentry.dev".to_string(),
            max_per_hour: 100,
            max_per_day: 500,
            recent_contact_window: chrono::Duration::days(7),
            retry_delay: chrono::Duration::hours(24),
            max_retry_attempts: 3,
            contact_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(10),
            github_token: None,
        }
    }
}

fn env_flag(name: &str, fallback: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => raw.trim().eq_ignore_ascii_case("true"),
        Err(_) => fallback,
    }
}

fn env_u32(name: &str, fallback: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

impl RecruitConfig {
    /// Build a configuration from `AGENTRY_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("AGENTRY_RECRUITMENT_ENABLED", defaults.enabled),
            default_dry_run: env_flag("AGENTRY_RECRUITMENT_DRY_RUN", defaults.default_dry_run),
            base_url: std::env::var("AGENTRY_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            max_per_hour: env_u32("AGENTRY_MAX_PER_HOUR", defaults.max_per_hour),
            max_per_day: env_u32("AGENTRY_MAX_PER_DAY", defaults.max_per_day),
            github_token: std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_closed() {
        let config = RecruitConfig::default();
        assert!(!config.enabled);
        assert!(config.default_dry_run);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.recent_contact_window, chrono::Duration::days(7));
    }
}
