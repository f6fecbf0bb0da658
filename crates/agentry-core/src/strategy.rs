//! Contact strategy selection.
//!
//! Pure and deterministic: given a candidate, produce the ordered list
//! of channel/URL pairs worth trying. No I/O happens here.

use crate::util::url_origin;
use agentry_state::{Candidate, ContactChannel};

/// One way to reach a candidate, in priority order (lower tries first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactStrategy {
    pub channel: ContactChannel,
    pub url: String,
    pub priority: u8,
    pub description: String,
}

fn protocol_hints(candidate: &Candidate) -> Vec<String> {
    let mut hints = Vec::new();
    if let Some(endpoint) = &candidate.endpoint_url {
        hints.push(endpoint.to_lowercase());
    }
    if let Some(protocols) = candidate.source_data.get("protocols") {
        match protocols {
            serde_json::Value::Array(items) => {
                hints.extend(items.iter().filter_map(|v| v.as_str()).map(str::to_lowercase));
            }
            serde_json::Value::String(s) => hints.push(s.to_lowercase()),
            _ => {}
        }
    }
    hints
}

fn hinted(candidate: &Candidate, needle: &str) -> bool {
    protocol_hints(candidate).iter().any(|h| h.contains(needle))
}

/// Plan contact strategies for a candidate, deduplicated by
/// (channel, url) and sorted by ascending priority.
pub fn plan_strategies(candidate: &Candidate) -> Vec<ContactStrategy> {
    let mut strategies = Vec::new();

    if let Some(endpoint) = candidate.endpoint_url.as_deref() {
        if let Some(origin) = url_origin(endpoint) {
            strategies.push(ContactStrategy {
                channel: ContactChannel::WellKnown,
                url: format!("{origin}/.well-known/agent-card.json"),
                priority: 1,
                description: "agent card on the declared endpoint's origin".into(),
            });
        }
        strategies.push(ContactStrategy {
            channel: ContactChannel::Rest,
            url: endpoint.to_string(),
            priority: 2,
            description: "direct POST to the declared endpoint".into(),
        });
        if hinted(candidate, "a2a") {
            strategies.push(ContactStrategy {
                channel: ContactChannel::A2a,
                url: endpoint.to_string(),
                priority: 3,
                description: "A2A message/send to the declared endpoint".into(),
            });
        }
        if hinted(candidate, "mcp") {
            strategies.push(ContactStrategy {
                channel: ContactChannel::Mcp,
                url: endpoint.to_string(),
                priority: 4,
                description: "MCP tool call on the declared endpoint".into(),
            });
        }
    }

    if candidate.source_platform.eq_ignore_ascii_case("github") {
        strategies.push(ContactStrategy {
            channel: ContactChannel::RepoIssue,
            url: candidate.source_url.clone(),
            priority: 5,
            description: "invitation issue on the source repository".into(),
        });
    }

    if let Some(website) = candidate.website_url.as_deref() {
        if let Some(origin) = url_origin(website) {
            strategies.push(ContactStrategy {
                channel: ContactChannel::WellKnown,
                url: format!("{origin}/.well-known/agent-card.json"),
                priority: 6,
                description: "agent card on the project website".into(),
            });
        }
    }

    if let Some(endpoint) = candidate.endpoint_url.as_deref() {
        strategies.push(ContactStrategy {
            channel: ContactChannel::Webhook,
            url: endpoint.to_string(),
            priority: 7,
            description: "webhook-style event delivery fallback".into(),
        });
    }

    // Dropped entries: unparsable URLs never made it in above; dedup by
    // (channel, lowercased url) keeping the highest-priority occurrence.
    strategies.sort_by_key(|s| s.priority);
    let mut seen: Vec<(ContactChannel, String)> = Vec::new();
    strategies.retain(|s| {
        let key = (s.channel, s.url.to_lowercase());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    strategies
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_state::{Candidate, CandidateStatus};
    use chrono::Utc;
    use serde_json::json;

    fn candidate(endpoint: Option<&str>, platform: &str, extra: serde_json::Value) -> Candidate {
        Candidate {
            id: "cand-1".into(),
            source_url: "https://github.com/acme/helper-bot".into(),
            name: "helper-bot".into(),
            description: Some("A helpful agent".into()),
            skills: vec!["chat".into()],
            endpoint_url: endpoint.map(str::to_string),
            website_url: None,
            source_platform: platform.into(),
            source_data: extra,
            status: CandidateStatus::Unclaimed,
            imported_at: Utc::now(),
        }
    }

    #[test]
    fn endpoint_candidate_gets_wellknown_then_rest() {
        let c = candidate(Some("https://bot.example.com/api/messages"), "huggingface", json!({}));
        let plan = plan_strategies(&c);
        assert_eq!(plan[0].channel, ContactChannel::WellKnown);
        assert_eq!(plan[0].url, "https://bot.example.com/.well-known/agent-card.json");
        assert_eq!(plan[1].channel, ContactChannel::Rest);
        assert_eq!(plan.last().map(|s| s.channel), Some(ContactChannel::Webhook));
    }

    #[test]
    fn a2a_and_mcp_require_hints() {
        let plain = candidate(Some("https://bot.example.com/api"), "huggingface", json!({}));
        assert!(!plan_strategies(&plain).iter().any(|s| s.channel == ContactChannel::A2a));

        let hinted = candidate(
            Some("https://bot.example.com/a2a"),
            "huggingface",
            json!({"protocols": ["mcp"]}),
        );
        let plan = plan_strategies(&hinted);
        assert!(plan.iter().any(|s| s.channel == ContactChannel::A2a));
        assert!(plan.iter().any(|s| s.channel == ContactChannel::Mcp));
    }

    #[test]
    fn github_candidate_without_endpoint_gets_repo_issue_only() {
        let c = candidate(None, "github", json!({}));
        let plan = plan_strategies(&c);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].channel, ContactChannel::RepoIssue);
        assert_eq!(plan[0].url, "https://github.com/acme/helper-bot");
    }

    #[test]
    fn duplicate_channel_url_pairs_collapse() {
        let mut c = candidate(Some("https://bot.example.com/api"), "huggingface", json!({}));
        c.website_url = Some("https://BOT.example.com/home".into());
        let plan = plan_strategies(&c);
        let wellknown: Vec<_> = plan
            .iter()
            .filter(|s| s.channel == ContactChannel::WellKnown)
            .collect();
        assert_eq!(wellknown.len(), 1);
        assert_eq!(wellknown[0].priority, 1);
    }

    #[test]
    fn no_reachable_surface_means_empty_plan() {
        let c = candidate(None, "huggingface", json!({}));
        assert!(plan_strategies(&c).is_empty());
    }
}
