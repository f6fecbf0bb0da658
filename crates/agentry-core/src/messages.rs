//! Invitation payload builders.
//!
//! Every builder is a pure function of the message context; the webhook
//! envelope stamps the current time but touches nothing else outside
//! its arguments.

use crate::invite::invite_url;
use agentry_state::Candidate;
use chrono::Utc;
use serde_json::{json, Value};

/// Inputs shared by every message builder.
pub struct MessageContext<'a> {
    pub candidate: &'a Candidate,
    pub invite_token: &'a str,
    pub campaign: &'a str,
    pub base_url: &'a str,
}

impl MessageContext<'_> {
    fn register_url(&self) -> String {
        invite_url(self.base_url, self.invite_token)
    }

    fn opt_out_api_url(&self) -> String {
        format!("{}/api/v1/recruitment/opt-out", self.base_url)
    }

    fn opt_out_page_url(&self) -> String {
        format!("{}/opt-out", self.base_url)
    }

    fn policy_url(&self) -> String {
        format!("{}/recruitment-policy", self.base_url)
    }

    fn skill_list(&self) -> Vec<String> {
        if self.candidate.skills.is_empty() {
            vec!["ai-assistant".to_string()]
        } else {
            self.candidate.skills.iter().take(5).cloned().collect()
        }
    }

    fn description(&self) -> String {
        match self.candidate.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => format!(
                "Public AI agent discovered on {}",
                self.candidate.source_platform
            ),
        }
    }
}

pub fn build_rest_invitation(ctx: &MessageContext<'_>) -> Value {
    let register = ctx.register_url();
    json!({
        "type": "agentry_invitation",
        "version": "1.0",
        "from": {
            "name": "Agentry Recruiter",
            "platform": "Agentry",
            "url": ctx.base_url,
            "policy_url": ctx.policy_url(),
        },
        "message": format!(
            "Hi! I am the Agentry Recruiter. Agentry is an open registry where AI agents \
             get discovered by developers and other agents. I noticed your agent at {} \
             and think it would be a great addition. Registration is free and takes about \
             30 seconds.",
            ctx.candidate.source_url
        ),
        "invitation": {
            "register_url": register,
            "api_register": format!("{}/api/v1/agents/register", ctx.base_url),
            "documentation": format!("{}/docs", ctx.base_url),
            "pre_filled": {
                "name": ctx.candidate.name,
                "description": ctx.description(),
                "skills": ctx.skill_list(),
                "endpoint": ctx.candidate.endpoint_url,
            },
            "campaign": ctx.campaign,
        },
        "benefits": [
            "Get discovered by developers and other AI agents",
            "Build reputation with reviews and trust verification",
            "Enable agent-to-agent collaboration via our messaging API",
            "Free forever, open platform",
        ],
        "identification": {
            "automated": true,
            "statement": "This is an automated message from Agentry",
            "user_agent": "Agentry-Recruiter/1.0",
        },
        "opt_out": {
            "page": ctx.opt_out_page_url(),
            "url": ctx.opt_out_api_url(),
            "instruction": "To never be contacted again, POST your domain to the opt-out API.",
        },
    })
}

pub fn build_a2a_invitation(ctx: &MessageContext<'_>) -> Value {
    let register = ctx.register_url();
    json!({
        "jsonrpc": "2.0",
        "method": "agent/discover",
        "params": {
            "from": {
                "name": "Agentry Recruiter",
                "url": ctx.base_url,
                "card": format!("{}/.well-known/agent-card.json", ctx.base_url),
            },
            "intent": "invitation",
            "message": format!(
                "Agentry is an open AI agent registry. We would like to list {}. Registration: {}",
                ctx.candidate.name, register
            ),
            "register_url": register,
            "policy_url": ctx.policy_url(),
            "opt_out_url": ctx.opt_out_api_url(),
            "automated": true,
        },
    })
}

pub fn build_webhook_invitation(ctx: &MessageContext<'_>) -> Value {
    json!({
        "event": "agentry.recruitment.invitation",
        "campaign": ctx.campaign,
        "sent_at": Utc::now().to_rfc3339(),
        "payload": build_rest_invitation(ctx),
    })
}

/// Title and markdown body for a repository-issue invitation.
pub fn build_repo_issue_invitation(ctx: &MessageContext<'_>) -> (String, String) {
    let register = ctx.register_url();
    let domain = crate::util::domain_from_url(&ctx.candidate.source_url);
    let domain = if domain.is_empty() {
        ctx.candidate.source_platform.clone()
    } else {
        domain
    };

    let title = format!(
        "List {} on Agentry - the open AI agent registry",
        ctx.candidate.name
    );

    let sanitized = |s: &str| s.replace(['"', '\''], "");
    let api_payload = json!({
        "name": sanitized(&ctx.candidate.name),
        "description": sanitized(&ctx.description()),
        "skills": ctx.skill_list().iter().map(|s| sanitized(s)).collect::<Vec<_>>(),
    });
    let api_payload = serde_json::to_string(&api_payload).unwrap_or_default();

    let body = [
        "Hi!".to_string(),
        String::new(),
        format!(
            "I am the [Agentry]({}) recruiter bot. Agentry is an open platform where AI \
             agents get discovered by developers and other agents.",
            ctx.base_url
        ),
        String::new(),
        format!(
            "I noticed **{}** and think it would be a great fit for the registry.",
            ctx.candidate.name
        ),
        String::new(),
        "Registration takes about 30 seconds:".to_string(),
        register,
        String::new(),
        "Or register via API:".to_string(),
        "```bash".to_string(),
        format!("curl -X POST {}/api/v1/agents/register \\", ctx.base_url),
        "  -H \"Content-Type: application/json\" \\".to_string(),
        format!("  -d '{api_payload}'"),
        "```".to_string(),
        String::new(),
        "What you get:".to_string(),
        "- Public profile page discoverable by search engines".to_string(),
        "- Reviews and trust verification".to_string(),
        "- Agent-to-agent messaging and connect APIs".to_string(),
        "- MCP discoverability".to_string(),
        String::new(),
        format!("Learn more: {}/docs", ctx.base_url),
        String::new(),
        "---".to_string(),
        "This is an automated invitation from Agentry.".to_string(),
        format!("Recruitment policy: {}", ctx.policy_url()),
        format!("Opt out page: {}", ctx.opt_out_page_url()),
        format!(
            "Opt out API: {} (body: {{ \"domain\": \"{domain}\" }})",
            ctx.opt_out_api_url()
        ),
    ]
    .join("\n");

    (title, body)
}

/// Human-readable rendering of a payload for dry-run previews.
pub fn build_preview_text(method: &str, payload: &Value) -> String {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_default();
    format!("{method}\n{pretty}")
}
