//! Protocol executors: one per contact channel, behind a shared trait.
//!
//! Dispatch is table-driven. Adding a channel means adding a
//! `ContactChannel` variant, a payload builder, and one registry entry.

mod a2a;
mod mcp;
mod repo_issue;
mod rest;
mod webhook;
mod wellknown;

pub use a2a::A2aExecutor;
pub use mcp::McpExecutor;
pub use repo_issue::RepoIssueExecutor;
pub use rest::RestExecutor;
pub use webhook::WebhookExecutor;
pub use wellknown::WellKnownExecutor;

use crate::config::RecruitConfig;
use crate::messages::{
    build_a2a_invitation, build_repo_issue_invitation, build_rest_invitation,
    build_webhook_invitation, MessageContext,
};
use agentry_state::ContactChannel;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const USER_AGENT: &str = "Agentry-Recruiter/1.0";

/// Uniform result of a single contact attempt over any channel.
#[derive(Debug, Clone, Default)]
pub struct ContactOutcome {
    /// Transport-level success (a response came back without error).
    pub success: bool,
    /// Whether an invitation actually went out. A fetched agent card
    /// with no contact endpoint is success without sent.
    pub sent: bool,
    pub status: Option<u16>,
    pub response: Option<Value>,
    pub error: Option<String>,
    pub note: Option<String>,
}

impl ContactOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A channel-specific way of delivering an invitation payload.
#[async_trait]
pub trait ContactExecutor: Send + Sync {
    async fn contact(&self, target_url: &str, payload: &Value) -> ContactOutcome;
}

/// Pure function producing the wire payload for a channel.
pub type PayloadBuilder = fn(&MessageContext<'_>) -> Value;

fn rest_payload(ctx: &MessageContext<'_>) -> Value {
    build_rest_invitation(ctx)
}

fn a2a_payload(ctx: &MessageContext<'_>) -> Value {
    build_a2a_invitation(ctx)
}

fn webhook_payload(ctx: &MessageContext<'_>) -> Value {
    build_webhook_invitation(ctx)
}

fn repo_issue_payload(ctx: &MessageContext<'_>) -> Value {
    let (title, body) = build_repo_issue_invitation(ctx);
    json!({ "title": title, "body": body })
}

struct ChannelEntry {
    builder: PayloadBuilder,
    executor: Arc<dyn ContactExecutor>,
}

/// Maps each contact channel to its payload builder and executor.
pub struct ChannelRegistry {
    entries: HashMap<ContactChannel, ChannelEntry>,
}

impl ChannelRegistry {
    /// Registry wired to real network executors.
    pub fn live(config: &RecruitConfig) -> Self {
        let client = http_client(config);
        let rest = Arc::new(RestExecutor::new(client.clone()));

        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register(ContactChannel::Rest, rest_payload, rest.clone());
        registry.register(
            ContactChannel::A2a,
            a2a_payload,
            Arc::new(A2aExecutor::new(client.clone())),
        );
        registry.register(
            ContactChannel::Mcp,
            rest_payload,
            Arc::new(McpExecutor::new(
                client.clone(),
                rest.clone(),
                config.probe_timeout,
            )),
        );
        registry.register(
            ContactChannel::WellKnown,
            rest_payload,
            Arc::new(WellKnownExecutor::new(
                client.clone(),
                rest.clone(),
                config.probe_timeout,
            )),
        );
        registry.register(
            ContactChannel::RepoIssue,
            repo_issue_payload,
            Arc::new(RepoIssueExecutor::new(client, config.github_token.clone())),
        );
        registry.register(
            ContactChannel::Webhook,
            webhook_payload,
            Arc::new(WebhookExecutor::new(rest)),
        );
        registry
    }

    /// Empty registry for tests that install their own executors.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        channel: ContactChannel,
        builder: PayloadBuilder,
        executor: Arc<dyn ContactExecutor>,
    ) {
        self.entries.insert(channel, ChannelEntry { builder, executor });
    }

    pub fn builder(&self, channel: ContactChannel) -> Option<PayloadBuilder> {
        self.entries.get(&channel).map(|e| e.builder)
    }

    pub fn executor(&self, channel: ContactChannel) -> Option<Arc<dyn ContactExecutor>> {
        self.entries.get(&channel).map(|e| e.executor.clone())
    }

    pub fn build_payload(&self, channel: ContactChannel, ctx: &MessageContext<'_>) -> Option<Value> {
        self.builder(channel).map(|build| build(ctx))
    }
}

fn http_client(config: &RecruitConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Wrap a response body as JSON: parsed when the server sent JSON,
/// `{"text": ...}` otherwise, `None` when empty.
pub(crate) async fn read_response_body(response: reqwest::Response) -> Option<Value> {
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    if is_json {
        return response.json::<Value>().await.ok();
    }

    match response.text().await {
        Ok(text) if !text.is_empty() => Some(json!({ "text": text })),
        _ => None,
    }
}
