//! MCP delivery: probe the tool listing, call a receive-style tool when
//! one is advertised, otherwise fall back to a plain REST POST.

use super::{read_response_body, ContactExecutor, ContactOutcome, RestExecutor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const PREFERRED_TOOLS: &[&str] = &["receive_message", "contact", "contact_agent", "inbox.receive"];

pub struct McpExecutor {
    client: reqwest::Client,
    rest: Arc<RestExecutor>,
    probe_timeout: Duration,
}

impl McpExecutor {
    pub fn new(client: reqwest::Client, rest: Arc<RestExecutor>, probe_timeout: Duration) -> Self {
        Self {
            client,
            rest,
            probe_timeout,
        }
    }
}

fn extract_tool_names(payload: &Value) -> Vec<String> {
    let tools = payload
        .get("tools")
        .or_else(|| payload.get("data").and_then(|d| d.get("tools")));
    let Some(Value::Array(items)) = tools else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|tool| tool.get("name").and_then(|n| n.as_str()))
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl ContactExecutor for McpExecutor {
    async fn contact(&self, target_url: &str, payload: &Value) -> ContactOutcome {
        let listing = self
            .client
            .get(target_url)
            .header("Accept", "application/json")
            .timeout(self.probe_timeout)
            .send()
            .await;

        let listing_body = match listing {
            Ok(response) if response.status().is_success() => read_response_body(response).await,
            Ok(_) => None,
            // Unreachable listing endpoint: treat the URL as a plain inbox.
            Err(_) => return self.rest.contact(target_url, payload).await,
        };

        let tools = listing_body
            .as_ref()
            .map(extract_tool_names)
            .unwrap_or_default();
        let Some(preferred) = tools
            .iter()
            .find(|t| PREFERRED_TOOLS.contains(&t.as_str()))
        else {
            return self.rest.contact(target_url, payload).await;
        };

        let call = json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {
                "name": preferred,
                "arguments": {
                    "message": payload,
                    "source": "agentry-recruiter",
                },
            },
        });

        let result = self
            .client
            .post(target_url)
            .header("Content-Type", "application/json")
            .json(&call)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                let body = read_response_body(response).await;
                ContactOutcome {
                    success: status.is_success(),
                    sent: true,
                    status: Some(status.as_u16()),
                    response: body,
                    error: None,
                    note: None,
                }
            }
            Err(_) => self.rest.contact(target_url, payload).await,
        }
    }
}
