//! Well-known delivery: fetch the agent card, extract a contact URL,
//! and hand off to the REST executor.

use super::{ContactExecutor, ContactOutcome, RestExecutor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub struct WellKnownExecutor {
    client: reqwest::Client,
    rest: Arc<RestExecutor>,
    probe_timeout: Duration,
}

impl WellKnownExecutor {
    pub fn new(client: reqwest::Client, rest: Arc<RestExecutor>, probe_timeout: Duration) -> Self {
        Self {
            client,
            rest,
            probe_timeout,
        }
    }
}

fn read_contact_url(card: &Value) -> Option<String> {
    let direct = card
        .get("contact_url")
        .or_else(|| card.get("message_url"))
        .and_then(|v| v.as_str());
    if let Some(url) = direct {
        let url = url.trim();
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }

    let base = card
        .get("api")
        .and_then(|api| api.get("base_url"))
        .and_then(|v| v.as_str())?;
    let base = base.trim();
    if base.is_empty() {
        return None;
    }
    Some(format!("{}/messages", base.trim_end_matches('/')))
}

#[async_trait]
impl ContactExecutor for WellKnownExecutor {
    async fn contact(&self, card_url: &str, payload: &Value) -> ContactOutcome {
        let response = match self
            .client
            .get(card_url)
            .header("Accept", "application/json")
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(err) => return ContactOutcome::failed(err.to_string()),
        };

        if !response.status().is_success() {
            return ContactOutcome {
                status: Some(response.status().as_u16()),
                error: Some("No agent card found".into()),
                ..ContactOutcome::default()
            };
        }

        let card = match response.json::<Value>().await {
            Ok(card) => card,
            Err(_) => return ContactOutcome::failed("Agent card was not valid JSON"),
        };

        let Some(contact_url) = read_contact_url(&card) else {
            return ContactOutcome {
                success: true,
                sent: false,
                status: Some(200),
                response: Some(json!({ "agent_card": card })),
                error: None,
                note: Some("Agent card found but no contact endpoint was exposed".into()),
            };
        };

        let mut result = self.rest.contact(&contact_url, payload).await;
        result.response = Some(json!({
            "agent_card": card,
            "contact_response": result.response,
        }));
        result
    }
}
