//! Plain REST delivery: JSON POST with identifying headers.

use super::{read_response_body, ContactExecutor, ContactOutcome};
use async_trait::async_trait;
use serde_json::Value;

pub struct RestExecutor {
    client: reqwest::Client,
}

impl RestExecutor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContactExecutor for RestExecutor {
    async fn contact(&self, target_url: &str, payload: &Value) -> ContactOutcome {
        let result = self
            .client
            .post(target_url)
            .header("Content-Type", "application/json")
            .header("X-Agentry-Type", "invitation")
            .json(payload)
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
            Err(err) => ContactOutcome::failed(err.to_string()),
        }
    }
}
