//! Webhook delivery: the envelope differs, the transport does not.

use super::{ContactExecutor, ContactOutcome, RestExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct WebhookExecutor {
    rest: Arc<RestExecutor>,
}

impl WebhookExecutor {
    pub fn new(rest: Arc<RestExecutor>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl ContactExecutor for WebhookExecutor {
    async fn contact(&self, target_url: &str, payload: &Value) -> ContactOutcome {
        self.rest.contact(target_url, payload).await
    }
}
