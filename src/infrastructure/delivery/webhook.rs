use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::domain::pipeline::DeliverySink;
use crate::domain::{DomainError, TerminalSnapshot};

/// Posts every terminal snapshot as JSON to a fixed URL
#[derive(Debug, Clone)]
pub struct WebhookDeliverySink {
    client: Client,
    url: String,
}

impl WebhookDeliverySink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DeliverySink for WebhookDeliverySink {
    async fn deliver(&self, snapshot: &TerminalSnapshot) -> Result<(), DomainError> {
        let response = self
            .client
            .post(&self.url)
            .header("X-Request-Id", snapshot.request_id.to_string())
            .json(snapshot)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("Webhook delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(512)
                .collect();
            return Err(DomainError::http(status.as_u16(), body));
        }

        info!(
            request_id = %snapshot.request_id,
            outcome = snapshot.outcome.as_str(),
            "Snapshot delivered to webhook"
        );

        Ok(())
    }
}
