use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::services::gateway::{NotificationGateway, DEFAULT_DISPATCH_TIMEOUT};

/// POSTs each payload to a delivery service.
pub struct WebhookNotificationGateway {
    client: Client,
    url: String,
}

impl WebhookNotificationGateway {
    pub fn new(url: String) -> Self {
        Self::with_timeout(url, DEFAULT_DISPATCH_TIMEOUT)
    }

    pub fn with_timeout(url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build webhook client with timeout, using defaults: {}", e);
                Client::new()
            });

        Self { client, url }
    }
}

#[async_trait]
impl NotificationGateway for WebhookNotificationGateway {
    async fn send(&self, payload: String) -> Result<(), NotificationError> {
        debug!("Posting notification to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected { status: status.as_u16() });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
