use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{error, info, warn};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::NotificationMessage;
use crate::services::{
    memory::InMemoryNotificationGateway, redis_queue::RedisNotificationGateway,
    webhook::WebhookNotificationGateway,
};

/// Outbound transport for patient notifications.
///
/// `send` hands the payload over for asynchronous delivery; it does not wait
/// for the patient to receive it.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, payload: String) -> Result<(), NotificationError>;

    fn name(&self) -> &'static str;
}

/// Upper bound on a single hand-off to the gateway.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort front for a [`NotificationGateway`].
///
/// The state change that triggered a notification is already committed when
/// `dispatch` runs, so failures are logged and reported as `false` instead of
/// being returned to the caller. A gateway that does not answer within the
/// dispatch timeout counts as a failure.
#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            gateway,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn dispatch(&self, message: &NotificationMessage) -> bool {
        let payload = match message.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize {:?} notification for patient {}: {}",
                       message.kind, message.patient_id, e);
                return false;
            }
        };

        match timeout(self.timeout, self.gateway.send(payload)).await {
            Ok(Ok(())) => {
                info!("{:?} notification handed to {} for patient {}",
                      message.kind, self.gateway.name(), message.patient_id);
                true
            }
            Ok(Err(e)) => {
                warn!("{:?} notification for patient {} was not delivered via {}: {}",
                      message.kind, message.patient_id, self.gateway.name(), e);
                false
            }
            Err(_) => {
                warn!("{:?} notification for patient {} timed out after {:?} on {}",
                      message.kind, message.patient_id, self.timeout, self.gateway.name());
                false
            }
        }
    }
}

/// Pick the transport from configuration: Redis queue, then webhook, then the
/// in-memory recorder (log only).
pub async fn gateway_from_config(config: &AppConfig) -> Arc<dyn NotificationGateway> {
    if let Some(redis_url) = &config.redis_url {
        match RedisNotificationGateway::connect(redis_url, &config.notification_queue).await {
            Ok(gateway) => return Arc::new(gateway),
            Err(e) => error!("Redis notification gateway unavailable, falling back: {}", e),
        }
    }

    if let Some(url) = &config.notification_webhook_url {
        return Arc::new(WebhookNotificationGateway::with_timeout(
            url.clone(),
            config.notification_timeout(),
        ));
    }

    warn!("Using in-memory notification gateway; payloads are only logged");
    Arc::new(InMemoryNotificationGateway::new())
}
