use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;
use crate::models::NotificationMessage;
use crate::services::gateway::NotificationGateway;

/// Keeps every payload in memory and logs it. Used when no transport is
/// configured and in tests.
#[derive(Default)]
pub struct InMemoryNotificationGateway {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl InMemoryNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `send` fails without recording the payload.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn payloads(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.payloads()
            .iter()
            .filter_map(|payload| serde_json::from_str(payload).ok())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotificationGateway {
    async fn send(&self, payload: String) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Unavailable("in-memory gateway set to fail".to_string()));
        }

        info!("Notification payload: {}", payload);
        self.sent
            .lock()
            .map_err(|_| NotificationError::Unavailable("notification log poisoned".to_string()))?
            .push(payload);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
