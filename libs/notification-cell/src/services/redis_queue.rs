use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::NotificationError;
use crate::services::gateway::NotificationGateway;

/// Pushes payloads onto a Redis list consumed by the delivery workers.
pub struct RedisNotificationGateway {
    pool: Pool,
    queue: String,
}

impl RedisNotificationGateway {
    pub async fn connect(redis_url: &str, queue: &str) -> Result<Self, NotificationError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| NotificationError::PoolError(format!("Pool creation error: {}", e)))?;

        let gateway = Self {
            pool,
            queue: queue.to_string(),
        };

        // Test connection
        let mut conn = gateway.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis notification gateway ready on queue {}", gateway.queue);

        Ok(gateway)
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    async fn get_connection(&self) -> Result<Connection, NotificationError> {
        self.pool
            .get()
            .await
            .map_err(|e| NotificationError::PoolError(format!("Connection error: {}", e)))
    }
}

#[async_trait]
impl NotificationGateway for RedisNotificationGateway {
    async fn send(&self, payload: String) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.lpush(&self.queue, payload).await?;
        debug!("Notification enqueued on {}", self.queue);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
