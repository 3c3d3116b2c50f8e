use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Payload serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    PoolError(String),

    #[error("HTTP delivery failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Notification endpoint rejected payload with status {status}")]
    Rejected { status: u16 },

    #[error("Notification gateway unavailable: {0}")]
    Unavailable(String),
}
