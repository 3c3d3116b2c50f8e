pub mod gateway;
pub mod memory;
pub mod redis_queue;
pub mod webhook;

pub use gateway::*;
pub use memory::InMemoryNotificationGateway;
pub use redis_queue::RedisNotificationGateway;
pub use webhook::WebhookNotificationGateway;
