pub mod store;
pub mod matcher;
pub mod registry;

pub use store::{InMemoryWaitlistStore, WaitlistStore};
pub use matcher::WaitlistMatcher;
pub use registry::WaitlistService;
