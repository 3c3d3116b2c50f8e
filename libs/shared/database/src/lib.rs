pub mod locks;
pub mod memory;

pub use locks::{KeyedLockGuard, KeyedLocks};
pub use memory::{Record, StoreError, VersionedTable};
