use async_trait::async_trait;
use uuid::Uuid;

use shared_database::VersionedTable;

use crate::models::{queue_order, WaitlistEntry, WaitlistError, WaitlistFilter, WaitlistStatus};

/// Persistence for waitlist entries. Entries are never deleted, only
/// status-transitioned.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, WaitlistError>;

    async fn get(&self, id: Uuid) -> Result<Option<WaitlistEntry>, WaitlistError>;

    /// Optimistic update: fails with `ConcurrentModification` when the stored
    /// version differs from `entry.version`.
    async fn update(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, WaitlistError>;

    async fn list_all(&self) -> Result<Vec<WaitlistEntry>, WaitlistError>;

    /// Entries in `status` matching `filter`, in serving order.
    async fn find_by_filters(
        &self,
        status: WaitlistStatus,
        filter: &WaitlistFilter,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError>;

    async fn find_open_for_patient(&self, patient_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError>;
}

pub struct InMemoryWaitlistStore {
    table: VersionedTable<WaitlistEntry>,
}

impl InMemoryWaitlistStore {
    pub fn new() -> Self {
        Self {
            table: VersionedTable::new("waitlist_entries"),
        }
    }
}

impl Default for InMemoryWaitlistStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WaitlistStore for InMemoryWaitlistStore {
    async fn insert(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, WaitlistError> {
        Ok(self.table.insert(entry).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WaitlistEntry>, WaitlistError> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, WaitlistError> {
        Ok(self.table.update(entry).await?)
    }

    async fn list_all(&self) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let mut entries = self.table.scan(|_| true).await;
        entries.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn find_by_filters(
        &self,
        status: WaitlistStatus,
        filter: &WaitlistFilter,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let mut entries = self
            .table
            .scan(|entry| entry.status == status && entry.matches(filter))
            .await;
        entries.sort_by(queue_order);
        Ok(entries)
    }

    async fn find_open_for_patient(&self, patient_id: Uuid) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        Ok(self
            .table
            .scan(|entry| entry.patient_id == patient_id && entry.status.is_open())
            .await)
    }
}
