use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A row that can live in a [`VersionedTable`].
///
/// `version` is owned by the table: it is set to 1 on insert and bumped on
/// every successful update. Callers only carry it back unchanged.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: Uuid },

    #[error("{table} row {id} already exists")]
    Duplicate { table: &'static str, id: Uuid },

    #[error("{table} row {id} was modified concurrently (expected version {expected}, found {found})")]
    StaleWrite {
        table: &'static str,
        id: Uuid,
        expected: u64,
        found: u64,
    },
}

/// In-memory table with optimistic concurrency control.
pub struct VersionedTable<T> {
    name: &'static str,
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Record> VersionedTable<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn insert(&self, mut record: T) -> Result<T, StoreError> {
        let mut rows = self.rows.write().await;
        let id = record.id();

        if rows.contains_key(&id) {
            return Err(StoreError::Duplicate { table: self.name, id });
        }

        record.set_version(1);
        rows.insert(id, record.clone());
        debug!("Inserted {} row {}", self.name, id);
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    /// Replace a row, failing if it changed since `record` was read.
    pub async fn update(&self, mut record: T) -> Result<T, StoreError> {
        let mut rows = self.rows.write().await;
        let id = record.id();

        let current = rows
            .get(&id)
            .ok_or(StoreError::NotFound { table: self.name, id })?;

        if current.version() != record.version() {
            return Err(StoreError::StaleWrite {
                table: self.name,
                id,
                expected: record.version(),
                found: current.version(),
            });
        }

        record.set_version(record.version() + 1);
        rows.insert(id, record.clone());
        debug!("Updated {} row {} to version {}", self.name, id, record.version());
        Ok(record)
    }

    pub async fn scan<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    pub async fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.rows.read().await.values().any(predicate)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Clone, Debug)]
    struct Row {
        id: Uuid,
        value: u32,
        version: u64,
    }

    impl Record for Row {
        fn id(&self) -> Uuid {
            self.id
        }
        fn version(&self) -> u64 {
            self.version
        }
        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
    }

    fn row(value: u32) -> Row {
        Row { id: Uuid::new_v4(), value, version: 0 }
    }

    #[tokio::test]
    async fn insert_assigns_first_version() {
        let table = VersionedTable::new("rows");
        let stored = table.insert(row(1)).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let table = VersionedTable::new("rows");
        let stored = table.insert(row(1)).await.unwrap();
        let result = table.insert(stored).await;
        assert_matches!(result, Err(StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn second_writer_with_old_version_is_rejected() {
        let table = VersionedTable::new("rows");
        let stored = table.insert(row(1)).await.unwrap();

        let mut first = stored.clone();
        first.value = 2;
        let mut second = stored;
        second.value = 3;

        let first = table.update(first).await.unwrap();
        assert_eq!(first.version, 2);

        let result = table.update(second).await;
        assert_matches!(result, Err(StoreError::StaleWrite { expected: 1, found: 2, .. }));
        assert_eq!(table.get(first.id).await.unwrap().value, 2);
    }

    #[tokio::test]
    async fn update_of_missing_row_fails() {
        let table: VersionedTable<Row> = VersionedTable::new("rows");
        let result = table.update(row(1)).await;
        assert_matches!(result, Err(StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scan_filters_rows() {
        let table = VersionedTable::new("rows");
        for value in 0..5 {
            table.insert(row(value)).await.unwrap();
        }
        let even = table.scan(|r| r.value % 2 == 0).await;
        assert_eq!(even.len(), 3);
        assert!(table.any(|r| r.value == 4).await);
    }
}
