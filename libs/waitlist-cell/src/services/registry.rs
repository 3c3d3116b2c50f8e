// libs/waitlist-cell/src/services/registry.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use directory_cell::DirectoryLookup;
use shared_database::KeyedLocks;

use crate::models::{
    RegisterWaitlistRequest, WaitlistEntry, WaitlistError, WaitlistFilter, WaitlistStatus,
};
use crate::services::store::WaitlistStore;

/// Registration and queue maintenance for the per-specialty waitlist.
pub struct WaitlistService {
    store: Arc<dyn WaitlistStore>,
    directory: Arc<dyn DirectoryLookup>,
    patient_locks: KeyedLocks,
}

impl WaitlistService {
    pub fn new(store: Arc<dyn WaitlistStore>, directory: Arc<dyn DirectoryLookup>) -> Self {
        Self {
            store,
            directory,
            patient_locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> Arc<dyn WaitlistStore> {
        Arc::clone(&self.store)
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn register(&self, request: RegisterWaitlistRequest) -> Result<WaitlistEntry, WaitlistError> {
        info!("Adding patient {} to waitlist for specialty {}", request.patient_id, request.specialty_id);

        self.directory.find_patient(request.patient_id).await?;
        self.directory.find_specialty(request.specialty_id).await?;

        if let Some(doctor_id) = request.doctor_id {
            let doctor = self.directory.find_doctor(doctor_id).await?;
            if doctor.specialty_id != request.specialty_id {
                return Err(WaitlistError::InvalidInput(format!(
                    "Doctor {} does not practice specialty {}",
                    doctor_id, request.specialty_id
                )));
            }
        }

        if let Some(facility_id) = request.facility_id {
            self.directory.find_facility(facility_id).await?;
        }

        // Duplicate check and insert must not interleave for the same patient.
        let _guard = self.patient_locks.acquire(request.patient_id).await;

        let open = self.store.find_open_for_patient(request.patient_id).await?;
        if !open.is_empty() {
            warn!("Patient {} already has open waitlist entry {}", request.patient_id, open[0].id);
            return Err(WaitlistError::AlreadyWaiting(request.patient_id));
        }

        let entry = self.store.insert(WaitlistEntry::new(&request, Utc::now())).await?;
        info!("Patient {} added to waitlist as entry {} (priority {})",
              entry.patient_id, entry.id, entry.priority);

        Ok(entry)
    }

    pub async fn get(&self, entry_id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        self.store
            .get(entry_id)
            .await?
            .ok_or(WaitlistError::EntryNotFound(entry_id))
    }

    /// Without filters every entry is returned, whatever its status. With any
    /// filter only active entries are listed, in serving order.
    pub async fn list(&self, filter: &WaitlistFilter) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        if filter.is_empty() {
            return self.store.list_all().await;
        }

        self.store.find_by_filters(WaitlistStatus::Active, filter).await
    }

    pub async fn next_in_line(&self, filter: &WaitlistFilter) -> Result<Option<WaitlistEntry>, WaitlistError> {
        let entries = self.store.find_by_filters(WaitlistStatus::Active, filter).await?;
        Ok(entries.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, entry_id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        info!("Removing waitlist entry {}", entry_id);

        let mut entry = self.get(entry_id).await?;

        match entry.status {
            WaitlistStatus::AwaitingResponse => {
                return Err(WaitlistError::InvalidState(
                    "entry is awaiting response to an offered slot".to_string(),
                ));
            }
            WaitlistStatus::Attended => {
                return Err(WaitlistError::InvalidState(
                    "entry has already been attended".to_string(),
                ));
            }
            WaitlistStatus::Cancelled => return Ok(entry),
            WaitlistStatus::Active => {}
        }

        entry.status = WaitlistStatus::Cancelled;
        let entry = self.store.update(entry).await?;
        info!("Waitlist entry {} cancelled", entry.id);

        Ok(entry)
    }
}
