// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_database::VersionedTable;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Persistence for appointments, with the queries the lifecycle and the
/// time-driven jobs need.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Optimistic update: fails with `ConcurrentModification` when the stored
    /// version differs from `appointment.version`.
    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    /// Appointments still holding the doctor's time at exactly `scheduled_at`.
    async fn find_slot_occupants(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Unconfirmed pending appointments whose deadline is at or before `cutoff`.
    async fn find_unconfirmed_past(&self, cutoff: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError>;

    /// Pending or scheduled appointments in `[from, until]` with no reminder sent yet.
    async fn find_due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_with_open_offer(&self) -> Result<Vec<Appointment>, AppointmentError>;

    /// Released appointments after `after` that nobody has been offered.
    async fn find_released_without_offer(&self, after: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError>;
}

pub struct InMemoryAppointmentStore {
    table: VersionedTable<Appointment>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self {
            table: VersionedTable::new("appointments"),
        }
    }

    async fn scan_sorted<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut appointments = self.table.scan(predicate).await;
        appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));
        appointments
    }
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        Ok(self.table.insert(appointment).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.table.get(id).await)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        Ok(self.table.update(appointment).await?)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.scan_sorted(|_| true).await)
    }

    async fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.scan_sorted(|a| a.status == status).await)
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.scan_sorted(|a| a.patient_id == patient_id).await)
    }

    async fn find_slot_occupants(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .scan_sorted(|a| {
                a.doctor_id == doctor_id && a.scheduled_at == scheduled_at && a.status.occupies_slot()
            })
            .await)
    }

    async fn find_unconfirmed_past(&self, cutoff: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .scan_sorted(|a| {
                a.status == AppointmentStatus::PendingConfirmation
                    && a.confirmed_at.is_none()
                    && a.confirmation_deadline <= cutoff
            })
            .await)
    }

    async fn find_due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .scan_sorted(|a| {
                matches!(a.status, AppointmentStatus::PendingConfirmation | AppointmentStatus::Scheduled)
                    && !a.reminder_sent
                    && a.scheduled_at >= from
                    && a.scheduled_at <= until
            })
            .await)
    }

    async fn find_with_open_offer(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .scan_sorted(|a| a.status == AppointmentStatus::Released && a.has_open_offer())
            .await)
    }

    async fn find_released_without_offer(&self, after: DateTime<Utc>) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .scan_sorted(|a| {
                a.status == AppointmentStatus::Released && !a.has_open_offer() && a.scheduled_at > after
            })
            .await)
    }
}
