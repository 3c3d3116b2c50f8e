// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use directory_cell::DirectoryLookup;
use shared_database::KeyedLocks;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, BookAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::release::{Outbox, SlotReleaseCoordinator};
use crate::services::store::AppointmentStore;

/// Patient-facing appointment operations: book, confirm, cancel, withdraw.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn DirectoryLookup>,
    coordinator: Arc<SlotReleaseCoordinator>,
    lifecycle: AppointmentLifecycleService,
    doctor_locks: KeyedLocks,
}

impl AppointmentBookingService {
    pub fn new(directory: Arc<dyn DirectoryLookup>, coordinator: Arc<SlotReleaseCoordinator>) -> Self {
        Self {
            store: coordinator.appointments(),
            directory,
            coordinator,
            lifecycle: AppointmentLifecycleService::new(),
            doctor_locks: KeyedLocks::new(),
        }
    }

    pub fn coordinator(&self) -> Arc<SlotReleaseCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub async fn book_appointment(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        self.book_appointment_at(request, Utc::now()).await
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id, doctor_id = %request.doctor_id))]
    pub async fn book_appointment_at(
        &self,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} with doctor {} at {}",
              request.patient_id, request.doctor_id, request.scheduled_at);

        self.directory.find_patient(request.patient_id).await?;
        let doctor = self.directory.find_doctor(request.doctor_id).await?;
        self.directory.find_facility(request.facility_id).await?;

        if !doctor.active {
            return Err(AppointmentError::InvalidState(format!(
                "doctor {} is not accepting appointments",
                doctor.id
            )));
        }

        self.lifecycle.check_bookable(request.scheduled_at, now)?;

        // Conflict check and insert must not interleave for the same doctor.
        let _guard = self.doctor_locks.acquire(request.doctor_id).await;

        let occupants = self
            .store
            .find_slot_occupants(request.doctor_id, request.scheduled_at)
            .await?;
        if let Some(existing) = occupants.first() {
            warn!("Doctor {} already has appointment {} at {}", request.doctor_id, existing.id, request.scheduled_at);
            return Err(AppointmentError::Conflict(format!(
                "doctor {} already has an appointment at {}",
                request.doctor_id, request.scheduled_at
            )));
        }

        let appointment = Appointment::new(&request, self.coordinator.policy().confirmation_lead, now);
        let appointment = self.store.insert(appointment).await?;

        info!("Appointment {} booked, awaiting confirmation until {}",
              appointment.id, appointment.confirmation_deadline);

        Ok(appointment)
    }

    pub async fn confirm_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.confirm_appointment_at(appointment_id, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn confirm_appointment_at(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.coordinator.lock_appointment(appointment_id).await;
        let mut appointment = self.coordinator.load(appointment_id).await?;

        self.lifecycle.check_confirmable(&appointment, now)?;

        appointment.status = AppointmentStatus::Scheduled;
        appointment.confirmed_at = Some(now);
        appointment.updated_at = now;
        let appointment = self.store.update(appointment).await?;

        info!("Appointment {} confirmed", appointment.id);
        Ok(appointment)
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.cancel_appointment_at(appointment_id, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_appointment_at(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.coordinator.lock_appointment(appointment_id).await;
        let mut appointment = self.coordinator.load(appointment_id).await?;

        self.lifecycle.check_cancellable(&appointment)?;

        if appointment.has_open_offer() {
            self.coordinator.clear_offer_locked(&mut appointment).await?;
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = now;
        let appointment = self.store.update(appointment).await?;

        info!("Appointment {} cancelled", appointment.id);
        Ok(appointment)
    }

    pub async fn withdraw_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.withdraw_appointment_at(appointment_id, Utc::now()).await
    }

    /// The patient gives the slot up; it is released and offered to the waitlist.
    #[instrument(skip(self))]
    pub async fn withdraw_appointment_at(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.withdraw_guarded(appointment_id, now, &mut outbox).await;
        self.coordinator.deliver(outbox).await;
        result
    }

    async fn withdraw_guarded(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.coordinator.lock_appointment(appointment_id).await;
        let mut appointment = self.coordinator.load(appointment_id).await?;

        self.lifecycle.check_withdrawable(&appointment)?;

        if appointment.has_open_offer() {
            self.coordinator.clear_offer_locked(&mut appointment).await?;
        }

        appointment.status = AppointmentStatus::Withdrawn;
        appointment.updated_at = now;
        let appointment = self.store.update(appointment).await?;
        info!("Patient {} withdrew from appointment {}", appointment.patient_id, appointment.id);

        self.coordinator.release_locked(appointment, now, outbox).await
    }

    #[instrument(skip(self))]
    pub async fn complete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let _guard = self.coordinator.lock_appointment(appointment_id).await;
        let mut appointment = self.coordinator.load(appointment_id).await?;

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        appointment.status = AppointmentStatus::Completed;
        appointment.updated_at = Utc::now();
        let appointment = self.store.update(appointment).await?;

        info!("Appointment {} completed", appointment.id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.coordinator.load(appointment_id).await
    }

    pub async fn list_appointments(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = match (query.patient_id, query.status) {
            (Some(patient_id), status) => {
                let mut appointments = self.store.find_by_patient(patient_id).await?;
                if let Some(status) = status {
                    appointments.retain(|a| a.status == status);
                }
                appointments
            }
            (None, Some(status)) => self.store.find_by_status(status).await?,
            (None, None) => self.store.list_all().await?,
        };

        Ok(appointments)
    }
}
