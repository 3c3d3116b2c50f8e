// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::DirectoryError;
use shared_database::{Record, StoreError};
use waitlist_cell::WaitlistError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub facility_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    /// Set once the pre-visit notification has fired. Never reset.
    pub reminder_sent: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmation_deadline: DateTime<Utc>,
    /// Waitlist entry holding the open offer on this slot. Mirrors
    /// `WaitlistEntry::offered_appointment_id`.
    pub offered_waitlist_entry_id: Option<Uuid>,
    pub offered_at: Option<DateTime<Utc>>,
    /// Entries whose offer on this slot lapsed during the current release.
    #[serde(default)]
    pub lapsed_offer_entry_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Appointment {
    pub fn new(request: &BookAppointmentRequest, confirmation_lead: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            facility_id: request.facility_id,
            scheduled_at: request.scheduled_at,
            status: AppointmentStatus::PendingConfirmation,
            notes: request.notes.clone(),
            reminder_sent: false,
            confirmed_at: None,
            confirmation_deadline: request.scheduled_at - confirmation_lead,
            offered_waitlist_entry_id: None,
            offered_at: None,
            lapsed_offer_entry_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn has_open_offer(&self) -> bool {
        self.offered_waitlist_entry_id.is_some()
    }

    pub fn attach_offer(&mut self, entry_id: Uuid, now: DateTime<Utc>) {
        self.offered_waitlist_entry_id = Some(entry_id);
        self.offered_at = Some(now);
        self.updated_at = now;
    }

    pub fn clear_offer(&mut self) {
        self.offered_waitlist_entry_id = None;
        self.offered_at = None;
    }

    pub fn record_lapsed_offer(&mut self, entry_id: Uuid) {
        if !self.lapsed_offer_entry_ids.contains(&entry_id) {
            self.lapsed_offer_entry_ids.push(entry_id);
        }
    }
}

impl Record for Appointment {
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

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    PendingConfirmation,
    Scheduled,
    Released,
    Cancelled,
    Withdrawn,
    Completed,
}

impl AppointmentStatus {
    /// The doctor's time is still taken by this appointment.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::PendingConfirmation
                | AppointmentStatus::Scheduled
                | AppointmentStatus::Released
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::PendingConfirmation => write!(f, "pending_confirmation"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Released => write!(f, "released"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Withdrawn => write!(f, "withdrawn"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST / QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub facility_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptOfferRequest {
    pub waitlist_entry_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// OFFER / JOB OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum OfferTimeoutOutcome {
    /// The appointment carries no open offer.
    NoOffer,
    /// The offer is still inside its response window; nothing changed.
    WithinWindow,
    /// The offer lapsed and was withdrawn; `reoffered_to` names the next
    /// entry that received the slot, if any.
    Expired { reoffered_to: Option<Uuid> },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobReport {
    pub examined: usize,
    pub processed: usize,
    pub failed: usize,
}

// ==============================================================================
// CONSISTENCY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferViolation {
    pub appointment_id: Option<Uuid>,
    pub waitlist_entry_id: Option<Uuid>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyReport {
    pub appointments_checked: usize,
    pub entries_checked: usize,
    pub violations: Vec<OfferViolation>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Waitlist entry not found: {0}")]
    WaitlistEntryNotFound(Uuid),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Invalid appointment request: {0}")]
    InvalidInput(String),

    #[error("Appointment conflicts with existing booking: {0}")]
    Conflict(String),

    #[error("Appointment cannot be changed in current status: {0}")]
    InvalidState(String),

    #[error("Confirmation deadline has passed: {0}")]
    Expired(String),

    #[error("Record was modified concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Appointment store error: {0}")]
    StoreError(String),
}

impl From<StoreError> for AppointmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id, .. } => AppointmentError::NotFound(id),
            StoreError::StaleWrite { .. } => AppointmentError::ConcurrentModification(error.to_string()),
            StoreError::Duplicate { .. } => AppointmentError::StoreError(error.to_string()),
        }
    }
}

impl From<WaitlistError> for AppointmentError {
    fn from(error: WaitlistError) -> Self {
        match error {
            WaitlistError::EntryNotFound(id) => AppointmentError::WaitlistEntryNotFound(id),
            WaitlistError::Directory(e) => AppointmentError::Directory(e),
            WaitlistError::InvalidInput(msg) => AppointmentError::InvalidInput(msg),
            WaitlistError::AlreadyWaiting(_) => AppointmentError::Conflict(error.to_string()),
            WaitlistError::InvalidState(msg) => AppointmentError::InvalidState(msg),
            WaitlistError::ConcurrentModification(msg) => AppointmentError::ConcurrentModification(msg),
            WaitlistError::StoreError(msg) => AppointmentError::StoreError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(scheduled_at: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            scheduled_at,
            notes: None,
        }
    }

    #[test]
    fn new_appointment_is_pending_with_deadline_before_slot() {
        let now = Utc::now();
        let at = now + Duration::days(2);
        let appointment = Appointment::new(&request(at), Duration::minutes(30), now);

        assert_eq!(appointment.status, AppointmentStatus::PendingConfirmation);
        assert_eq!(appointment.confirmation_deadline, at - Duration::minutes(30));
        assert!(!appointment.reminder_sent);
        assert!(!appointment.has_open_offer());
    }

    #[test]
    fn released_still_occupies_slot() {
        assert!(AppointmentStatus::Released.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
        assert!(!AppointmentStatus::Withdrawn.occupies_slot());
    }

    #[test]
    fn stale_write_maps_to_concurrent_modification() {
        let error = StoreError::StaleWrite { table: "appointments", id: Uuid::new_v4(), expected: 1, found: 2 };
        assert!(matches!(AppointmentError::from(error), AppointmentError::ConcurrentModification(_)));
    }
}
