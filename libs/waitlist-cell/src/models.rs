// libs/waitlist-cell/src/models.rs
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::DirectoryError;
use shared_database::{Record, StoreError};

// ==============================================================================
// CORE WAITLIST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialty_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub registered_at: DateTime<Utc>,
    pub priority: i32,
    pub status: WaitlistStatus,
    /// Appointment currently offered to this entry. Mirrors
    /// `Appointment::offered_waitlist_entry_id`.
    pub offered_appointment_id: Option<Uuid>,
    pub offer_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl WaitlistEntry {
    pub fn new(request: &RegisterWaitlistRequest, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            specialty_id: request.specialty_id,
            doctor_id: request.doctor_id,
            facility_id: request.facility_id,
            registered_at,
            priority: request.priority.unwrap_or(0),
            status: WaitlistStatus::Active,
            offered_appointment_id: None,
            offer_date: None,
            version: 0,
        }
    }

    pub fn has_open_offer(&self) -> bool {
        self.status == WaitlistStatus::AwaitingResponse && self.offered_appointment_id.is_some()
    }

    pub fn mark_offered(&mut self, appointment_id: Uuid, now: DateTime<Utc>) {
        self.status = WaitlistStatus::AwaitingResponse;
        self.offered_appointment_id = Some(appointment_id);
        self.offer_date = Some(now);
    }

    /// Drop the current offer and put the entry back in the queue.
    pub fn revert_offer(&mut self) {
        self.status = WaitlistStatus::Active;
        self.offered_appointment_id = None;
        self.offer_date = None;
    }

    pub fn mark_attended(&mut self) {
        self.status = WaitlistStatus::Attended;
        self.offered_appointment_id = None;
        self.offer_date = None;
    }

    pub fn matches(&self, filter: &WaitlistFilter) -> bool {
        filter.specialty_id.map_or(true, |id| self.specialty_id == id)
            && filter.doctor_id.map_or(true, |id| self.doctor_id == Some(id))
            && filter.facility_id.map_or(true, |id| self.facility_id == Some(id))
    }
}

impl Record for WaitlistEntry {
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

/// Serving order: higher priority first, then earliest registration.
/// Ties on both fall back to the id so the order is total.
pub fn queue_order(a: &WaitlistEntry, b: &WaitlistEntry) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.registered_at.cmp(&b.registered_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Active,
    AwaitingResponse,
    Attended,
    Cancelled,
}

impl WaitlistStatus {
    /// Entry still occupies the patient's single waitlist slot.
    pub fn is_open(&self) -> bool {
        matches!(self, WaitlistStatus::Active | WaitlistStatus::AwaitingResponse)
    }
}

impl fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitlistStatus::Active => write!(f, "active"),
            WaitlistStatus::AwaitingResponse => write!(f, "awaiting_response"),
            WaitlistStatus::Attended => write!(f, "attended"),
            WaitlistStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST / QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWaitlistRequest {
    pub patient_id: Uuid,
    pub specialty_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitlistFilter {
    pub specialty_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
}

impl WaitlistFilter {
    pub fn is_empty(&self) -> bool {
        self.specialty_id.is_none() && self.doctor_id.is_none() && self.facility_id.is_none()
    }
}

// ==============================================================================
// MATCHING MODELS
// ==============================================================================

/// The slot being filled: who the freed appointment was with, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCriteria {
    pub specialty_id: Uuid,
    pub doctor_id: Uuid,
    pub facility_id: Uuid,
}

impl SlotCriteria {
    pub fn exact_filter(&self) -> WaitlistFilter {
        WaitlistFilter {
            specialty_id: Some(self.specialty_id),
            doctor_id: Some(self.doctor_id),
            facility_id: Some(self.facility_id),
        }
    }

    pub fn specialty_filter(&self) -> WaitlistFilter {
        WaitlistFilter {
            specialty_id: Some(self.specialty_id),
            doctor_id: None,
            facility_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Specialty, doctor and facility all match.
    Exact,
    /// Specialty matches; doctor and facility unconstrained.
    SpecialtyOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistMatch {
    pub entry: WaitlistEntry,
    pub tier: MatchTier,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaitlistError {
    #[error("Waitlist entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Invalid waitlist request: {0}")]
    InvalidInput(String),

    #[error("Patient {0} already has an open waitlist entry")]
    AlreadyWaiting(Uuid),

    #[error("Waitlist entry cannot be changed in current status: {0}")]
    InvalidState(String),

    #[error("Waitlist entry was modified concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Waitlist store error: {0}")]
    StoreError(String),
}

impl From<StoreError> for WaitlistError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id, .. } => WaitlistError::EntryNotFound(id),
            StoreError::StaleWrite { .. } => WaitlistError::ConcurrentModification(error.to_string()),
            StoreError::Duplicate { .. } => WaitlistError::StoreError(error.to_string()),
        }
    }
}
