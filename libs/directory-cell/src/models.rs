// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// DIRECTORY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub license_number: Option<String>,
    pub specialty_id: Uuid,
    pub facility_id: Uuid,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
}

/// Initial directory contents, loaded from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(Uuid),

    #[error("Facility not found: {0}")]
    FacilityNotFound(Uuid),

    #[error("Specialty not found: {0}")]
    SpecialtyNotFound(Uuid),

    #[error("Directory seed could not be loaded: {0}")]
    SeedError(String),
}
