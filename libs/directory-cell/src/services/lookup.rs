use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{DirectoryError, Doctor, Facility, Patient, Specialty};

/// Read-only view of patients, doctors, facilities and specialties.
///
/// Scheduling never writes through this trait.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn find_patient(&self, id: Uuid) -> Result<Patient, DirectoryError>;

    async fn find_doctor(&self, id: Uuid) -> Result<Doctor, DirectoryError>;

    async fn find_facility(&self, id: Uuid) -> Result<Facility, DirectoryError>;

    async fn find_specialty(&self, id: Uuid) -> Result<Specialty, DirectoryError>;
}
