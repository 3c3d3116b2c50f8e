use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DirectoryError, DirectorySeed, Doctor, Facility, Patient, Specialty};
use crate::services::lookup::DirectoryLookup;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashMap<Uuid, Patient>>,
    doctors: RwLock<HashMap<Uuid, Doctor>>,
    facilities: RwLock<HashMap<Uuid, Facility>>,
    specialties: RwLock<HashMap<Uuid, Specialty>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        directory.load(seed).await;
        directory
    }

    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DirectoryError::SeedError(format!("{}: {}", path.display(), e)))?;
        let seed: DirectorySeed = serde_json::from_str(&raw)
            .map_err(|e| DirectoryError::SeedError(format!("{}: {}", path.display(), e)))?;

        info!(
            "Loaded directory seed from {} ({} patients, {} doctors, {} facilities, {} specialties)",
            path.display(),
            seed.patients.len(),
            seed.doctors.len(),
            seed.facilities.len(),
            seed.specialties.len()
        );

        Ok(Self::from_seed(seed).await)
    }

    pub async fn load(&self, seed: DirectorySeed) {
        for patient in seed.patients {
            self.upsert_patient(patient).await;
        }
        for specialty in seed.specialties {
            self.upsert_specialty(specialty).await;
        }
        for facility in seed.facilities {
            self.upsert_facility(facility).await;
        }
        for doctor in seed.doctors {
            self.upsert_doctor(doctor).await;
        }
    }

    pub async fn upsert_patient(&self, patient: Patient) {
        debug!("Directory upsert patient {}", patient.id);
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn upsert_doctor(&self, doctor: Doctor) {
        debug!("Directory upsert doctor {}", doctor.id);
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn upsert_facility(&self, facility: Facility) {
        debug!("Directory upsert facility {}", facility.id);
        self.facilities.write().await.insert(facility.id, facility);
    }

    pub async fn upsert_specialty(&self, specialty: Specialty) {
        debug!("Directory upsert specialty {}", specialty.id);
        self.specialties.write().await.insert(specialty.id, specialty);
    }

    pub async fn set_doctor_active(&self, doctor_id: Uuid, active: bool) -> Result<(), DirectoryError> {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors
            .get_mut(&doctor_id)
            .ok_or(DirectoryError::DoctorNotFound(doctor_id))?;
        doctor.active = active;
        Ok(())
    }
}

#[async_trait]
impl DirectoryLookup for InMemoryDirectory {
    async fn find_patient(&self, id: Uuid) -> Result<Patient, DirectoryError> {
        self.patients
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::PatientNotFound(id))
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Doctor, DirectoryError> {
        self.doctors
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::DoctorNotFound(id))
    }

    async fn find_facility(&self, id: Uuid) -> Result<Facility, DirectoryError> {
        self.facilities
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::FacilityNotFound(id))
    }

    async fn find_specialty(&self, id: Uuid) -> Result<Specialty, DirectoryError> {
        self.specialties
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::SpecialtyNotFound(id))
    }
}
