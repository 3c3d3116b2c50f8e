use std::io::Write;

use assert_matches::assert_matches;
use uuid::Uuid;

use directory_cell::*;

fn sample_seed() -> DirectorySeed {
    let specialty = Specialty { id: Uuid::new_v4(), name: "Cardiology".to_string() };
    let facility = Facility {
        id: Uuid::new_v4(),
        name: "Central Clinic".to_string(),
        address: Some("1 Main St".to_string()),
    };
    DirectorySeed {
        patients: vec![Patient {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            email: None,
            phone: None,
        }],
        doctors: vec![Doctor {
            id: Uuid::new_v4(),
            name: "Dr. Lima".to_string(),
            license_number: Some("CRM-1234".to_string()),
            specialty_id: specialty.id,
            facility_id: facility.id,
            active: true,
        }],
        facilities: vec![facility],
        specialties: vec![specialty],
    }
}

#[tokio::test]
async fn test_lookup_seeded_records() {
    let seed = sample_seed();
    let patient_id = seed.patients[0].id;
    let doctor = seed.doctors[0].clone();

    let directory = InMemoryDirectory::from_seed(seed).await;

    assert_eq!(directory.find_patient(patient_id).await.unwrap().name, "Ana Souza");
    assert_eq!(directory.find_doctor(doctor.id).await.unwrap(), doctor);
    assert!(directory.find_facility(doctor.facility_id).await.is_ok());
    assert!(directory.find_specialty(doctor.specialty_id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let directory = InMemoryDirectory::new();
    let id = Uuid::new_v4();

    assert_matches!(directory.find_patient(id).await, Err(DirectoryError::PatientNotFound(missing)) if missing == id);
    assert_matches!(directory.find_doctor(id).await, Err(DirectoryError::DoctorNotFound(_)));
    assert_matches!(directory.find_facility(id).await, Err(DirectoryError::FacilityNotFound(_)));
    assert_matches!(directory.find_specialty(id).await, Err(DirectoryError::SpecialtyNotFound(_)));
}

#[tokio::test]
async fn test_seed_file_round_trip_and_deactivation() {
    let seed = sample_seed();
    let doctor_id = seed.doctors[0].id;

    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{}", serde_json::to_string(&seed).unwrap()).unwrap();

    let directory = InMemoryDirectory::from_seed_file(file.path()).await.expect("Seed should load");
    assert!(directory.find_doctor(doctor_id).await.unwrap().active);

    directory.set_doctor_active(doctor_id, false).await.unwrap();
    assert!(!directory.find_doctor(doctor_id).await.unwrap().active);
}

#[tokio::test]
async fn test_doctor_active_defaults_to_true_in_seed() {
    let specialty_id = Uuid::new_v4();
    let facility_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let raw = serde_json::json!({
        "doctors": [{
            "id": doctor_id,
            "name": "Dr. Reis",
            "license_number": null,
            "specialty_id": specialty_id,
            "facility_id": facility_id
        }]
    });

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", raw).unwrap();

    let directory = InMemoryDirectory::from_seed_file(file.path()).await.unwrap();
    assert!(directory.find_doctor(doctor_id).await.unwrap().active);
}

#[tokio::test]
async fn test_malformed_seed_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    let result = InMemoryDirectory::from_seed_file(file.path()).await;
    assert_matches!(result, Err(DirectoryError::SeedError(_)));
}
