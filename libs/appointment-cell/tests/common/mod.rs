#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use appointment_cell::*;
use directory_cell::{Doctor, Facility, InMemoryDirectory, Patient, Specialty};
use notification_cell::{InMemoryNotificationGateway, NotificationDispatcher, NotificationGateway};
use shared_config::SlotReleasePolicy;
use waitlist_cell::{
    InMemoryWaitlistStore, RegisterWaitlistRequest, WaitlistEntry, WaitlistService, WaitlistStore,
};

// ==============================================================================
// TEST HARNESS
// ==============================================================================

pub struct Harness {
    pub now: DateTime<Utc>,
    pub directory: Arc<InMemoryDirectory>,
    pub waitlist_store: Arc<InMemoryWaitlistStore>,
    pub waitlist: Arc<WaitlistService>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub gateway: Arc<InMemoryNotificationGateway>,
    pub coordinator: Arc<SlotReleaseCoordinator>,
    pub booking: Arc<AppointmentBookingService>,
    pub jobs: Arc<SlotReleaseJobs>,
    pub checker: OfferConsistencyChecker,
    pub specialty_id: Uuid,
    pub other_specialty_id: Uuid,
    pub doctor_id: Uuid,
    pub facility_id: Uuid,
    pub inactive_doctor_id: Uuid,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(SlotReleasePolicy::default()).await
    }

    pub async fn with_policy(policy: SlotReleasePolicy) -> Self {
        let gateway = Arc::new(InMemoryNotificationGateway::new());
        Self::build(policy, Arc::new(InMemoryAppointmentStore::new()), gateway.clone(), gateway).await
    }

    pub async fn build(
        policy: SlotReleasePolicy,
        appointments: Arc<dyn AppointmentStore>,
        gateway: Arc<InMemoryNotificationGateway>,
        transport: Arc<dyn NotificationGateway>,
    ) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let specialty_id = Uuid::new_v4();
        let other_specialty_id = Uuid::new_v4();
        let facility_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();
        let inactive_doctor_id = Uuid::new_v4();

        directory.upsert_specialty(Specialty { id: specialty_id, name: "Cardiology".to_string() }).await;
        directory.upsert_specialty(Specialty { id: other_specialty_id, name: "Dermatology".to_string() }).await;
        directory
            .upsert_facility(Facility {
                id: facility_id,
                name: "Central Clinic".to_string(),
                address: Some("1 Main St".to_string()),
            })
            .await;
        directory
            .upsert_doctor(Doctor {
                id: doctor_id,
                name: "Dr. Lima".to_string(),
                license_number: Some("CRM-1234".to_string()),
                specialty_id,
                facility_id,
                active: true,
            })
            .await;
        directory
            .upsert_doctor(Doctor {
                id: inactive_doctor_id,
                name: "Dr. Souza".to_string(),
                license_number: None,
                specialty_id,
                facility_id,
                active: false,
            })
            .await;

        let waitlist_store = Arc::new(InMemoryWaitlistStore::new());
        let waitlist = Arc::new(WaitlistService::new(waitlist_store.clone(), directory.clone()));

        let coordinator = Arc::new(SlotReleaseCoordinator::new(
            appointments.clone(),
            waitlist_store.clone(),
            directory.clone(),
            NotificationDispatcher::new(transport),
            policy,
        ));
        let booking = Arc::new(AppointmentBookingService::new(directory.clone(), coordinator.clone()));
        let jobs = Arc::new(SlotReleaseJobs::new(coordinator.clone(), "https://clinic.example"));
        let checker = OfferConsistencyChecker::new(appointments.clone(), waitlist_store.clone());

        Self {
            now: Utc::now(),
            directory,
            waitlist_store,
            waitlist,
            appointments,
            gateway,
            coordinator,
            booking,
            jobs,
            checker,
            specialty_id,
            other_specialty_id,
            doctor_id,
            facility_id,
            inactive_doctor_id,
        }
    }

    // ==========================================================================
    // DIRECTORY
    // ==========================================================================

    pub async fn patient(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.directory
            .upsert_patient(Patient {
                id,
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                phone: None,
            })
            .await;
        id
    }

    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    pub fn request(&self, patient_id: Uuid, scheduled_at: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id,
            doctor_id: self.doctor_id,
            facility_id: self.facility_id,
            scheduled_at,
            notes: None,
        }
    }

    /// Pending appointment `starts_in` after the harness clock.
    pub async fn pending(&self, starts_in: Duration) -> Appointment {
        let patient_id = self.patient("Ana").await;
        self.booking
            .book_appointment_at(self.request(patient_id, self.now + starts_in), self.now)
            .await
            .expect("Failed to book appointment")
    }

    /// Confirmed appointment `starts_in` after the harness clock.
    pub async fn scheduled(&self, starts_in: Duration) -> Appointment {
        let appointment = self.pending(starts_in).await;
        self.booking
            .confirm_appointment_at(appointment.id, self.now)
            .await
            .expect("Failed to confirm appointment")
    }

    /// Released appointment with no open offer.
    pub async fn released(&self, starts_in: Duration) -> Appointment {
        let appointment = self.scheduled(starts_in).await;
        let released = self
            .booking
            .withdraw_appointment_at(appointment.id, self.now)
            .await
            .expect("Failed to withdraw appointment");
        assert!(!released.has_open_offer(), "waitlist should be empty when releasing");
        released
    }

    pub async fn appointment(&self, id: Uuid) -> Appointment {
        self.booking.get_appointment(id).await.expect("Appointment should exist")
    }

    // ==========================================================================
    // WAITLIST
    // ==========================================================================

    /// Active entry inserted directly so the registration instant can be set.
    pub async fn waiting(&self, priority: i32, registered_minutes_ago: i64, exact: bool) -> WaitlistEntry {
        let patient_id = self.patient("Bruno").await;
        let request = RegisterWaitlistRequest {
            patient_id,
            specialty_id: self.specialty_id,
            doctor_id: exact.then_some(self.doctor_id),
            facility_id: exact.then_some(self.facility_id),
            priority: Some(priority),
        };
        let entry = WaitlistEntry::new(&request, self.now - Duration::minutes(registered_minutes_ago));
        self.waitlist_store.insert(entry).await.expect("Failed to seed waitlist entry")
    }

    pub async fn entry(&self, id: Uuid) -> WaitlistEntry {
        self.waitlist.get(id).await.expect("Waitlist entry should exist")
    }

    pub async fn assert_consistent(&self) {
        let report = self.checker.check().await.expect("Consistency check failed to run");
        assert!(report.is_consistent(), "offer links inconsistent: {:?}", report.violations);
    }
}
