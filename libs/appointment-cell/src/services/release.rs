// libs/appointment-cell/src/services/release.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use directory_cell::DirectoryLookup;
use notification_cell::{NotificationDispatcher, NotificationMessage};
use shared_config::SlotReleasePolicy;
use shared_database::{KeyedLockGuard, KeyedLocks};
use waitlist_cell::{SlotCriteria, WaitlistEntry, WaitlistError, WaitlistMatcher, WaitlistStatus, WaitlistStore};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, OfferTimeoutOutcome};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::AppointmentStore;

/// How many times a release re-runs the matcher when the chosen entry changes
/// underneath it.
const MAX_OFFER_ATTEMPTS: usize = 3;

enum OfferAttempt {
    Offered(Appointment),
    /// The candidate entry was written by someone else first; nothing changed.
    EntryChanged(Appointment),
}

/// Human-readable pieces of a slot, for notification text.
pub(crate) struct SlotDescription {
    pub patient_name: String,
    pub doctor_name: String,
    pub facility_name: String,
    pub date: String,
    pub time: String,
}

/// Offers made while appointment locks were held. Delivered by `deliver`
/// once the locks are released, so a slow gateway never holds up the slot.
#[derive(Default)]
pub(crate) struct Outbox {
    offers: Vec<(Appointment, WaitlistEntry)>,
}

/// Drives a freed slot through release, offer, acceptance and offer timeout.
///
/// Every operation on an appointment runs while holding that appointment's
/// lock, and every write is version-checked. An `accept_offer` racing the
/// timeout job therefore either wins outright or finds the offer gone and
/// fails with `InvalidState`.
pub struct SlotReleaseCoordinator {
    appointments: Arc<dyn AppointmentStore>,
    waitlist: Arc<dyn WaitlistStore>,
    matcher: WaitlistMatcher,
    directory: Arc<dyn DirectoryLookup>,
    notifier: NotificationDispatcher,
    lifecycle: AppointmentLifecycleService,
    policy: SlotReleasePolicy,
    appointment_locks: KeyedLocks,
}

impl SlotReleaseCoordinator {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        waitlist: Arc<dyn WaitlistStore>,
        directory: Arc<dyn DirectoryLookup>,
        notifier: NotificationDispatcher,
        policy: SlotReleasePolicy,
    ) -> Self {
        Self {
            matcher: WaitlistMatcher::new(Arc::clone(&waitlist)),
            appointments,
            waitlist,
            directory,
            notifier,
            lifecycle: AppointmentLifecycleService::new(),
            policy,
            appointment_locks: KeyedLocks::new(),
        }
    }

    pub fn appointments(&self) -> Arc<dyn AppointmentStore> {
        Arc::clone(&self.appointments)
    }

    pub fn waitlist(&self) -> Arc<dyn WaitlistStore> {
        Arc::clone(&self.waitlist)
    }

    pub fn policy(&self) -> &SlotReleasePolicy {
        &self.policy
    }

    pub(crate) fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    /// Serialises every writer of one appointment.
    pub(crate) async fn lock_appointment(&self, appointment_id: Uuid) -> KeyedLockGuard {
        self.appointment_locks.acquire(appointment_id).await
    }

    pub(crate) async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    async fn load_entry(&self, entry_id: Uuid) -> Result<WaitlistEntry, AppointmentError> {
        self.waitlist
            .get(entry_id)
            .await?
            .ok_or(AppointmentError::WaitlistEntryNotFound(entry_id))
    }

    // ==========================================================================
    // RELEASE
    // ==========================================================================

    pub async fn release_slot(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.release_slot_at(appointment_id, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn release_slot_at(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.release_slot_guarded(appointment_id, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn release_slot_guarded(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock_appointment(appointment_id).await;
        let appointment = self.load(appointment_id).await?;
        self.release_locked(appointment, now, outbox).await
    }

    /// Release an appointment that missed its confirmation deadline. Returns
    /// `false` when, under the lock, it turns out to be confirmed or changed.
    pub async fn release_if_unconfirmed_at(
        &self,
        appointment_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.release_overdue_guarded(appointment_id, cutoff, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn release_overdue_guarded(
        &self,
        appointment_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<bool, AppointmentError> {
        let _guard = self.lock_appointment(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if !self.lifecycle.is_confirmation_overdue(&appointment, cutoff) {
            debug!("Appointment {} no longer awaiting confirmation ({})", appointment.id, appointment.status);
            return Ok(false);
        }

        info!("Appointment {} was not confirmed by {}, releasing its slot",
              appointment.id, appointment.confirmation_deadline);
        self.release_locked(appointment, now, outbox).await?;
        Ok(true)
    }

    /// Caller must hold the appointment lock and deliver `outbox` after
    /// releasing it.
    pub(crate) async fn release_locked(
        &self,
        mut appointment: Appointment,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Released)?;

        appointment.status = AppointmentStatus::Released;
        appointment.clear_offer();
        appointment.lapsed_offer_entry_ids.clear();
        appointment.updated_at = now;
        let appointment = self.appointments.update(appointment).await?;

        info!("Appointment {} released (doctor {} at {})",
              appointment.id, appointment.doctor_id, appointment.scheduled_at);

        self.offer_next(appointment, now, None, outbox).await
    }

    // ==========================================================================
    // OFFER
    // ==========================================================================

    pub async fn offer_slot(&self, appointment_id: Uuid, entry_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.offer_slot_at(appointment_id, entry_id, Utc::now()).await
    }

    /// Offer a released, unoffered appointment to a specific active entry.
    #[instrument(skip(self))]
    pub async fn offer_slot_at(
        &self,
        appointment_id: Uuid,
        entry_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.offer_slot_guarded(appointment_id, entry_id, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn offer_slot_guarded(
        &self,
        appointment_id: Uuid,
        entry_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock_appointment(appointment_id).await;
        let appointment = self.load(appointment_id).await?;
        let entry = self.load_entry(entry_id).await?;

        if appointment.status != AppointmentStatus::Released {
            return Err(AppointmentError::InvalidState(format!(
                "only released appointments can be offered (status is {})",
                appointment.status
            )));
        }
        if appointment.has_open_offer() {
            return Err(AppointmentError::InvalidState(
                "appointment already has an open offer".to_string(),
            ));
        }
        if entry.status != WaitlistStatus::Active {
            return Err(AppointmentError::InvalidState(format!(
                "waitlist entry {} is {}",
                entry.id, entry.status
            )));
        }

        match self.offer_locked(appointment, entry, now, outbox).await? {
            OfferAttempt::Offered(appointment) => Ok(appointment),
            OfferAttempt::EntryChanged(_) => Err(AppointmentError::ConcurrentModification(format!(
                "waitlist entry {} changed while the offer was being made",
                entry_id
            ))),
        }
    }

    /// Match the released appointment against the waitlist and offer it to
    /// the best candidate. `skip` is an entry whose offer on this slot just
    /// lapsed: if the matcher picks it again the slot is left unoffered.
    async fn offer_next(
        &self,
        appointment: Appointment,
        now: DateTime<Utc>,
        skip: Option<Uuid>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        self.offer_next_excluding(appointment, now, skip, &[], outbox).await
    }

    async fn offer_next_excluding(
        &self,
        mut appointment: Appointment,
        now: DateTime<Utc>,
        skip: Option<Uuid>,
        excluded: &[Uuid],
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        let criteria = match self.slot_criteria(&appointment).await {
            Ok(criteria) => criteria,
            Err(e) => {
                warn!("Cannot match released appointment {} against the waitlist: {}", appointment.id, e);
                return Ok(appointment);
            }
        };

        for attempt in 1..=MAX_OFFER_ATTEMPTS {
            let candidate = match self.matcher.find_candidate_excluding(&criteria, excluded).await? {
                Some(candidate) => candidate,
                None => {
                    info!("No waitlist candidate for appointment {}; slot stays released", appointment.id);
                    return Ok(appointment);
                }
            };

            if skip == Some(candidate.entry.id) {
                info!("Entry {} is still first in line for appointment {} after its offer lapsed; not re-offering",
                      candidate.entry.id, appointment.id);
                return Ok(appointment);
            }

            debug!("Offering appointment {} to entry {} ({:?} match)",
                   appointment.id, candidate.entry.id, candidate.tier);

            match self.offer_locked(appointment, candidate.entry, now, outbox).await? {
                OfferAttempt::Offered(offered) => return Ok(offered),
                OfferAttempt::EntryChanged(unchanged) => {
                    warn!("Waitlist entry changed while offering appointment {} (attempt {}/{})",
                          unchanged.id, attempt, MAX_OFFER_ATTEMPTS);
                    appointment = unchanged;
                }
            }
        }

        warn!("Giving up offering appointment {} after {} attempts", appointment.id, MAX_OFFER_ATTEMPTS);
        Ok(appointment)
    }

    async fn offer_locked(
        &self,
        mut appointment: Appointment,
        mut entry: WaitlistEntry,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<OfferAttempt, AppointmentError> {
        entry.mark_offered(appointment.id, now);
        let entry = match self.waitlist.update(entry).await {
            Ok(entry) => entry,
            Err(WaitlistError::ConcurrentModification(_)) => return Ok(OfferAttempt::EntryChanged(appointment)),
            Err(e) => return Err(e.into()),
        };

        appointment.attach_offer(entry.id, now);
        let appointment = match self.appointments.update(appointment).await {
            Ok(appointment) => appointment,
            Err(e) => {
                error!("Failed to record offer to entry {} on appointment: {}", entry.id, e);
                self.revert_entry(entry).await;
                return Err(e);
            }
        };

        info!("Appointment {} offered to waitlist entry {} (patient {})",
              appointment.id, entry.id, entry.patient_id);

        outbox.offers.push((appointment.clone(), entry));
        Ok(OfferAttempt::Offered(appointment))
    }

    /// Send the offer notifications collected in `outbox`. Must be called
    /// without any appointment lock held.
    pub(crate) async fn deliver(&self, outbox: Outbox) {
        for (appointment, entry) in outbox.offers {
            self.notify_offer(&appointment, &entry).await;
        }
    }

    async fn notify_offer(&self, appointment: &Appointment, entry: &WaitlistEntry) {
        let slot = self.describe_slot(appointment, entry.patient_id).await;
        let mensagem = format!(
            "Hello {}, a slot has opened up on {} at {} with {} at {}. \
             Accept it within {} minutes to secure the appointment.",
            slot.patient_name,
            slot.date,
            slot.time,
            slot.doctor_name,
            slot.facility_name,
            self.policy.offer_timeout.num_minutes()
        );

        let message = NotificationMessage::slot_offer(entry.patient_id, appointment.id, entry.id, mensagem);
        self.notifier.dispatch(&message).await;
    }

    // ==========================================================================
    // ACCEPT
    // ==========================================================================

    pub async fn accept_offer(&self, appointment_id: Uuid, entry_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.accept_offer_at(appointment_id, entry_id, Utc::now()).await
    }

    /// Reassign a released slot to a waitlist entry that is awaiting a
    /// response. The entry does not have to be the one this slot was offered
    /// to: the slot's own offer goes back to the queue, and the entry's offer
    /// on any other slot is withdrawn and that slot re-offered.
    #[instrument(skip(self))]
    pub async fn accept_offer_at(
        &self,
        appointment_id: Uuid,
        entry_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.load(appointment_id).await?;

        let mut outbox = Outbox::default();
        let result = self.accept_guarded(appointment_id, entry_id, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn accept_guarded(
        &self,
        appointment_id: Uuid,
        entry_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        for attempt in 1..=MAX_OFFER_ATTEMPTS {
            let entry = self.load_entry(entry_id).await?;
            let elsewhere = entry.offered_appointment_id.filter(|id| *id != appointment_id);

            let mut keys = vec![appointment_id];
            keys.extend(elsewhere);
            let _guards = self.appointment_locks.acquire_all(&keys).await;

            // The entry may have moved to another slot while we waited.
            let entry = self.load_entry(entry_id).await?;
            if entry.offered_appointment_id.filter(|id| *id != appointment_id) != elsewhere {
                debug!("Entry {} changed while locking (attempt {}/{})", entry_id, attempt, MAX_OFFER_ATTEMPTS);
                continue;
            }

            return self.accept_locked(appointment_id, entry, elsewhere, now, outbox).await;
        }

        Err(AppointmentError::ConcurrentModification(format!(
            "waitlist entry {} kept changing while accepting appointment {}",
            entry_id, appointment_id
        )))
    }

    /// Caller must hold the locks of `appointment_id` and `elsewhere`.
    async fn accept_locked(
        &self,
        appointment_id: Uuid,
        entry: WaitlistEntry,
        elsewhere: Option<Uuid>,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Released {
            warn!("Offer acceptance for appointment {} rejected: status is {}", appointment.id, appointment.status);
            return Err(AppointmentError::InvalidState("slot no longer available".to_string()));
        }

        if entry.status != WaitlistStatus::AwaitingResponse {
            warn!("Offer acceptance by entry {} rejected: entry is {}", entry.id, entry.status);
            return Err(AppointmentError::InvalidState("offer no longer available".to_string()));
        }

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Scheduled)?;

        let displaced = appointment.offered_waitlist_entry_id.filter(|id| *id != entry.id);

        let previous = entry.clone();
        let mut entry = entry;
        entry.mark_attended();
        let entry = self.waitlist.update(entry).await?;

        appointment.patient_id = entry.patient_id;
        appointment.status = AppointmentStatus::Scheduled;
        appointment.confirmed_at = Some(now);
        appointment.clear_offer();
        appointment.lapsed_offer_entry_ids.clear();
        appointment.updated_at = now;

        let appointment = match self.appointments.update(appointment).await {
            Ok(appointment) => appointment,
            Err(e) => {
                error!("Failed to reassign appointment {}: {}", appointment_id, e);
                self.restore_entry(previous, entry.version).await;
                return Err(e);
            }
        };

        info!("Appointment {} reassigned to patient {} from waitlist entry {}",
              appointment.id, appointment.patient_id, entry.id);

        if let Some(displaced_id) = displaced {
            if let Err(e) = self.return_entry_to_queue(displaced_id, appointment.id).await {
                error!("Entry {} still references reassigned appointment {}: {}", displaced_id, appointment.id, e);
            }
        }

        if let Some(other_id) = elsewhere {
            if let Err(e) = self.withdraw_accepted_offer(other_id, entry.id, now, outbox).await {
                error!("Appointment {} still references accepted entry {}: {}", other_id, entry.id, e);
            }
        }

        Ok(appointment)
    }

    /// `entry_id` accepted a different slot: clear its offer on
    /// `appointment_id` and give that slot to the next in line.
    async fn withdraw_accepted_offer(
        &self,
        appointment_id: Uuid,
        entry_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<(), AppointmentError> {
        let mut appointment = self.load(appointment_id).await?;
        if appointment.offered_waitlist_entry_id != Some(entry_id) {
            return Ok(());
        }

        appointment.clear_offer();
        appointment.updated_at = now;
        let appointment = self.appointments.update(appointment).await?;
        info!("Offer of appointment {} withdrawn: entry {} accepted another slot", appointment.id, entry_id);

        if appointment.status == AppointmentStatus::Released && appointment.scheduled_at > now {
            let excluded = appointment.lapsed_offer_entry_ids.clone();
            self.offer_next_excluding(appointment, now, None, &excluded, outbox).await?;
        }
        Ok(())
    }

    // ==========================================================================
    // OFFER TIMEOUT
    // ==========================================================================

    pub async fn process_offer_timeout(&self, appointment_id: Uuid) -> Result<OfferTimeoutOutcome, AppointmentError> {
        self.process_offer_timeout_at(appointment_id, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn process_offer_timeout_at(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OfferTimeoutOutcome, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.offer_timeout_guarded(appointment_id, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn offer_timeout_guarded(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<OfferTimeoutOutcome, AppointmentError> {
        let _guard = self.lock_appointment(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let Some(entry_id) = appointment.offered_waitlist_entry_id else {
            return Ok(OfferTimeoutOutcome::NoOffer);
        };

        if appointment.status != AppointmentStatus::Released {
            warn!("Appointment {} is {} but still references entry {}", appointment.id, appointment.status, entry_id);
            return Ok(OfferTimeoutOutcome::NoOffer);
        }

        let entry = self.waitlist.get(entry_id).await?;
        let offered_at = entry
            .as_ref()
            .and_then(|entry| entry.offer_date)
            .or(appointment.offered_at);

        if let Some(offered_at) = offered_at {
            if !self.lifecycle.is_offer_expired(offered_at, self.policy.offer_timeout, now) {
                debug!("Offer of appointment {} to entry {} still open", appointment.id, entry_id);
                return Ok(OfferTimeoutOutcome::WithinWindow);
            }
        }

        match entry {
            Some(mut entry) if entry.offered_appointment_id == Some(appointment.id) => {
                entry.revert_offer();
                self.waitlist.update(entry).await?;
            }
            Some(entry) => warn!("Entry {} ({}) no longer points at appointment {}",
                                 entry.id, entry.status, appointment.id),
            None => warn!("Offered entry {} no longer exists", entry_id),
        }

        // Entries that lapsed earlier in this release are passed over; the one
        // that just lapsed keeps the first-in-line skip below.
        let earlier_lapses = appointment.lapsed_offer_entry_ids.clone();
        appointment.clear_offer();
        appointment.record_lapsed_offer(entry_id);
        appointment.updated_at = now;
        let appointment = match self.appointments.update(appointment).await {
            Ok(appointment) => appointment,
            Err(e) => {
                error!("Entry {} returned to the queue but appointment {} kept its offer: {}",
                       entry_id, appointment_id, e);
                return Err(e);
            }
        };

        info!("Offer of appointment {} to entry {} expired", appointment.id, entry_id);

        let appointment = self
            .offer_next_excluding(appointment, now, Some(entry_id), &earlier_lapses, outbox)
            .await?;
        Ok(OfferTimeoutOutcome::Expired {
            reoffered_to: appointment.offered_waitlist_entry_id,
        })
    }

    /// Give a released, unoffered future appointment another pass through the
    /// matcher. Entries whose offer on this slot already lapsed are passed
    /// over. Returns whether an offer was made.
    pub async fn reoffer_released_at(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppointmentError> {
        let mut outbox = Outbox::default();
        let result = self.reoffer_guarded(appointment_id, now, &mut outbox).await;
        self.deliver(outbox).await;
        result
    }

    async fn reoffer_guarded(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<bool, AppointmentError> {
        let _guard = self.lock_appointment(appointment_id).await;
        let appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Released
            || appointment.has_open_offer()
            || appointment.scheduled_at <= now
        {
            return Ok(false);
        }

        let excluded = appointment.lapsed_offer_entry_ids.clone();
        let appointment = self
            .offer_next_excluding(appointment, now, None, &excluded, outbox)
            .await?;
        Ok(appointment.has_open_offer())
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    /// Withdraw the open offer on `appointment`, returning the entry to the
    /// queue. The appointment itself is not persisted. Caller must hold the
    /// appointment lock.
    pub(crate) async fn clear_offer_locked(&self, appointment: &mut Appointment) -> Result<(), AppointmentError> {
        if let Some(entry_id) = appointment.offered_waitlist_entry_id {
            self.return_entry_to_queue(entry_id, appointment.id).await?;
        }

        appointment.clear_offer();
        Ok(())
    }

    /// Put an entry awaiting a response on `appointment_id` back to `Active`.
    /// Entries that moved on are left alone.
    async fn return_entry_to_queue(&self, entry_id: Uuid, appointment_id: Uuid) -> Result<(), AppointmentError> {
        if let Some(mut entry) = self.waitlist.get(entry_id).await? {
            if entry.status == WaitlistStatus::AwaitingResponse
                && entry.offered_appointment_id == Some(appointment_id)
            {
                entry.revert_offer();
                self.waitlist.update(entry).await?;
                info!("Waitlist entry {} returned to the queue", entry_id);
            }
        }
        Ok(())
    }

    async fn slot_criteria(&self, appointment: &Appointment) -> Result<SlotCriteria, AppointmentError> {
        let doctor = self.directory.find_doctor(appointment.doctor_id).await?;

        Ok(SlotCriteria {
            specialty_id: doctor.specialty_id,
            doctor_id: appointment.doctor_id,
            facility_id: appointment.facility_id,
        })
    }

    pub(crate) async fn describe_slot(&self, appointment: &Appointment, patient_id: Uuid) -> SlotDescription {
        let patient_name = match self.directory.find_patient(patient_id).await {
            Ok(patient) => patient.name,
            Err(_) => "patient".to_string(),
        };
        let doctor_name = match self.directory.find_doctor(appointment.doctor_id).await {
            Ok(doctor) => doctor.name,
            Err(_) => format!("doctor {}", appointment.doctor_id),
        };
        let facility_name = match self.directory.find_facility(appointment.facility_id).await {
            Ok(facility) => facility.name,
            Err(_) => format!("facility {}", appointment.facility_id),
        };

        SlotDescription {
            patient_name,
            doctor_name,
            facility_name,
            date: appointment.scheduled_at.format("%d/%m/%Y").to_string(),
            time: appointment.scheduled_at.format("%H:%M").to_string(),
        }
    }

    async fn revert_entry(&self, mut entry: WaitlistEntry) {
        let entry_id = entry.id;
        entry.revert_offer();
        if let Err(e) = self.waitlist.update(entry).await {
            error!("Failed to return waitlist entry {} to the queue: {}", entry_id, e);
        }
    }

    async fn restore_entry(&self, mut previous: WaitlistEntry, current_version: u64) {
        let entry_id = previous.id;
        previous.version = current_version;
        if let Err(e) = self.waitlist.update(previous).await {
            error!("Failed to restore waitlist entry {}: {}", entry_id, e);
        }
    }
}
