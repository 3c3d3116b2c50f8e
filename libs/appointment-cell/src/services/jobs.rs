// libs/appointment-cell/src/services/jobs.rs
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use notification_cell::{NotificationKind, NotificationMessage};
use shared_config::JobSchedule;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, JobReport, OfferTimeoutOutcome};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::release::SlotReleaseCoordinator;
use crate::services::store::AppointmentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    ConfirmationExpiry,
    Reminder,
    OfferTimeout,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::ConfirmationExpiry => write!(f, "confirmation-expiry"),
            JobKind::Reminder => write!(f, "reminder"),
            JobKind::OfferTimeout => write!(f, "offer-timeout"),
        }
    }
}

/// One pass of each time-driven job. A failure on one appointment is logged
/// and counted; it never stops the rest of the batch.
pub struct SlotReleaseJobs {
    appointments: Arc<dyn AppointmentStore>,
    coordinator: Arc<SlotReleaseCoordinator>,
    lifecycle: AppointmentLifecycleService,
    public_base_url: String,
}

impl SlotReleaseJobs {
    pub fn new(coordinator: Arc<SlotReleaseCoordinator>, public_base_url: impl Into<String>) -> Self {
        Self {
            appointments: coordinator.appointments(),
            coordinator,
            lifecycle: AppointmentLifecycleService::new(),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn run(&self, kind: JobKind) -> Result<JobReport, AppointmentError> {
        self.run_at(kind, Utc::now()).await
    }

    pub async fn run_at(&self, kind: JobKind, now: DateTime<Utc>) -> Result<JobReport, AppointmentError> {
        match kind {
            JobKind::ConfirmationExpiry => self.run_confirmation_expiry_at(now).await,
            JobKind::Reminder => self.run_reminders_at(now).await,
            JobKind::OfferTimeout => self.run_offer_timeouts_at(now).await,
        }
    }

    // ==========================================================================
    // CONFIRMATION EXPIRY
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn run_confirmation_expiry_at(&self, now: DateTime<Utc>) -> Result<JobReport, AppointmentError> {
        let cutoff = now + self.coordinator.policy().confirmation_expiry_grace;
        let overdue = self.appointments.find_unconfirmed_past(cutoff).await?;

        let mut report = JobReport { examined: overdue.len(), ..Default::default() };

        for appointment in overdue {
            match self.coordinator.release_if_unconfirmed_at(appointment.id, cutoff, now).await {
                Ok(true) => report.processed += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to release unconfirmed appointment {}: {}", appointment.id, e);
                }
            }
        }

        info!("Confirmation-expiry pass: {} overdue, {} released, {} failed",
              report.examined, report.processed, report.failed);
        Ok(report)
    }

    // ==========================================================================
    // REMINDERS
    // ==========================================================================

    #[instrument(skip(self))]
    pub async fn run_reminders_at(&self, now: DateTime<Utc>) -> Result<JobReport, AppointmentError> {
        let until = now + self.coordinator.policy().reminder_window;
        let due = self.appointments.find_due_for_reminder(now, until).await?;

        let mut report = JobReport { examined: due.len(), ..Default::default() };

        for appointment in due {
            match self.send_reminder(appointment.id, now).await {
                Ok(true) => report.processed += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to send reminder for appointment {}: {}", appointment.id, e);
                }
            }
        }

        if report.examined > 0 {
            info!("Reminder pass: {} due, {} sent, {} failed", report.examined, report.processed, report.failed);
        }
        Ok(report)
    }

    async fn send_reminder(&self, appointment_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppointmentError> {
        let Some(message) = self.claim_reminder(appointment_id, now).await? else {
            return Ok(false);
        };

        if !self.coordinator.notifier().dispatch(&message).await {
            warn!("Reminder for appointment {} was not delivered; it will not be retried", appointment_id);
        }
        Ok(true)
    }

    /// Mark the reminder sent under the appointment lock and return the
    /// message to deliver once the lock is released.
    async fn claim_reminder(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationMessage>, AppointmentError> {
        let _guard = self.coordinator.lock_appointment(appointment_id).await;
        let mut appointment = self.coordinator.load(appointment_id).await?;

        let window = self.coordinator.policy().reminder_window;
        if !self.lifecycle.is_reminder_due(&appointment, window, now) {
            debug!("Reminder for appointment {} no longer due", appointment_id);
            return Ok(None);
        }

        let message = self.reminder_message(&appointment).await;

        appointment.reminder_sent = true;
        appointment.updated_at = now;
        self.appointments.update(appointment).await?;

        Ok(Some(message))
    }

    async fn reminder_message(&self, appointment: &Appointment) -> NotificationMessage {
        let slot = self.coordinator.describe_slot(appointment, appointment.patient_id).await;

        if appointment.status == AppointmentStatus::PendingConfirmation {
            let link = format!(
                "{}/appointments/{}/confirm",
                self.public_base_url.trim_end_matches('/'),
                appointment.id
            );
            let mensagem = format!(
                "Hello {}, your appointment with {} at {} on {} at {} is awaiting confirmation. \
                 Please confirm by {}: {}",
                slot.patient_name,
                slot.doctor_name,
                slot.facility_name,
                slot.date,
                slot.time,
                appointment.confirmation_deadline.format("%d/%m/%Y %H:%M"),
                link
            );
            NotificationMessage::appointment(
                NotificationKind::ConfirmationRequest,
                appointment.patient_id,
                appointment.id,
                mensagem,
            )
        } else {
            let mensagem = format!(
                "Hello {}, this is a reminder of your appointment with {} at {} on {} at {}.",
                slot.patient_name, slot.doctor_name, slot.facility_name, slot.date, slot.time
            );
            NotificationMessage::appointment(NotificationKind::Reminder, appointment.patient_id, appointment.id, mensagem)
        }
    }

    // ==========================================================================
    // OFFER TIMEOUT
    // ==========================================================================

    /// Expire lapsed offers, then give released slots that started the pass
    /// without an offer another chance against the waitlist.
    #[instrument(skip(self))]
    pub async fn run_offer_timeouts_at(&self, now: DateTime<Utc>) -> Result<JobReport, AppointmentError> {
        let stranded = if self.coordinator.policy().released_slot_rescan {
            self.appointments.find_released_without_offer(now).await?
        } else {
            Vec::new()
        };
        let offered = self.appointments.find_with_open_offer().await?;

        let mut report = JobReport { examined: offered.len() + stranded.len(), ..Default::default() };

        for appointment in offered {
            match self.coordinator.process_offer_timeout_at(appointment.id, now).await {
                Ok(OfferTimeoutOutcome::Expired { .. }) => report.processed += 1,
                Ok(_) => {}
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to process offer timeout for appointment {}: {}", appointment.id, e);
                }
            }
        }

        for appointment in stranded {
            match self.coordinator.reoffer_released_at(appointment.id, now).await {
                Ok(true) => report.processed += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to re-offer released appointment {}: {}", appointment.id, e);
                }
            }
        }

        info!("Offer-timeout pass: {} examined, {} changed, {} failed",
              report.examined, report.processed, report.failed);
        Ok(report)
    }
}

const MIN_JOB_INTERVAL: Duration = Duration::from_secs(1);

/// Runs each job on its own timer until shut down.
pub struct SlotReleaseScheduler {
    jobs: Arc<SlotReleaseJobs>,
    schedule: JobSchedule,
    shutdown: watch::Sender<bool>,
}

impl SlotReleaseScheduler {
    pub fn new(jobs: Arc<SlotReleaseJobs>, schedule: JobSchedule) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { jobs, schedule, shutdown }
    }

    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting slot release jobs");

        vec![
            self.spawn_job(JobKind::ConfirmationExpiry, self.schedule.confirmation_expiry_every),
            self.spawn_job(JobKind::Reminder, self.schedule.reminder_every),
            self.spawn_job(JobKind::OfferTimeout, self.schedule.offer_timeout_every),
        ]
    }

    pub fn shutdown(&self) {
        info!("Stopping slot release jobs");
        self.shutdown.send_replace(true);
    }

    fn spawn_job(self: &Arc<Self>, kind: JobKind, every: Duration) -> JoinHandle<()> {
        // tokio intervals cannot tick every zero seconds.
        let every = if every.is_zero() {
            warn!("{} job interval is zero, running every {:?} instead", kind, MIN_JOB_INTERVAL);
            MIN_JOB_INTERVAL
        } else {
            every
        };
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.job_loop(kind, every).await })
    }

    async fn job_loop(&self, kind: JobKind, every: Duration) {
        debug!("{} job running every {:?}", kind, every);

        let mut shutdown = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.jobs.run(kind).await {
                error!("{} job pass failed: {}", kind, e);
            }
        }

        debug!("{} job stopped", kind);
    }
}
