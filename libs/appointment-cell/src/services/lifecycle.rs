// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Owns which status changes an appointment may go through. Pure: it never
/// touches a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidState(format!(
                "cannot move from {} to {}",
                current_status, new_status
            )));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::PendingConfirmation => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Released, // Confirmation deadline elapsed
                AppointmentStatus::Cancelled,
                AppointmentStatus::Withdrawn,
            ],
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Withdrawn,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Released => vec![
                AppointmentStatus::Scheduled, // Offer accepted
                AppointmentStatus::Cancelled,
                AppointmentStatus::Withdrawn,
            ],
            // The previous occupant is gone; only the slot release moves on from here.
            AppointmentStatus::Withdrawn => vec![AppointmentStatus::Released],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Bookings must be strictly in the future.
    pub fn check_bookable(
        &self,
        scheduled_at: DateTime<Utc>,
        current_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if scheduled_at <= current_time {
            return Err(AppointmentError::InvalidInput(format!(
                "scheduled time {} is not in the future",
                scheduled_at
            )));
        }
        Ok(())
    }

    pub fn check_confirmable(
        &self,
        appointment: &Appointment,
        current_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if appointment.status != AppointmentStatus::PendingConfirmation {
            return Err(AppointmentError::InvalidState(format!(
                "only pending appointments can be confirmed (status is {})",
                appointment.status
            )));
        }

        if current_time > appointment.confirmation_deadline {
            return Err(AppointmentError::Expired(format!(
                "appointment {} had to be confirmed by {}",
                appointment.id, appointment.confirmation_deadline
            )));
        }

        Ok(())
    }

    pub fn check_cancellable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        match appointment.status {
            AppointmentStatus::Completed => Err(AppointmentError::InvalidState(
                "completed appointments cannot be cancelled".to_string(),
            )),
            status => self.validate_status_transition(status, AppointmentStatus::Cancelled),
        }
    }

    pub fn check_withdrawable(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        match appointment.status {
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => Err(AppointmentError::InvalidState(
                format!("{} appointments cannot be withdrawn", appointment.status),
            )),
            status => self.validate_status_transition(status, AppointmentStatus::Withdrawn),
        }
    }

    /// Unconfirmed pending appointment whose deadline is at or before `cutoff`.
    pub fn is_confirmation_overdue(&self, appointment: &Appointment, cutoff: DateTime<Utc>) -> bool {
        appointment.status == AppointmentStatus::PendingConfirmation
            && appointment.confirmed_at.is_none()
            && appointment.confirmation_deadline <= cutoff
    }

    /// An offer made at `offered_at` is still open while `now <= offered_at + timeout`.
    pub fn is_offer_expired(
        &self,
        offered_at: DateTime<Utc>,
        timeout: Duration,
        current_time: DateTime<Utc>,
    ) -> bool {
        current_time > offered_at + timeout
    }

    pub fn is_reminder_due(
        &self,
        appointment: &Appointment,
        window: Duration,
        current_time: DateTime<Utc>,
    ) -> bool {
        matches!(
            appointment.status,
            AppointmentStatus::PendingConfirmation | AppointmentStatus::Scheduled
        ) && !appointment.reminder_sent
            && appointment.scheduled_at >= current_time
            && appointment.scheduled_at <= current_time + window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookAppointmentRequest;
    use uuid::Uuid;

    fn pending(now: DateTime<Utc>, starts_in: Duration) -> Appointment {
        let request = BookAppointmentRequest {
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            scheduled_at: now + starts_in,
            notes: None,
        };
        Appointment::new(&request, Duration::minutes(30), now)
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Cancelled).is_empty());
        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Completed).is_empty());
        assert_eq!(
            lifecycle.get_valid_transitions(AppointmentStatus::Withdrawn),
            vec![AppointmentStatus::Released]
        );
    }

    #[test]
    fn confirm_rejected_after_deadline() {
        let lifecycle = AppointmentLifecycleService::new();
        let now = Utc::now();
        let appointment = pending(now, Duration::hours(1));

        assert!(lifecycle.check_confirmable(&appointment, now).is_ok());
        assert!(lifecycle.check_confirmable(&appointment, appointment.confirmation_deadline).is_ok());
        assert!(matches!(
            lifecycle.check_confirmable(&appointment, appointment.confirmation_deadline + Duration::seconds(1)),
            Err(AppointmentError::Expired(_))
        ));
    }

    #[test]
    fn cancel_and_withdraw_guards() {
        let lifecycle = AppointmentLifecycleService::new();
        let mut appointment = pending(Utc::now(), Duration::hours(5));

        appointment.status = AppointmentStatus::Completed;
        assert!(lifecycle.check_cancellable(&appointment).is_err());
        assert!(lifecycle.check_withdrawable(&appointment).is_err());

        appointment.status = AppointmentStatus::Cancelled;
        assert!(lifecycle.check_withdrawable(&appointment).is_err());

        appointment.status = AppointmentStatus::Released;
        assert!(lifecycle.check_cancellable(&appointment).is_ok());
        assert!(lifecycle.check_withdrawable(&appointment).is_ok());
    }

    #[test]
    fn offer_window_is_inclusive() {
        let lifecycle = AppointmentLifecycleService::new();
        let offered_at = Utc::now();
        let timeout = Duration::hours(2);

        assert!(!lifecycle.is_offer_expired(offered_at, timeout, offered_at + timeout));
        assert!(lifecycle.is_offer_expired(offered_at, timeout, offered_at + timeout + Duration::seconds(1)));
    }
}
