// libs/appointment-cell/src/services/consistency.rs
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use waitlist_cell::{WaitlistStatus, WaitlistStore};

use crate::models::{AppointmentError, AppointmentStatus, ConsistencyReport, OfferViolation};
use crate::services::store::AppointmentStore;

/// Audits the two-sided offer link between appointments and waitlist entries.
///
/// An appointment points at an entry iff it is `Released` with an open offer,
/// and that entry must be `AwaitingResponse` pointing straight back.
pub struct OfferConsistencyChecker {
    appointments: Arc<dyn AppointmentStore>,
    waitlist: Arc<dyn WaitlistStore>,
}

impl OfferConsistencyChecker {
    pub fn new(appointments: Arc<dyn AppointmentStore>, waitlist: Arc<dyn WaitlistStore>) -> Self {
        Self { appointments, waitlist }
    }

    #[instrument(skip(self))]
    pub async fn check(&self) -> Result<ConsistencyReport, AppointmentError> {
        let appointments = self.appointments.list_all().await?;
        let entries = self.waitlist.list_all().await?;

        let appointments_by_id: HashMap<Uuid, _> = appointments.iter().map(|a| (a.id, a)).collect();
        let entries_by_id: HashMap<Uuid, _> = entries.iter().map(|e| (e.id, e)).collect();
        let mut offers_per_entry: HashMap<Uuid, usize> = HashMap::new();
        let mut violations = Vec::new();

        for appointment in &appointments {
            if appointment.offered_waitlist_entry_id.is_some() != appointment.offered_at.is_some() {
                violations.push(OfferViolation {
                    appointment_id: Some(appointment.id),
                    waitlist_entry_id: appointment.offered_waitlist_entry_id,
                    description: "offer entry and offer time are not set together".to_string(),
                });
            }

            let Some(entry_id) = appointment.offered_waitlist_entry_id else {
                continue;
            };
            *offers_per_entry.entry(entry_id).or_default() += 1;

            if appointment.status != AppointmentStatus::Released {
                violations.push(OfferViolation {
                    appointment_id: Some(appointment.id),
                    waitlist_entry_id: Some(entry_id),
                    description: format!("appointment holds an offer while {}", appointment.status),
                });
            }

            match entries_by_id.get(&entry_id) {
                None => violations.push(OfferViolation {
                    appointment_id: Some(appointment.id),
                    waitlist_entry_id: Some(entry_id),
                    description: "offered waitlist entry does not exist".to_string(),
                }),
                Some(entry) if entry.status != WaitlistStatus::AwaitingResponse => {
                    violations.push(OfferViolation {
                        appointment_id: Some(appointment.id),
                        waitlist_entry_id: Some(entry_id),
                        description: format!("offered entry is {}", entry.status),
                    })
                }
                Some(entry) if entry.offered_appointment_id != Some(appointment.id) => {
                    violations.push(OfferViolation {
                        appointment_id: Some(appointment.id),
                        waitlist_entry_id: Some(entry_id),
                        description: "offered entry points at a different appointment".to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        for (entry_id, count) in &offers_per_entry {
            if *count > 1 {
                violations.push(OfferViolation {
                    appointment_id: None,
                    waitlist_entry_id: Some(*entry_id),
                    description: format!("entry holds {} simultaneous offers", count),
                });
            }
        }

        for entry in &entries {
            let awaiting = entry.status == WaitlistStatus::AwaitingResponse;

            match (awaiting, entry.offered_appointment_id) {
                (true, None) => violations.push(OfferViolation {
                    appointment_id: None,
                    waitlist_entry_id: Some(entry.id),
                    description: "entry awaits a response but has no offered appointment".to_string(),
                }),
                (false, Some(appointment_id)) => violations.push(OfferViolation {
                    appointment_id: Some(appointment_id),
                    waitlist_entry_id: Some(entry.id),
                    description: format!("{} entry still references an appointment", entry.status),
                }),
                (true, Some(appointment_id)) => {
                    let linked = appointments_by_id
                        .get(&appointment_id)
                        .map(|a| a.offered_waitlist_entry_id == Some(entry.id))
                        .unwrap_or(false);
                    if !linked {
                        violations.push(OfferViolation {
                            appointment_id: Some(appointment_id),
                            waitlist_entry_id: Some(entry.id),
                            description: "offered appointment does not point back at the entry".to_string(),
                        });
                    }
                }
                (false, None) => {}
            }
        }

        if violations.is_empty() {
            info!("Offer links consistent across {} appointments and {} waitlist entries",
                  appointments.len(), entries.len());
        } else {
            warn!("Found {} offer link violations", violations.len());
        }

        Ok(ConsistencyReport {
            appointments_checked: appointments.len(),
            entries_checked: entries.len(),
            violations,
        })
    }
}
