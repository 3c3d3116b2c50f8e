use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotificationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SlotOffer,
    ConfirmationRequest,
    Reminder,
}

/// Flat outbound message. Serialises to the JSON payload handed to the gateway:
/// `{"patientId": .., "appointmentId": .., "waitlistEntryId": .., "kind": .., "mensagem": ..}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub patient_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_entry_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub mensagem: String,
}

impl NotificationMessage {
    pub fn slot_offer(
        patient_id: Uuid,
        appointment_id: Uuid,
        waitlist_entry_id: Uuid,
        mensagem: String,
    ) -> Self {
        Self {
            patient_id,
            appointment_id: Some(appointment_id),
            waitlist_entry_id: Some(waitlist_entry_id),
            kind: NotificationKind::SlotOffer,
            mensagem,
        }
    }

    pub fn appointment(
        kind: NotificationKind,
        patient_id: Uuid,
        appointment_id: Uuid,
        mensagem: String,
    ) -> Self {
        Self {
            patient_id,
            appointment_id: Some(appointment_id),
            waitlist_entry_id: None,
            kind,
            mensagem,
        }
    }

    pub fn to_payload(&self) -> Result<String, NotificationError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn payload_is_flat_camel_case_json() {
        let message = NotificationMessage::slot_offer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "A slot opened up".to_string(),
        );

        let payload: Value = serde_json::from_str(&message.to_payload().unwrap()).unwrap();
        assert_eq!(payload["patientId"], Value::String(message.patient_id.to_string()));
        assert!(payload.get("appointmentId").is_some());
        assert!(payload.get("waitlistEntryId").is_some());
        assert_eq!(payload["kind"], "slot_offer");
        assert_eq!(payload["mensagem"], "A slot opened up");
    }

    #[test]
    fn appointment_payload_omits_waitlist_entry() {
        let message = NotificationMessage::appointment(
            NotificationKind::Reminder,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "See you tomorrow".to_string(),
        );

        let payload: Value = serde_json::from_str(&message.to_payload().unwrap()).unwrap();
        assert!(payload.get("waitlistEntryId").is_none());
    }
}
