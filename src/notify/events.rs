use serde::{Deserialize, Serialize};

use crate::models::{Registration, RegistrationChannel};

/// Trimmed registration view pushed to dashboards.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub registration_id: String,
    pub name: String,
    pub email: String,
    pub ticket_tier: String,
    pub registration_type: RegistrationChannel,
}

impl From<&Registration> for RegistrationSummary {
    fn from(registration: &Registration) -> Self {
        Self {
            registration_id: registration.registration_id.clone(),
            name: registration.name.clone(),
            email: registration.email.clone(),
            ticket_tier: registration.ticket_tier.clone(),
            registration_type: registration.registration_type,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    NewRegistration {
        event_id: String,
        registration: RegistrationSummary,
    },

    #[serde(rename_all = "camelCase")]
    NewCheckin {
        event_id: String,
        checked_in_count: u32,
    },
}

impl Notification {
    pub fn event_id(&self) -> &str {
        match self {
            Notification::NewRegistration { event_id, .. }
            | Notification::NewCheckin { event_id, .. } => event_id,
        }
    }
}

/// Wire frame sent to socket clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    #[serde(flatten)]
    pub notification: Notification,

    /// Monotonically increasing, for gap detection on the client.
    pub sequence_id: u64,

    pub timestamp: i64,
}

/// Messages a socket client may send.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
    /// Switch the socket to another event.
    #[serde(rename_all = "camelCase")]
    Subscribe { event_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checkin_wire_format() {
        let msg = NotificationMessage {
            notification: Notification::NewCheckin {
                event_id: "E1".to_string(),
                checked_in_count: 3,
            },
            sequence_id: 7,
            timestamp: 1_700_000_000,
        };

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "newCheckin");
        assert_eq!(json["eventId"], "E1");
        assert_eq!(json["checkedInCount"], 3);
        assert_eq!(json["sequenceId"], 7);
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","eventId":"E2"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { event_id } if event_id == "E2"));
    }
}
