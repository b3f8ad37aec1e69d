//! Scan tokens printed on badges and confirmation emails.
//!
//! Two forms decode to the same `(registrationId, eventId)` pair: the short
//! `registrationId|eventId` string and the JSON document stored on the
//! registration at creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkin::CheckinError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub registration_id: String,
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

impl QrPayload {
    pub fn encode(&self) -> String {
        // Plain strings and a timestamp always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decodes a scanned string without touching the store.
pub fn decode_scan(raw: &str) -> Result<(String, String), CheckinError> {
    let raw = raw.trim();
    let invalid = || CheckinError::InvalidSelector(raw.to_string());

    if raw.starts_with('{') {
        let payload: QrPayload = serde_json::from_str(raw).map_err(|_| invalid())?;
        let registration_id = payload.registration_id.trim();
        let event_id = payload.event_id.trim();
        if registration_id.is_empty() || event_id.is_empty() {
            return Err(invalid());
        }
        return Ok((registration_id.to_string(), event_id.to_string()));
    }

    let mut fields = raw.split('|');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(registration_id), Some(event_id), None) => {
            let registration_id = registration_id.trim();
            let event_id = event_id.trim();
            if registration_id.is_empty() || event_id.is_empty() {
                return Err(invalid());
            }
            Ok((registration_id.to_string(), event_id.to_string()))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_form() {
        assert_eq!(
            decode_scan("AB12CD34|E1").unwrap(),
            ("AB12CD34".to_string(), "E1".to_string())
        );
        assert_eq!(
            decode_scan("  AB12CD34 | E1 \n").unwrap(),
            ("AB12CD34".to_string(), "E1".to_string())
        );
    }

    #[test]
    fn test_malformed_scans_rejected() {
        for raw in ["", "garbage", "|E1", "AB12CD34|", "a|b|c", "{not json", "{}"] {
            assert!(
                matches!(decode_scan(raw), Err(CheckinError::InvalidSelector(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_json_payload_decodes_to_same_pair() {
        let payload = QrPayload {
            registration_id: "AB12CD34".to_string(),
            event_id: "E1".to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(
            decode_scan(&payload.encode()).unwrap(),
            ("AB12CD34".to_string(), "E1".to_string())
        );
    }

    #[test]
    fn test_json_field_order_does_not_matter() {
        let raw = r#"{"timestamp":"2026-10-16T09:00:00Z","email":"a@x.io","name":"A","eventId":"E1","registrationId":"R1"}"#;
        assert_eq!(decode_scan(raw).unwrap(), ("R1".to_string(), "E1".to_string()));
    }
}
