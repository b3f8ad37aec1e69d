use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "checked-in")]
    CheckedIn,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::CheckedIn => "checked-in",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown value '{0}'")]
pub struct ParseEnumError(String);

impl ParseEnumError {
    pub(crate) fn new(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for RegistrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            "checked-in" => Ok(RegistrationStatus::CheckedIn),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

impl TryFrom<String> for RegistrationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the attendee registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationChannel {
    #[default]
    Online,
    Kiosk,
}

impl RegistrationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationChannel::Online => "online",
            RegistrationChannel::Kiosk => "kiosk",
        }
    }
}

impl TryFrom<String> for RegistrationChannel {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "online" => Ok(RegistrationChannel::Online),
            "kiosk" => Ok(RegistrationChannel::Kiosk),
            _ => Err(ParseEnumError(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub registration_id: String,
    pub event_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
    pub designation: String,
    pub ticket_tier: String,
    pub ticket_price: Decimal,
    #[sqlx(try_from = "String")]
    pub registration_type: RegistrationChannel,
    pub qr_payload: String,
    pub is_checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// `registrationId|eventId`, the form printed on badges and scanned at the door.
    pub fn scan_token(&self) -> String {
        format!("{}|{}", self.registration_id, self.event_id)
    }

    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

/// Attendee details as submitted by the registration form or kiosk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
}

impl Attendee {
    /// Strips markup characters and normalizes the email for uniqueness checks.
    pub fn sanitized(self) -> Self {
        Self {
            name: strip_markup(&self.name),
            email: strip_markup(&self.email).to_lowercase(),
            phone: strip_markup(&self.phone),
            organization: self.organization.as_deref().map(strip_markup),
            designation: self.designation.as_deref().map(strip_markup),
        }
    }
}

fn strip_markup(value: &str) -> String {
    value.trim().replace(['<', '>'], "")
}

/// Body of `POST /registrations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub event_id: String,
    #[serde(flatten)]
    pub attendee: Attendee,
    #[serde(default)]
    pub registration_type: Option<RegistrationChannel>,
    #[serde(default)]
    pub ticket_tier: Option<String>,
    #[serde(default)]
    pub ticket_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            RegistrationStatus::Pending,
            RegistrationStatus::Confirmed,
            RegistrationStatus::Cancelled,
            RegistrationStatus::CheckedIn,
        ] {
            assert_eq!(status.as_str().parse::<RegistrationStatus>().unwrap(), status);
        }
        assert!("done".parse::<RegistrationStatus>().is_err());
    }

    #[test]
    fn test_checked_in_serializes_with_hyphen() {
        let json = serde_json::to_string(&RegistrationStatus::CheckedIn).unwrap();
        assert_eq!(json, "\"checked-in\"");
    }

    #[test]
    fn test_attendee_sanitized() {
        let attendee = Attendee {
            name: " <b>Asha</b> ".to_string(),
            email: "Asha@Example.COM".to_string(),
            phone: "98765".to_string(),
            organization: Some("<Acme>".to_string()),
            designation: None,
        }
        .sanitized();

        assert_eq!(attendee.name, "bAsha/b");
        assert_eq!(attendee.email, "asha@example.com");
        assert_eq!(attendee.organization.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_request_accepts_flat_attendee_fields() {
        let json = r#"{"eventId":"e1","name":"Asha","email":"a@x.io","phone":"1","ticketTier":"gold","ticketPrice":500}"#;
        let request: RegistrationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.attendee.name, "Asha");
        assert_eq!(request.ticket_price, Some(Decimal::new(500, 0)));
        assert!(request.registration_type.is_none());
    }
}
