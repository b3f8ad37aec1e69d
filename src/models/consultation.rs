use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::registration::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsultationStatus {
    Pending,
    Completed,
    CheckedIn,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::CheckedIn => "checkedIn",
        }
    }
}

impl FromStr for ConsultationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConsultationStatus::Pending),
            "completed" => Ok(ConsultationStatus::Completed),
            "checkedIn" => Ok(ConsultationStatus::CheckedIn),
            other => Err(ParseEnumError::new(other)),
        }
    }
}

impl TryFrom<String> for ConsultationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A company's request for a sales or onboarding consultation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub consultation_id: Uuid,
    pub company: String,
    pub contact: String,
    pub email: String,
    pub phone: String,
    pub requirements: String,
    #[sqlx(try_from = "String")]
    pub status: ConsultationStatus,
    /// Set when the consultation is marked `checkedIn`.
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /consultations`. Every field is required; missing ones are
/// reported as a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsultation {
    pub company: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub requirements: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_in_uses_camel_case() {
        let json = serde_json::to_string(&ConsultationStatus::CheckedIn).unwrap();
        assert_eq!(json, "\"checkedIn\"");
        assert_eq!(
            "checkedIn".parse::<ConsultationStatus>().unwrap(),
            ConsultationStatus::CheckedIn
        );
        assert!("checked-in".parse::<ConsultationStatus>().is_err());
    }
}
