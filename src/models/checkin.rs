use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Actor recorded for self-service scans.
pub const SYSTEM_ACTOR: &str = "system";

/// Append-only audit entry written once per successful check-in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    pub checkin_id: Uuid,
    pub registration_id: String,
    pub event_id: String,
    pub checkin_time: DateTime<Utc>,
    pub checked_in_by: String,
}

impl CheckinRecord {
    pub fn new(registration_id: &str, event_id: &str, actor: &str, at: DateTime<Utc>) -> Self {
        Self {
            checkin_id: Uuid::new_v4(),
            registration_id: registration_id.to_string(),
            event_id: event_id.to_string(),
            checkin_time: at,
            checked_in_by: actor.to_string(),
        }
    }
}
