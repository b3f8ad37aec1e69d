use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CAPACITY: u32 = 1000;

/// Tier name used when an event defines no ticket tiers.
pub const GENERAL_TIER: &str = "general";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTier {
    pub name: String,
    pub price: Decimal,
    pub seats: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: String,
    pub description: String,
    pub image_url: String,
    pub is_active: bool,
    pub max_capacity: u32,
    pub ticket_tiers: Vec<TicketTier>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Case-insensitive tier lookup.
    pub fn tier(&self, name: &str) -> Option<&TicketTier> {
        self.ticket_tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn default_tier(&self) -> Option<&TicketTier> {
        self.ticket_tiers.first()
    }
}

/// Body of `POST /events`. Required fields are optional here so that a
/// missing one is reported as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    #[serde(default)]
    pub ticket_tiers: Vec<TicketTier>,
}

/// Body of `PUT /events/:id`; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub max_capacity: Option<u32>,
    pub ticket_tiers: Option<Vec<TicketTier>>,
}

impl EventUpdate {
    pub fn apply(self, event: &mut Event) {
        if let Some(name) = self.name {
            event.name = name;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(time) = self.time {
            event.time = time;
        }
        if let Some(venue) = self.venue {
            event.venue = venue;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(image_url) = self.image_url {
            event.image_url = image_url;
        }
        if let Some(is_active) = self.is_active {
            event.is_active = is_active;
        }
        if let Some(max_capacity) = self.max_capacity {
            event.max_capacity = max_capacity;
        }
        if let Some(tiers) = self.ticket_tiers {
            event.ticket_tiers = tiers;
        }
    }
}

/// Returns the first tier name that appears twice (case-insensitively).
pub fn duplicate_tier_name(tiers: &[TicketTier]) -> Option<&str> {
    tiers.iter().enumerate().find_map(|(i, tier)| {
        tiers[..i]
            .iter()
            .any(|earlier| earlier.name.eq_ignore_ascii_case(&tier.name))
            .then_some(tier.name.as_str())
    })
}

/// Seat usage for one tier, as shown on event listings and the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierAvailability {
    pub name: String,
    pub price: Decimal,
    pub seats: u32,
    pub booked: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub registration_count: u32,
    pub checked_in_count: u32,
    pub tier_availability: Vec<TierAvailability>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(name: &str) -> TicketTier {
        TicketTier {
            name: name.to_string(),
            price: Decimal::new(500, 0),
            seats: 2,
        }
    }

    #[test]
    fn test_duplicate_tier_name_is_case_insensitive() {
        let tiers = vec![tier("Gold"), tier("silver"), tier("gold")];
        assert_eq!(duplicate_tier_name(&tiers), Some("gold"));
        assert_eq!(duplicate_tier_name(&tiers[..2]), None);
    }

    #[test]
    fn test_update_leaves_absent_fields() {
        let now = Utc::now();
        let mut event = Event {
            event_id: "e1".to_string(),
            name: "Launch".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            time: "10:00".to_string(),
            venue: "Hall A".to_string(),
            description: "Product launch".to_string(),
            image_url: String::new(),
            is_active: true,
            max_capacity: DEFAULT_MAX_CAPACITY,
            ticket_tiers: vec![tier("gold")],
            created_at: now,
            updated_at: now,
        };

        EventUpdate {
            venue: Some("Hall B".to_string()),
            ..Default::default()
        }
        .apply(&mut event);

        assert_eq!(event.venue, "Hall B");
        assert_eq!(event.name, "Launch");
        assert_eq!(event.tier("GOLD").map(|t| t.seats), Some(2));
    }
}
