use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::event::{duplicate_tier_name, DEFAULT_MAX_CAPACITY, GENERAL_TIER};
use crate::models::{
    Event, EventSummary, EventUpdate, NewEvent, Registration, TicketTier, TierAvailability,
};
use crate::store::{EventRepository, RegistrationRepository, StoreError};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn required(field: &str, value: Option<String>) -> Result<String, EventError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EventError::Invalid(format!("{field} is required")))
}

fn validate_tiers(tiers: &[TicketTier]) -> Result<(), EventError> {
    if tiers.iter().any(|t| t.name.trim().is_empty()) {
        return Err(EventError::Invalid("Ticket tier name is required".to_string()));
    }
    if tiers.iter().any(|t| t.price.is_sign_negative()) {
        return Err(EventError::Invalid("Ticket tier price cannot be negative".to_string()));
    }
    if let Some(name) = duplicate_tier_name(tiers) {
        return Err(EventError::Invalid(format!("Duplicate ticket tier '{name}'")));
    }
    Ok(())
}

/// Per-tier seat usage. Tierless events report a single `general` row.
pub fn tier_availability(event: &Event, registrations: &[Registration]) -> Vec<TierAvailability> {
    let booked = |tier: &str| {
        registrations
            .iter()
            .filter(|r| r.is_active() && r.ticket_tier.eq_ignore_ascii_case(tier))
            .count() as u32
    };

    if event.ticket_tiers.is_empty() {
        let taken = booked(GENERAL_TIER);
        return vec![TierAvailability {
            name: GENERAL_TIER.to_string(),
            price: Default::default(),
            seats: event.max_capacity,
            booked: taken,
            remaining: event.max_capacity.saturating_sub(taken),
        }];
    }

    event
        .ticket_tiers
        .iter()
        .map(|tier| {
            let taken = booked(&tier.name);
            TierAvailability {
                name: tier.name.clone(),
                price: tier.price,
                seats: tier.seats,
                booked: taken,
                remaining: tier.seats.saturating_sub(taken),
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct EventCatalog {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

impl EventCatalog {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
    ) -> Self {
        Self {
            events,
            registrations,
        }
    }

    async fn summarize(&self, event: Event) -> Result<EventSummary, EventError> {
        let registrations = self.registrations.list_by_event(&event.event_id).await?;
        let registration_count = registrations.iter().filter(|r| r.is_active()).count() as u32;
        let checked_in_count = registrations.iter().filter(|r| r.is_checked_in).count() as u32;

        Ok(EventSummary {
            tier_availability: tier_availability(&event, &registrations),
            registration_count,
            checked_in_count,
            event,
        })
    }

    /// Active events, earliest first.
    pub async fn list(&self) -> Result<Vec<EventSummary>, EventError> {
        let events = self.events.list_events(true).await?;
        let mut summaries = Vec::with_capacity(events.len());
        for event in events {
            summaries.push(self.summarize(event).await?);
        }
        Ok(summaries)
    }

    pub async fn get(&self, event_id: &str) -> Result<EventSummary, EventError> {
        let event = self.find(event_id).await?;
        self.summarize(event).await
    }

    pub async fn find(&self, event_id: &str) -> Result<Event, EventError> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| EventError::NotFound(event_id.to_string()))
    }

    pub async fn create(&self, input: NewEvent) -> Result<Event, EventError> {
        let name = required("name", input.name)?;
        let date = input
            .date
            .ok_or_else(|| EventError::Invalid("date is required".to_string()))?;
        let time = required("time", input.time)?;
        let venue = required("venue", input.venue)?;
        let description = required("description", input.description)?;

        let max_capacity = input.max_capacity.unwrap_or(DEFAULT_MAX_CAPACITY);
        if max_capacity == 0 {
            return Err(EventError::Invalid("maxCapacity must be positive".to_string()));
        }
        validate_tiers(&input.ticket_tiers)?;

        let now = Utc::now();
        let event = Event {
            event_id: Uuid::new_v4().to_string(),
            name,
            date,
            time,
            venue,
            description,
            image_url: input.image_url.unwrap_or_default(),
            is_active: true,
            max_capacity,
            ticket_tiers: input.ticket_tiers,
            created_at: now,
            updated_at: now,
        };

        let event = self.events.insert_event(event).await?;
        tracing::info!(event_id = %event.event_id, name = %event.name, "Event created");
        Ok(event)
    }

    pub async fn update(&self, event_id: &str, update: EventUpdate) -> Result<Event, EventError> {
        if let Some(tiers) = &update.ticket_tiers {
            validate_tiers(tiers)?;
        }
        if update.max_capacity == Some(0) {
            return Err(EventError::Invalid("maxCapacity must be positive".to_string()));
        }
        let blank = [&update.name, &update.time, &update.venue, &update.description]
            .into_iter()
            .any(|field| field.as_deref().is_some_and(|v| v.trim().is_empty()));
        if blank {
            return Err(EventError::Invalid("Event fields cannot be blank".to_string()));
        }

        let mut event = self.find(event_id).await?;
        update.apply(&mut event);
        event.updated_at = Utc::now();

        let event = self
            .events
            .update_event(event)
            .await?
            .ok_or_else(|| EventError::NotFound(event_id.to_string()))?;
        tracing::info!(event_id, "Event updated");
        Ok(event)
    }

    /// Soft delete; registrations keep referring to the event.
    pub async fn deactivate(&self, event_id: &str) -> Result<Event, EventError> {
        let event = self
            .update(
                event_id,
                EventUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(event_id, "Event deactivated");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::seed_registration;
    use crate::store::Repositories;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn catalog(repos: &Repositories) -> EventCatalog {
        EventCatalog::new(repos.events.clone(), repos.registrations.clone())
    }

    fn launch() -> NewEvent {
        NewEvent {
            name: Some("Launch".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 11, 20),
            time: Some("10:00".to_string()),
            venue: Some("Hall A".to_string()),
            description: Some("Product launch".to_string()),
            ticket_tiers: vec![TicketTier {
                name: "gold".to_string(),
                price: Decimal::new(500, 0),
                seats: 2,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_validates_required_fields_and_tiers() {
        let repos = Repositories::in_memory();
        let catalog = catalog(&repos);

        let err = catalog
            .create(NewEvent {
                venue: None,
                ..launch()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Invalid(msg) if msg == "venue is required"));

        let mut dup = launch();
        dup.ticket_tiers.push(TicketTier {
            name: "GOLD".to_string(),
            price: Decimal::new(100, 0),
            seats: 5,
        });
        assert!(matches!(catalog.create(dup).await, Err(EventError::Invalid(_))));

        let event = catalog.create(launch()).await.unwrap();
        assert_eq!(event.max_capacity, DEFAULT_MAX_CAPACITY);
        assert!(event.is_active);
    }

    #[tokio::test]
    async fn test_summary_counts_and_soft_delete() {
        let repos = Repositories::in_memory();
        let catalog = catalog(&repos);
        let event = catalog.create(launch()).await.unwrap();
        seed_registration(&repos, "R1", &event.event_id, "a@x.io", "gold").await;

        let summary = catalog.get(&event.event_id).await.unwrap();
        assert_eq!(summary.registration_count, 1);
        assert_eq!(summary.checked_in_count, 0);
        assert_eq!(summary.tier_availability[0].remaining, 1);

        catalog.deactivate(&event.event_id).await.unwrap();
        assert!(catalog.list().await.unwrap().is_empty());
        assert!(!catalog.get(&event.event_id).await.unwrap().event.is_active);
    }

    #[tokio::test]
    async fn test_update_missing_event() {
        let repos = Repositories::in_memory();
        assert!(matches!(
            catalog(&repos).update("nope", EventUpdate::default()).await,
            Err(EventError::NotFound(_))
        ));
    }
}
