use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Event, TicketTier, GENERAL_TIER};
use crate::store::{EventRepository, RegistrationRepository, SeatLimit, StoreError};

#[derive(Debug, Error)]
pub enum SeatError {
    #[error("Event {0} not found")]
    EventNotFound(String),

    #[error("Event {0} is not accepting registrations")]
    EventInactive(String),

    #[error("Ticket tier '{tier}' is not offered for event {event_id}")]
    UnknownTier { event_id: String, tier: String },

    #[error("Price {offered} does not match the current {tier} price of {expected}")]
    PriceMismatch {
        tier: String,
        expected: Decimal,
        offered: Decimal,
    },

    #[error("Quantity must be at least 1")]
    InvalidUnits,

    #[error("No seats left in tier {tier} ({remaining} remaining)")]
    SeatsExhausted { tier: String, remaining: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A validated request for seats. Advisory only: the registration insert is
/// what consumes the seat, bounded by [`Admission::seat_limit`].
#[derive(Debug, Clone)]
pub struct Admission {
    pub event: Event,
    pub tier: TicketTier,
    pub units: u32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    /// Seats left in the tier once these units are taken.
    pub remaining: u32,
}

impl Admission {
    pub fn seat_limit(&self) -> SeatLimit {
        SeatLimit {
            tier: self.tier.name.clone(),
            seats: self.tier.seats,
        }
    }
}

/// Resolves the tier a request refers to. Events without tiers sell a single
/// free `general` tier bounded by the event capacity.
fn resolve_tier(event: &Event, requested: Option<&str>) -> Result<TicketTier, SeatError> {
    let requested = requested.map(str::trim).filter(|name| !name.is_empty());

    if event.ticket_tiers.is_empty() {
        return match requested {
            None => Ok(general_tier(event)),
            Some(name) if name.eq_ignore_ascii_case(GENERAL_TIER) => Ok(general_tier(event)),
            Some(name) => Err(SeatError::UnknownTier {
                event_id: event.event_id.clone(),
                tier: name.to_string(),
            }),
        };
    }

    let tier = match requested {
        Some(name) => event.tier(name),
        None => event.default_tier(),
    };
    tier.cloned().ok_or_else(|| SeatError::UnknownTier {
        event_id: event.event_id.clone(),
        tier: requested.unwrap_or_default().to_string(),
    })
}

fn general_tier(event: &Event) -> TicketTier {
    TicketTier {
        name: GENERAL_TIER.to_string(),
        price: Decimal::ZERO,
        seats: event.max_capacity,
    }
}

#[derive(Clone)]
pub struct SeatAllocator {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

impl SeatAllocator {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
    ) -> Self {
        Self {
            events,
            registrations,
        }
    }

    pub async fn reserve(
        &self,
        event_id: &str,
        tier_name: Option<&str>,
        units: u32,
        offered_price: Option<Decimal>,
    ) -> Result<Admission, SeatError> {
        if units == 0 {
            return Err(SeatError::InvalidUnits);
        }

        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or_else(|| SeatError::EventNotFound(event_id.to_string()))?;
        if !event.is_active {
            return Err(SeatError::EventInactive(event_id.to_string()));
        }

        let tier = resolve_tier(&event, tier_name)?;
        if let Some(offered) = offered_price {
            if offered != tier.price {
                return Err(SeatError::PriceMismatch {
                    tier: tier.name,
                    expected: tier.price,
                    offered,
                });
            }
        }

        let booked = self
            .registrations
            .count_booked(&event.event_id, &tier.name)
            .await?;
        let available = tier.seats.saturating_sub(booked);
        if units > available {
            return Err(SeatError::SeatsExhausted {
                tier: tier.name,
                remaining: available,
            });
        }

        tracing::debug!(
            event_id,
            tier = %tier.name,
            units,
            remaining = available - units,
            "Seats admitted"
        );

        Ok(Admission {
            unit_price: tier.price,
            total_amount: tier.price * Decimal::from(units),
            remaining: available - units,
            units,
            tier,
            event,
        })
    }

    /// Seat bound for an existing booking's tier, used when a cancelled
    /// registration takes its seat back.
    pub async fn seat_limit(
        &self,
        event_id: &str,
        tier_name: &str,
    ) -> Result<SeatLimit, SeatError> {
        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or_else(|| SeatError::EventNotFound(event_id.to_string()))?;
        let tier = resolve_tier(&event, Some(tier_name))?;
        Ok(SeatLimit {
            tier: tier.name,
            seats: tier.seats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{sample_event, seed_registration};
    use crate::store::Repositories;

    fn allocator(repos: &Repositories) -> SeatAllocator {
        SeatAllocator::new(repos.events.clone(), repos.registrations.clone())
    }

    #[tokio::test]
    async fn test_admits_and_prices() {
        let repos = Repositories::in_memory();
        repos.events.insert_event(sample_event("E1")).await.unwrap();

        let admission = allocator(&repos)
            .reserve("E1", Some("GOLD"), 2, None)
            .await
            .unwrap();
        assert_eq!(admission.tier.name, "gold");
        assert_eq!(admission.total_amount, Decimal::new(1000, 0));
        assert_eq!(admission.remaining, 0);
    }

    #[tokio::test]
    async fn test_rejections() {
        let repos = Repositories::in_memory();
        let mut inactive = sample_event("E2");
        inactive.is_active = false;
        repos.events.insert_event(sample_event("E1")).await.unwrap();
        repos.events.insert_event(inactive).await.unwrap();
        let allocator = allocator(&repos);

        assert!(matches!(
            allocator.reserve("nope", None, 1, None).await,
            Err(SeatError::EventNotFound(_))
        ));
        assert!(matches!(
            allocator.reserve("E2", None, 1, None).await,
            Err(SeatError::EventInactive(_))
        ));
        assert!(matches!(
            allocator.reserve("E1", Some("platinum"), 1, None).await,
            Err(SeatError::UnknownTier { .. })
        ));
        assert!(matches!(
            allocator
                .reserve("E1", Some("gold"), 1, Some(Decimal::new(100, 0)))
                .await,
            Err(SeatError::PriceMismatch { .. })
        ));
        assert!(matches!(
            allocator.reserve("E1", Some("gold"), 0, None).await,
            Err(SeatError::InvalidUnits)
        ));
    }

    #[tokio::test]
    async fn test_counts_only_active_bookings() {
        let repos = Repositories::in_memory();
        repos.events.insert_event(sample_event("E1")).await.unwrap();
        seed_registration(&repos, "R1", "E1", "a@x.io", "gold").await;
        let cancelled = seed_registration(&repos, "R2", "E1", "b@x.io", "gold").await;
        repos
            .registrations
            .update_status(
                &cancelled.registration_id,
                crate::models::RegistrationStatus::Cancelled,
                None,
            )
            .await
            .unwrap();

        let allocator = allocator(&repos);
        let admission = allocator.reserve("E1", Some("gold"), 1, None).await.unwrap();
        assert_eq!(admission.remaining, 0);
        assert!(matches!(
            allocator.reserve("E1", Some("gold"), 2, None).await,
            Err(SeatError::SeatsExhausted { remaining: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_seat_limit_for_existing_tier() {
        let repos = Repositories::in_memory();
        let mut tierless = sample_event("E2");
        tierless.ticket_tiers.clear();
        tierless.max_capacity = 7;
        repos.events.insert_event(sample_event("E1")).await.unwrap();
        repos.events.insert_event(tierless).await.unwrap();
        let allocator = allocator(&repos);

        let gold = allocator.seat_limit("E1", "GOLD").await.unwrap();
        assert_eq!(gold.tier, "gold");
        assert_eq!(gold.seats, 2);

        let general = allocator.seat_limit("E2", GENERAL_TIER).await.unwrap();
        assert_eq!(general.seats, 7);

        assert!(matches!(
            allocator.seat_limit("E1", "platinum").await,
            Err(SeatError::UnknownTier { .. })
        ));
        assert!(matches!(
            allocator.seat_limit("nope", "gold").await,
            Err(SeatError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tierless_event_uses_general() {
        let repos = Repositories::in_memory();
        let mut event = sample_event("E1");
        event.ticket_tiers.clear();
        event.max_capacity = 3;
        repos.events.insert_event(event).await.unwrap();

        let admission = allocator(&repos).reserve("E1", None, 1, None).await.unwrap();
        assert_eq!(admission.tier.name, GENERAL_TIER);
        assert_eq!(admission.unit_price, Decimal::ZERO);
        assert_eq!(admission.remaining, 2);
    }
}
