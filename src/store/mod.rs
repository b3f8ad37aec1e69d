//! Storage seam for events, registrations, check-ins and consultations.
//!
//! Services only see the repository traits. Two backends exist: an in-memory
//! store (tests, database-less runs) and a postgres store. Both implement
//! registration inserts and check-ins as single atomic units.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    CheckinRecord, Consultation, ConsultationStatus, Event, Registration, RegistrationStatus,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("registration code {0} is already taken")]
    CodeTaken(String),

    #[error("attendee already registered as {existing_id}")]
    DuplicateRegistration { existing_id: String },

    #[error("no seats left in tier {tier}")]
    SeatsExhausted { tier: String, remaining: u32 },

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the caller may retry after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Upper bound enforced by the store whenever a registration starts holding
/// a seat: on insert, and when a cancelled registration is reactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLimit {
    pub tier: String,
    pub seats: u32,
}

/// Result of the conditional check-in write.
#[derive(Debug, Clone)]
pub enum CheckinTransition {
    /// The flag flipped and the audit record was stored, together.
    Applied(Registration),
    AlreadyCheckedIn(Registration),
    Cancelled(Registration),
    Missing,
}

/// Result of an administrative status write.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Updated(Registration),
    /// Checked-in registrations are terminal; nothing was written.
    CheckedIn(Registration),
    Missing,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert_event(&self, event: Event) -> StoreResult<Event>;

    async fn get_event(&self, event_id: &str) -> StoreResult<Option<Event>>;

    /// Events ordered by date, earliest first.
    async fn list_events(&self, active_only: bool) -> StoreResult<Vec<Event>>;

    /// Replaces the stored event. Returns `None` when it does not exist.
    async fn update_event(&self, event: Event) -> StoreResult<Option<Event>>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Stores a new registration. Fails with `CodeTaken` when the code is in
    /// use, `DuplicateRegistration` when the (event, email) pair already has a
    /// non-cancelled registration, and `SeatsExhausted` when `limit` would be
    /// exceeded. All three checks and the write happen atomically.
    async fn insert_registration(
        &self,
        registration: Registration,
        limit: Option<SeatLimit>,
    ) -> StoreResult<Registration>;

    async fn find_by_code(&self, registration_id: &str) -> StoreResult<Option<Registration>>;

    async fn find(&self, registration_id: &str, event_id: &str)
        -> StoreResult<Option<Registration>>;

    async fn find_active_by_email(
        &self,
        event_id: &str,
        email: &str,
    ) -> StoreResult<Option<Registration>>;

    /// All registrations, newest first.
    async fn list_all(&self) -> StoreResult<Vec<Registration>>;

    async fn list_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>>;

    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Registration>>;

    /// Non-cancelled registrations holding a seat in `tier`.
    async fn count_booked(&self, event_id: &str, tier: &str) -> StoreResult<u32>;

    async fn count_checked_in(&self, event_id: &str) -> StoreResult<u32>;

    /// Writes a non-check-in status unless the registration is already checked in.
    ///
    /// Moving a cancelled registration back to an active status re-runs the
    /// insert checks in the same atomic unit: `DuplicateRegistration` when the
    /// email has since registered again, `SeatsExhausted` when `limit` is full.
    async fn update_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
        limit: Option<SeatLimit>,
    ) -> StoreResult<StatusChange>;
}

#[async_trait]
pub trait CheckinRepository: Send + Sync {
    /// Flips the registration to checked-in and appends `record`, only if it
    /// was not checked in before. Both writes land or neither does.
    async fn record_checkin(&self, record: CheckinRecord) -> StoreResult<CheckinTransition>;

    /// Check-ins for an event, newest first.
    async fn list_checkins(&self, event_id: &str) -> StoreResult<Vec<CheckinRecord>>;

    async fn count_for_registration(&self, registration_id: &str) -> StoreResult<u32>;
}

#[async_trait]
pub trait ConsultationRepository: Send + Sync {
    async fn insert_consultation(&self, consultation: Consultation) -> StoreResult<Consultation>;

    /// Newest first, optionally restricted to one status.
    async fn list_consultations(
        &self,
        status: Option<ConsultationStatus>,
    ) -> StoreResult<Vec<Consultation>>;

    /// Sets the status, and `checked_at` when given. `None` when the
    /// consultation does not exist.
    async fn update_consultation_status(
        &self,
        consultation_id: Uuid,
        status: ConsultationStatus,
        checked_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Consultation>>;

    /// Consultations whose email contains `fragment`, case-insensitively, newest first.
    async fn search_consultations(&self, fragment: &str) -> StoreResult<Vec<Consultation>>;
}

/// The repositories handed to services.
#[derive(Clone)]
pub struct Repositories {
    pub events: Arc<dyn EventRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub checkins: Arc<dyn CheckinRepository>,
    pub consultations: Arc<dyn ConsultationRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            events: store.clone(),
            registrations: store.clone(),
            checkins: store.clone(),
            consultations: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            events: store.clone(),
            registrations: store.clone(),
            checkins: store.clone(),
            consultations: store,
        }
    }
}
