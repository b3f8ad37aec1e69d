use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    CheckinRepository, CheckinTransition, ConsultationRepository, EventRepository,
    RegistrationRepository, SeatLimit, StatusChange, StoreError, StoreResult,
};
use crate::models::{
    CheckinRecord, Consultation, ConsultationStatus, Event, Registration, RegistrationStatus,
    TicketTier,
};

macro_rules! registration_columns {
    () => {
        "registration_id, event_id, name, email, phone, organization, designation, \
         ticket_tier, ticket_price, registration_type, qr_payload, is_checked_in, \
         checked_in_at, status, created_at, updated_at"
    };
}

macro_rules! consultation_columns {
    () => {
        "consultation_id, company, contact, email, phone, requirements, status, \
         checked_at, created_at, updated_at"
    };
}

macro_rules! event_columns {
    () => {
        "event_id, name, date, time, venue, description, image_url, is_active, \
         max_capacity, ticket_tiers, created_at, updated_at"
    };
}

const REGISTRATIONS_PKEY: &str = "registrations_pkey";
const ACTIVE_EMAIL_INDEX: &str = "registrations_active_email";

#[derive(FromRow)]
struct EventRow {
    event_id: String,
    name: String,
    date: NaiveDate,
    time: String,
    venue: String,
    description: String,
    image_url: String,
    is_active: bool,
    max_capacity: i32,
    ticket_tiers: Json<Vec<TicketTier>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            event_id: row.event_id,
            name: row.name,
            date: row.date,
            time: row.time,
            venue: row.venue,
            description: row.description,
            image_url: row.image_url,
            is_active: row.is_active,
            max_capacity: row.max_capacity.max(0) as u32,
            ticket_tiers: row.ticket_tiers.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed repositories. Multi-row writes run in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select_registration(
        tx: &mut Transaction<'_, Postgres>,
        registration_id: &str,
        event_id: &str,
    ) -> StoreResult<Option<Registration>> {
        let row = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE registration_id = $1 AND event_id = $2"
        ))
        .bind(registration_id)
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Takes the per-event write lock, then checks that `candidate` may hold a
    /// seat: no other active row for its (event, email), and room in `limit`.
    async fn admit(
        tx: &mut Transaction<'_, Postgres>,
        candidate: &Registration,
        limit: Option<&SeatLimit>,
    ) -> StoreResult<()> {
        // Serializes writers per event so the seat count below cannot go stale.
        sqlx::query("SELECT 1 FROM events WHERE event_id = $1 FOR UPDATE")
            .bind(&candidate.event_id)
            .fetch_optional(&mut **tx)
            .await?;

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT registration_id FROM registrations
             WHERE event_id = $1 AND email = $2 AND registration_id <> $3
             AND status <> 'cancelled'",
        )
        .bind(&candidate.event_id)
        .bind(&candidate.email)
        .bind(&candidate.registration_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((existing_id,)) = existing {
            return Err(StoreError::DuplicateRegistration { existing_id });
        }

        if let Some(limit) = limit {
            let (booked,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM registrations
                 WHERE event_id = $1 AND lower(ticket_tier) = lower($2)
                 AND registration_id <> $3 AND status <> 'cancelled'",
            )
            .bind(&candidate.event_id)
            .bind(&limit.tier)
            .bind(&candidate.registration_id)
            .fetch_one(&mut **tx)
            .await?;
            let booked = count_to_u32(booked);
            if booked >= limit.seats {
                return Err(StoreError::SeatsExhausted {
                    tier: limit.tier.clone(),
                    remaining: limit.seats.saturating_sub(booked),
                });
            }
        }
        Ok(())
    }

    /// Maps a unique violation on a registration write to the store error the
    /// pre-checks would have produced.
    async fn registration_conflict(
        &self,
        err: sqlx::Error,
        candidate: &Registration,
    ) -> StoreError {
        match violated_constraint(&err).as_deref() {
            Some(REGISTRATIONS_PKEY) => StoreError::CodeTaken(candidate.registration_id.clone()),
            Some(ACTIVE_EMAIL_INDEX) => {
                match self
                    .find_active_by_email(&candidate.event_id, &candidate.email)
                    .await
                {
                    Ok(existing) => StoreError::DuplicateRegistration {
                        existing_id: existing.map(|r| r.registration_id).unwrap_or_default(),
                    },
                    Err(lookup) => lookup,
                }
            }
            _ => err.into(),
        }
    }
}

fn count_to_u32(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .filter(|db| db.is_unique_violation())
        .and_then(|db| db.constraint().map(str::to_string))
}

#[async_trait]
impl EventRepository for PgStore {
    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "INSERT INTO events (",
            event_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING ",
            event_columns!()
        ))
        .bind(&event.event_id)
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.venue)
        .bind(&event.description)
        .bind(&event.image_url)
        .bind(event.is_active)
        .bind(i32::try_from(event.max_capacity).unwrap_or(i32::MAX))
        .bind(Json(&event.ticket_tiers))
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_event(&self, event_id: &str) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE event_id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn list_events(&self, active_only: bool) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE ($1 = FALSE OR is_active) ORDER BY date ASC, created_at ASC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn update_event(&self, event: Event) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "UPDATE events SET name = $2, date = $3, time = $4, venue = $5, description = $6, \
             image_url = $7, is_active = $8, max_capacity = $9, ticket_tiers = $10, \
             updated_at = $11 WHERE event_id = $1 RETURNING ",
            event_columns!()
        ))
        .bind(&event.event_id)
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.venue)
        .bind(&event.description)
        .bind(&event.image_url)
        .bind(event.is_active)
        .bind(i32::try_from(event.max_capacity).unwrap_or(i32::MAX))
        .bind(Json(&event.ticket_tiers))
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Event::from))
    }
}

#[async_trait]
impl RegistrationRepository for PgStore {
    async fn insert_registration(
        &self,
        registration: Registration,
        limit: Option<SeatLimit>,
    ) -> StoreResult<Registration> {
        let mut tx = self.pool.begin().await?;
        Self::admit(&mut tx, &registration, limit.as_ref()).await?;

        let inserted = sqlx::query_as::<_, Registration>(concat!(
            "INSERT INTO registrations (",
            registration_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING ",
            registration_columns!()
        ))
        .bind(&registration.registration_id)
        .bind(&registration.event_id)
        .bind(&registration.name)
        .bind(&registration.email)
        .bind(&registration.phone)
        .bind(&registration.organization)
        .bind(&registration.designation)
        .bind(&registration.ticket_tier)
        .bind(registration.ticket_price)
        .bind(registration.registration_type.as_str())
        .bind(&registration.qr_payload)
        .bind(registration.is_checked_in)
        .bind(registration.checked_in_at)
        .bind(registration.status.as_str())
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .fetch_one(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(row) => row,
            Err(err) => {
                drop(tx);
                return Err(self.registration_conflict(err, &registration).await);
            }
        };

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_code(&self, registration_id: &str) -> StoreResult<Option<Registration>> {
        let row = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE registration_id = $1"
        ))
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find(
        &self,
        registration_id: &str,
        event_id: &str,
    ) -> StoreResult<Option<Registration>> {
        let row = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE registration_id = $1 AND event_id = $2"
        ))
        .bind(registration_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_active_by_email(
        &self,
        event_id: &str,
        email: &str,
    ) -> StoreResult<Option<Registration>> {
        let row = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE event_id = $1 AND email = $2 AND status <> 'cancelled'"
        ))
        .bind(event_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_all(&self) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE event_id = $1 ORDER BY created_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE lower(email) = lower($1) ORDER BY created_at DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_booked(&self, event_id: &str, tier: &str) -> StoreResult<u32> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations
             WHERE event_id = $1 AND lower(ticket_tier) = lower($2) AND status <> 'cancelled'",
        )
        .bind(event_id)
        .bind(tier)
        .fetch_one(&self.pool)
        .await?;
        Ok(count_to_u32(count))
    }

    async fn count_checked_in(&self, event_id: &str) -> StoreResult<u32> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND is_checked_in",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count_to_u32(count))
    }

    async fn update_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
        limit: Option<SeatLimit>,
    ) -> StoreResult<StatusChange> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<(String,)> =
            sqlx::query_as("SELECT event_id FROM registrations WHERE registration_id = $1")
                .bind(registration_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((event_id,)) = owner else {
            tx.rollback().await?;
            return Ok(StatusChange::Missing);
        };

        // Same lock order as inserts: event row first, then the registration.
        sqlx::query("SELECT 1 FROM events WHERE event_id = $1 FOR UPDATE")
            .bind(&event_id)
            .fetch_optional(&mut *tx)
            .await?;
        let current = sqlx::query_as::<_, Registration>(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE registration_id = $1 FOR UPDATE"
        ))
        .bind(registration_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(StatusChange::Missing);
        };
        if current.is_checked_in {
            tx.rollback().await?;
            return Ok(StatusChange::CheckedIn(current));
        }
        if current.status == RegistrationStatus::Cancelled
            && status != RegistrationStatus::Cancelled
        {
            Self::admit(&mut tx, &current, limit.as_ref()).await?;
        }

        let updated = sqlx::query_as::<_, Registration>(concat!(
            "UPDATE registrations SET status = $2, updated_at = NOW() \
             WHERE registration_id = $1 RETURNING ",
            registration_columns!()
        ))
        .bind(registration_id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await;

        let updated = match updated {
            Ok(row) => row,
            Err(err) => {
                drop(tx);
                return Err(self.registration_conflict(err, &current).await);
            }
        };

        tx.commit().await?;
        Ok(StatusChange::Updated(updated))
    }
}

#[async_trait]
impl CheckinRepository for PgStore {
    async fn record_checkin(&self, record: CheckinRecord) -> StoreResult<CheckinTransition> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here makes a racing attempt wait, then re-check
        // `is_checked_in = FALSE` and match nothing.
        let flipped = sqlx::query_as::<_, Registration>(concat!(
            "UPDATE registrations SET is_checked_in = TRUE, checked_in_at = $3, \
             status = 'checked-in', updated_at = $3 \
             WHERE registration_id = $1 AND event_id = $2 \
             AND is_checked_in = FALSE AND status <> 'cancelled' RETURNING ",
            registration_columns!()
        ))
        .bind(&record.registration_id)
        .bind(&record.event_id)
        .bind(record.checkin_time)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(registration) = flipped else {
            let current =
                Self::select_registration(&mut tx, &record.registration_id, &record.event_id)
                    .await?;
            tx.rollback().await?;
            return Ok(match current {
                Some(r) if r.is_checked_in => CheckinTransition::AlreadyCheckedIn(r),
                Some(r) => CheckinTransition::Cancelled(r),
                None => CheckinTransition::Missing,
            });
        };

        sqlx::query(
            "INSERT INTO checkins (checkin_id, registration_id, event_id, checkin_time, checked_in_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.checkin_id)
        .bind(&record.registration_id)
        .bind(&record.event_id)
        .bind(record.checkin_time)
        .bind(&record.checked_in_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CheckinTransition::Applied(registration))
    }

    async fn list_checkins(&self, event_id: &str) -> StoreResult<Vec<CheckinRecord>> {
        let rows = sqlx::query_as::<_, CheckinRecord>(
            "SELECT checkin_id, registration_id, event_id, checkin_time, checked_in_by
             FROM checkins WHERE event_id = $1 ORDER BY checkin_time DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_for_registration(&self, registration_id: &str) -> StoreResult<u32> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM checkins WHERE registration_id = $1")
                .bind(registration_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count_to_u32(count))
    }
}

#[async_trait]
impl ConsultationRepository for PgStore {
    async fn insert_consultation(&self, consultation: Consultation) -> StoreResult<Consultation> {
        let row = sqlx::query_as::<_, Consultation>(concat!(
            "INSERT INTO consultations (",
            consultation_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            consultation_columns!()
        ))
        .bind(consultation.consultation_id)
        .bind(&consultation.company)
        .bind(&consultation.contact)
        .bind(&consultation.email)
        .bind(&consultation.phone)
        .bind(&consultation.requirements)
        .bind(consultation.status.as_str())
        .bind(consultation.checked_at)
        .bind(consultation.created_at)
        .bind(consultation.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_consultations(
        &self,
        status: Option<ConsultationStatus>,
    ) -> StoreResult<Vec<Consultation>> {
        let rows = sqlx::query_as::<_, Consultation>(concat!(
            "SELECT ",
            consultation_columns!(),
            " FROM consultations WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_consultation_status(
        &self,
        consultation_id: Uuid,
        status: ConsultationStatus,
        checked_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Consultation>> {
        let row = sqlx::query_as::<_, Consultation>(concat!(
            "UPDATE consultations SET status = $2, checked_at = COALESCE($3, checked_at), \
             updated_at = NOW() WHERE consultation_id = $1 RETURNING ",
            consultation_columns!()
        ))
        .bind(consultation_id)
        .bind(status.as_str())
        .bind(checked_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn search_consultations(&self, fragment: &str) -> StoreResult<Vec<Consultation>> {
        let rows = sqlx::query_as::<_, Consultation>(concat!(
            "SELECT ",
            consultation_columns!(),
            " FROM consultations WHERE position(lower($1) IN lower(email)) > 0 \
             ORDER BY created_at DESC"
        ))
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
