use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    CheckinRepository, CheckinTransition, ConsultationRepository, EventRepository,
    RegistrationRepository, SeatLimit, StatusChange, StoreError, StoreResult,
};
use crate::models::{
    CheckinRecord, Consultation, ConsultationStatus, Event, Registration, RegistrationStatus,
};

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    /// Insertion order doubles as creation order.
    registrations: Vec<Registration>,
    checkins: Vec<CheckinRecord>,
    consultations: Vec<Consultation>,
}

impl Tables {
    fn registration_mut(&mut self, registration_id: &str) -> Option<&mut Registration> {
        self.registrations
            .iter_mut()
            .find(|r| r.registration_id == registration_id)
    }

    /// The insert-time checks for a registration about to hold a seat:
    /// no other active row for the same (event, email), and room in `limit`.
    fn admit(&self, candidate: &Registration, limit: Option<&SeatLimit>) -> StoreResult<()> {
        let mut booked = 0u32;
        for other in self.registrations.iter().filter(|r| {
            r.is_active()
                && r.event_id == candidate.event_id
                && r.registration_id != candidate.registration_id
        }) {
            if other.email == candidate.email {
                return Err(StoreError::DuplicateRegistration {
                    existing_id: other.registration_id.clone(),
                });
            }
            if limit.is_some_and(|l| other.ticket_tier.eq_ignore_ascii_case(&l.tier)) {
                booked += 1;
            }
        }

        if let Some(limit) = limit {
            if booked >= limit.seats {
                return Err(StoreError::SeatsExhausted {
                    tier: limit.tier.clone(),
                    remaining: limit.seats.saturating_sub(booked),
                });
            }
        }
        Ok(())
    }
}

/// Whole-store mutex; every operation is one critical section, which makes
/// the multi-row writes atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<'a>(rows: impl DoubleEndedIterator<Item = &'a Registration>) -> Vec<Registration> {
    let mut out: Vec<Registration> = rows.rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        self.tables.lock().events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: &str) -> StoreResult<Option<Event>> {
        let tables = self.tables.lock();
        Ok(tables.events.iter().find(|e| e.event_id == event_id).cloned())
    }

    async fn list_events(&self, active_only: bool) -> StoreResult<Vec<Event>> {
        let tables = self.tables.lock();
        let mut events: Vec<Event> = tables
            .events
            .iter()
            .filter(|e| !active_only || e.is_active)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Option<Event>> {
        let mut tables = self.tables.lock();
        match tables.events.iter_mut().find(|e| e.event_id == event.event_id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryStore {
    async fn insert_registration(
        &self,
        registration: Registration,
        limit: Option<SeatLimit>,
    ) -> StoreResult<Registration> {
        let mut tables = self.tables.lock();

        if tables
            .registrations
            .iter()
            .any(|r| r.registration_id == registration.registration_id)
        {
            return Err(StoreError::CodeTaken(registration.registration_id));
        }

        tables.admit(&registration, limit.as_ref())?;
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn find_by_code(&self, registration_id: &str) -> StoreResult<Option<Registration>> {
        let tables = self.tables.lock();
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.registration_id == registration_id)
            .cloned())
    }

    async fn find(
        &self,
        registration_id: &str,
        event_id: &str,
    ) -> StoreResult<Option<Registration>> {
        let tables = self.tables.lock();
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.registration_id == registration_id && r.event_id == event_id)
            .cloned())
    }

    async fn find_active_by_email(
        &self,
        event_id: &str,
        email: &str,
    ) -> StoreResult<Option<Registration>> {
        let tables = self.tables.lock();
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.is_active() && r.event_id == event_id && r.email == email)
            .cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.lock();
        Ok(newest_first(tables.registrations.iter()))
    }

    async fn list_by_event(&self, event_id: &str) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.lock();
        let rows: Vec<&Registration> = tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .collect();
        Ok(newest_first(rows.into_iter()))
    }

    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.lock();
        let rows: Vec<&Registration> = tables
            .registrations
            .iter()
            .filter(|r| r.email.eq_ignore_ascii_case(email))
            .collect();
        Ok(newest_first(rows.into_iter()))
    }

    async fn count_booked(&self, event_id: &str, tier: &str) -> StoreResult<u32> {
        let tables = self.tables.lock();
        let count = tables
            .registrations
            .iter()
            .filter(|r| {
                r.is_active() && r.event_id == event_id && r.ticket_tier.eq_ignore_ascii_case(tier)
            })
            .count();
        Ok(count as u32)
    }

    async fn count_checked_in(&self, event_id: &str) -> StoreResult<u32> {
        let tables = self.tables.lock();
        let count = tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id && r.is_checked_in)
            .count();
        Ok(count as u32)
    }

    async fn update_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
        limit: Option<SeatLimit>,
    ) -> StoreResult<StatusChange> {
        let mut tables = self.tables.lock();
        let Some(current) = tables
            .registrations
            .iter()
            .find(|r| r.registration_id == registration_id)
        else {
            return Ok(StatusChange::Missing);
        };
        if current.is_checked_in {
            return Ok(StatusChange::CheckedIn(current.clone()));
        }
        if current.status == RegistrationStatus::Cancelled
            && status != RegistrationStatus::Cancelled
        {
            tables.admit(current, limit.as_ref())?;
        }

        let Some(registration) = tables.registration_mut(registration_id) else {
            return Ok(StatusChange::Missing);
        };
        registration.status = status;
        registration.updated_at = Utc::now();
        Ok(StatusChange::Updated(registration.clone()))
    }
}

#[async_trait]
impl CheckinRepository for InMemoryStore {
    async fn record_checkin(&self, record: CheckinRecord) -> StoreResult<CheckinTransition> {
        let mut tables = self.tables.lock();
        let Some(registration) = tables
            .registrations
            .iter_mut()
            .find(|r| r.registration_id == record.registration_id && r.event_id == record.event_id)
        else {
            return Ok(CheckinTransition::Missing);
        };

        if registration.is_checked_in {
            return Ok(CheckinTransition::AlreadyCheckedIn(registration.clone()));
        }
        if registration.status == RegistrationStatus::Cancelled {
            return Ok(CheckinTransition::Cancelled(registration.clone()));
        }

        registration.is_checked_in = true;
        registration.checked_in_at = Some(record.checkin_time);
        registration.status = RegistrationStatus::CheckedIn;
        registration.updated_at = record.checkin_time;
        let updated = registration.clone();
        tables.checkins.push(record);

        Ok(CheckinTransition::Applied(updated))
    }

    async fn list_checkins(&self, event_id: &str) -> StoreResult<Vec<CheckinRecord>> {
        let tables = self.tables.lock();
        let mut rows: Vec<CheckinRecord> = tables
            .checkins
            .iter()
            .rev()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.checkin_time.cmp(&a.checkin_time));
        Ok(rows)
    }

    async fn count_for_registration(&self, registration_id: &str) -> StoreResult<u32> {
        let tables = self.tables.lock();
        let count = tables
            .checkins
            .iter()
            .filter(|c| c.registration_id == registration_id)
            .count();
        Ok(count as u32)
    }
}

#[async_trait]
impl ConsultationRepository for InMemoryStore {
    async fn insert_consultation(&self, consultation: Consultation) -> StoreResult<Consultation> {
        self.tables.lock().consultations.push(consultation.clone());
        Ok(consultation)
    }

    async fn list_consultations(
        &self,
        status: Option<ConsultationStatus>,
    ) -> StoreResult<Vec<Consultation>> {
        let tables = self.tables.lock();
        let mut rows: Vec<Consultation> = tables
            .consultations
            .iter()
            .rev()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_consultation_status(
        &self,
        consultation_id: Uuid,
        status: ConsultationStatus,
        checked_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Consultation>> {
        let mut tables = self.tables.lock();
        let Some(consultation) = tables
            .consultations
            .iter_mut()
            .find(|c| c.consultation_id == consultation_id)
        else {
            return Ok(None);
        };
        consultation.status = status;
        if checked_at.is_some() {
            consultation.checked_at = checked_at;
        }
        consultation.updated_at = Utc::now();
        Ok(Some(consultation.clone()))
    }

    async fn search_consultations(&self, fragment: &str) -> StoreResult<Vec<Consultation>> {
        let fragment = fragment.to_lowercase();
        let tables = self.tables.lock();
        let mut rows: Vec<Consultation> = tables
            .consultations
            .iter()
            .rev()
            .filter(|c| c.email.to_lowercase().contains(&fragment))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
