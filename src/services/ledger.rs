use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::checkin::{CheckinEngine, CheckinError, CheckinOutcome, Selector};
use super::qr::QrPayload;
use super::seats::{SeatAllocator, SeatError};
use crate::mailer::Mailer;
use crate::models::{
    Attendee, Event, Registration, RegistrationRequest, RegistrationStatus,
};
use crate::notify::{Notification, Notifier};
use crate::store::{RegistrationRepository, StatusChange, StoreError};

/// Unambiguous characters only: no `0/O` or `1/I`.
const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Seat(#[from] SeatError),

    #[error("Already registered for this event")]
    Duplicate { existing_id: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Registration {0} not found")]
    NotFound(String),

    #[error("Registration {0} is checked in and can no longer change status")]
    CheckedIn(String),

    #[error(transparent)]
    Checkin(#[from] CheckinError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Draws an 8 character code from 40 random bits of a v4 uuid.
pub fn generate_code() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    (0..CODE_LEN)
        .map(|_| {
            let c = CODE_ALPHABET[(bits & 0x1f) as usize] as char;
            bits >>= 5;
            c
        })
        .collect()
}

/// Store rejections that mean the attendee cannot hold a seat.
fn admission_error(err: StoreError) -> RegistrationError {
    match err {
        StoreError::DuplicateRegistration { existing_id } => {
            RegistrationError::Duplicate { existing_id }
        }
        StoreError::SeatsExhausted { tier, remaining } => {
            SeatError::SeatsExhausted { tier, remaining }.into()
        }
        other => other.into(),
    }
}

fn validate(attendee: &Attendee) -> Result<(), RegistrationError> {
    if attendee.name.is_empty() {
        return Err(RegistrationError::Invalid("name is required".to_string()));
    }
    if attendee.phone.is_empty() {
        return Err(RegistrationError::Invalid("phone is required".to_string()));
    }
    let valid_email = attendee
        .email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(RegistrationError::Invalid(
            "a valid email is required".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RegistrationLedger {
    registrations: Arc<dyn RegistrationRepository>,
    allocator: SeatAllocator,
    checkin: CheckinEngine,
    notifier: Arc<Notifier>,
    mailer: Arc<dyn Mailer>,
}

impl RegistrationLedger {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        allocator: SeatAllocator,
        checkin: CheckinEngine,
        notifier: Arc<Notifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            registrations,
            allocator,
            checkin,
            notifier,
            mailer,
        }
    }

    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, RegistrationError> {
        let event_id = request.event_id.trim().to_string();
        if event_id.is_empty() {
            return Err(RegistrationError::Invalid("eventId is required".to_string()));
        }
        let attendee = request.attendee.sanitized();
        validate(&attendee)?;

        if let Some(existing) = self
            .registrations
            .find_active_by_email(&event_id, &attendee.email)
            .await?
        {
            return Err(RegistrationError::Duplicate {
                existing_id: existing.registration_id,
            });
        }

        let admission = self
            .allocator
            .reserve(
                &event_id,
                request.ticket_tier.as_deref(),
                1,
                request.ticket_price,
            )
            .await?;
        let limit = admission.seat_limit();

        let registration = loop {
            let now = Utc::now();
            let registration_id = generate_code();
            let qr_payload = QrPayload {
                registration_id: registration_id.clone(),
                event_id: event_id.clone(),
                name: attendee.name.clone(),
                email: attendee.email.clone(),
                timestamp: now,
            }
            .encode();

            let candidate = Registration {
                registration_id,
                event_id: event_id.clone(),
                name: attendee.name.clone(),
                email: attendee.email.clone(),
                phone: attendee.phone.clone(),
                organization: attendee.organization.clone().unwrap_or_default(),
                designation: attendee.designation.clone().unwrap_or_default(),
                ticket_tier: admission.tier.name.clone(),
                ticket_price: admission.unit_price,
                registration_type: request.registration_type.unwrap_or_default(),
                qr_payload,
                is_checked_in: false,
                checked_in_at: None,
                status: RegistrationStatus::Confirmed,
                created_at: now,
                updated_at: now,
            };

            match self
                .registrations
                .insert_registration(candidate, Some(limit.clone()))
                .await
            {
                Ok(stored) => break stored,
                Err(StoreError::CodeTaken(code)) => {
                    tracing::debug!(code = %code, "Registration code collision, drawing again");
                }
                Err(e) => return Err(admission_error(e)),
            }
        };

        tracing::info!(
            registration_id = %registration.registration_id,
            event_id = %registration.event_id,
            tier = %registration.ticket_tier,
            channel = registration.registration_type.as_str(),
            "Registration created"
        );

        self.notifier.publish(Notification::NewRegistration {
            event_id: registration.event_id.clone(),
            registration: (&registration).into(),
        });
        self.send_confirmation(registration.clone(), admission.event);

        Ok(registration)
    }

    fn send_confirmation(&self, registration: Registration, event: Event) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation(&registration, &event).await {
                tracing::warn!(
                    registration_id = %registration.registration_id,
                    error = %e,
                    "Confirmation email failed"
                );
            }
        });
    }

    pub async fn get(&self, registration_id: &str) -> Result<Registration, RegistrationError> {
        self.registrations
            .find_by_code(registration_id.trim())
            .await?
            .ok_or_else(|| RegistrationError::NotFound(registration_id.to_string()))
    }

    pub async fn list_all(&self) -> Result<Vec<Registration>, RegistrationError> {
        Ok(self.registrations.list_all().await?)
    }

    pub async fn list_by_event(&self, event_id: &str) -> Result<Vec<Registration>, RegistrationError> {
        Ok(self.registrations.list_by_event(event_id).await?)
    }

    pub async fn list_by_email(&self, email: &str) -> Result<Vec<Registration>, RegistrationError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(RegistrationError::Invalid("email is required".to_string()));
        }
        Ok(self.registrations.list_by_email(&email).await?)
    }

    /// Moving to `checked-in` goes through the check-in engine so the audit
    /// record is written; a checked-in registration cannot move anywhere else.
    /// Reactivating a cancelled registration must win back its seat and must
    /// not collide with a newer registration for the same email.
    pub async fn update_status(
        &self,
        registration_id: &str,
        status: RegistrationStatus,
        actor: &str,
    ) -> Result<Registration, RegistrationError> {
        if status == RegistrationStatus::CheckedIn {
            let outcome = self
                .checkin
                .check_in(Selector::Manual(registration_id.to_string()), actor)
                .await
                .map_err(|e| match e {
                    CheckinError::NotFound => {
                        RegistrationError::NotFound(registration_id.to_string())
                    }
                    other => other.into(),
                })?;
            return Ok(match outcome {
                CheckinOutcome::Success { registration, .. }
                | CheckinOutcome::AlreadyCheckedIn { registration } => registration,
            });
        }

        let current = self.get(registration_id).await?;
        let limit = if status == RegistrationStatus::Cancelled {
            None
        } else {
            match self
                .allocator
                .seat_limit(&current.event_id, &current.ticket_tier)
                .await
            {
                Ok(limit) => Some(limit),
                // An active booking may stay put in a tier the event no longer offers.
                Err(SeatError::EventNotFound(_) | SeatError::UnknownTier { .. })
                    if current.status != RegistrationStatus::Cancelled =>
                {
                    None
                }
                Err(e) => return Err(e.into()),
            }
        };

        let change = self
            .registrations
            .update_status(&current.registration_id, status, limit)
            .await
            .map_err(admission_error)?;
        match change {
            StatusChange::Updated(registration) => {
                tracing::info!(registration_id, status = %status, changed_by = actor, "Registration status updated");
                Ok(registration)
            }
            StatusChange::CheckedIn(_) => {
                Err(RegistrationError::CheckedIn(registration_id.to_string()))
            }
            StatusChange::Missing => Err(RegistrationError::NotFound(registration_id.to_string())),
        }
    }
}
