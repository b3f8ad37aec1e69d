//! Check-in state machine: `NotCheckedIn -> CheckedIn`, terminal.
//!
//! QR scans and manual entry resolve to one `(registrationId, eventId)` pair
//! before any state is touched. The transition itself is a single conditional
//! store write, so concurrent scans of one badge produce exactly one
//! check-in record.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use super::qr::decode_scan;
use crate::models::{CheckinRecord, Registration};
use crate::notify::{Notification, Notifier};
use crate::store::{CheckinRepository, CheckinTransition, RegistrationRepository, StoreError};

#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("Invalid QR code: {0:?}")]
    InvalidSelector(String),

    #[error("Registration not found")]
    NotFound,

    #[error("Registration {0} is cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub enum Selector {
    /// Raw scanned text.
    Qr(String),
    /// Registration code typed in by staff.
    Manual(String),
}

#[derive(Debug, Clone)]
pub enum CheckinOutcome {
    Success {
        registration: Registration,
        checkin: CheckinRecord,
    },
    /// Duplicate scan; nothing was written.
    AlreadyCheckedIn { registration: Registration },
}

#[derive(Clone)]
pub struct CheckinEngine {
    registrations: Arc<dyn RegistrationRepository>,
    checkins: Arc<dyn CheckinRepository>,
    notifier: Arc<Notifier>,
}

impl CheckinEngine {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        checkins: Arc<dyn CheckinRepository>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            registrations,
            checkins,
            notifier,
        }
    }

    async fn resolve(&self, selector: &Selector) -> Result<(String, String), CheckinError> {
        match selector {
            Selector::Qr(raw) => decode_scan(raw),
            Selector::Manual(code) => {
                let code = code.trim();
                if code.is_empty() {
                    return Err(CheckinError::InvalidSelector(code.to_string()));
                }
                let registration = self
                    .registrations
                    .find_by_code(code)
                    .await?
                    .ok_or(CheckinError::NotFound)?;
                Ok((registration.registration_id, registration.event_id))
            }
        }
    }

    pub async fn check_in(
        &self,
        selector: Selector,
        actor: &str,
    ) -> Result<CheckinOutcome, CheckinError> {
        let (registration_id, event_id) = self.resolve(&selector).await?;

        let registration = self
            .registrations
            .find(&registration_id, &event_id)
            .await?
            .ok_or(CheckinError::NotFound)?;
        if registration.is_checked_in {
            return Ok(CheckinOutcome::AlreadyCheckedIn { registration });
        }
        if !registration.is_active() {
            return Err(CheckinError::Cancelled(registration_id));
        }

        let record = CheckinRecord::new(&registration_id, &event_id, actor, Utc::now());
        let registration = match self.checkins.record_checkin(record.clone()).await? {
            CheckinTransition::Applied(registration) => registration,
            // Lost a race with another scan of the same badge.
            CheckinTransition::AlreadyCheckedIn(registration) => {
                return Ok(CheckinOutcome::AlreadyCheckedIn { registration })
            }
            CheckinTransition::Cancelled(_) => {
                return Err(CheckinError::Cancelled(registration_id))
            }
            CheckinTransition::Missing => return Err(CheckinError::NotFound),
        };

        tracing::info!(
            registration_id = %registration.registration_id,
            event_id = %registration.event_id,
            checked_in_by = actor,
            "Attendee checked in"
        );
        self.publish_count(&event_id).await;

        Ok(CheckinOutcome::Success {
            registration,
            checkin: record,
        })
    }

    /// Runs after the write is durable. A failed recount is logged and skipped.
    async fn publish_count(&self, event_id: &str) {
        match self.registrations.count_checked_in(event_id).await {
            Ok(checked_in_count) => self.notifier.publish(Notification::NewCheckin {
                event_id: event_id.to_string(),
                checked_in_count,
            }),
            Err(e) => {
                tracing::warn!(event_id, error = %e, "Check-in count unavailable, update not published")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SYSTEM_ACTOR;
    use crate::services::testing::seed_registration;
    use crate::store::Repositories;

    fn engine(repos: &Repositories, notifier: Arc<Notifier>) -> CheckinEngine {
        CheckinEngine::new(repos.registrations.clone(), repos.checkins.clone(), notifier)
    }

    #[tokio::test]
    async fn test_manual_not_found_then_success_then_duplicate() {
        let repos = Repositories::in_memory();
        let notifier = Arc::new(Notifier::default());
        let mut rx = notifier.subscribe();
        let engine = engine(&repos, notifier);

        assert!(matches!(
            engine
                .check_in(Selector::Manual("AB12CD34".into()), SYSTEM_ACTOR)
                .await,
            Err(CheckinError::NotFound)
        ));

        seed_registration(&repos, "AB12CD34", "E1", "a@x.io", "gold").await;

        match engine
            .check_in(Selector::Manual("AB12CD34".into()), "door-1")
            .await
            .unwrap()
        {
            CheckinOutcome::Success {
                registration,
                checkin,
            } => {
                assert!(registration.is_checked_in);
                assert_eq!(registration.checked_in_at, Some(checkin.checkin_time));
                assert_eq!(checkin.checked_in_by, "door-1");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            engine
                .check_in(Selector::Qr("AB12CD34|E1".into()), SYSTEM_ACTOR)
                .await
                .unwrap(),
            CheckinOutcome::AlreadyCheckedIn { .. }
        ));
        assert_eq!(
            repos.checkins.count_for_registration("AB12CD34").await.unwrap(),
            1
        );

        let msg = rx.recv().await.unwrap();
        assert!(matches!(
            msg.notification,
            Notification::NewCheckin { checked_in_count: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_qr_with_wrong_event_is_not_found() {
        let repos = Repositories::in_memory();
        seed_registration(&repos, "AB12CD34", "E1", "a@x.io", "gold").await;
        let engine = engine(&repos, Arc::new(Notifier::default()));

        assert!(matches!(
            engine
                .check_in(Selector::Qr("AB12CD34|E2".into()), SYSTEM_ACTOR)
                .await,
            Err(CheckinError::NotFound)
        ));
        assert!(matches!(
            engine.check_in(Selector::Qr("garbage".into()), SYSTEM_ACTOR).await,
            Err(CheckinError::InvalidSelector(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_registration_cannot_check_in() {
        let repos = Repositories::in_memory();
        seed_registration(&repos, "AB12CD34", "E1", "a@x.io", "gold").await;
        repos
            .registrations
            .update_status("AB12CD34", crate::models::RegistrationStatus::Cancelled, None)
            .await
            .unwrap();
        let engine = engine(&repos, Arc::new(Notifier::default()));

        assert!(matches!(
            engine
                .check_in(Selector::Manual("AB12CD34".into()), SYSTEM_ACTOR)
                .await,
            Err(CheckinError::Cancelled(_))
        ));
        assert_eq!(
            repos.checkins.count_for_registration("AB12CD34").await.unwrap(),
            0
        );
    }
}
