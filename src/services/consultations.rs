use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Consultation, ConsultationStatus, NewConsultation};
use crate::store::{ConsultationRepository, StoreError};

#[derive(Debug, Error)]
pub enum ConsultationError {
    #[error("{0}")]
    Invalid(String),

    #[error("Consultation {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn required(value: Option<String>) -> Result<String, ConsultationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConsultationError::Invalid("All fields are required".to_string()))
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[derive(Clone)]
pub struct ConsultationDesk {
    consultations: Arc<dyn ConsultationRepository>,
}

impl ConsultationDesk {
    pub fn new(consultations: Arc<dyn ConsultationRepository>) -> Self {
        Self { consultations }
    }

    pub async fn submit(&self, request: NewConsultation) -> Result<Consultation, ConsultationError> {
        let company = required(request.company)?;
        let contact = required(request.contact)?;
        let email = required(request.email)?;
        let phone = required(request.phone)?;
        let requirements = required(request.requirements)?;

        if !is_valid_email(&email) {
            return Err(ConsultationError::Invalid("Invalid email format".to_string()));
        }
        let phone: String = phone.chars().filter(char::is_ascii_digit).collect();
        if phone.is_empty() {
            return Err(ConsultationError::Invalid(
                "phone must contain digits".to_string(),
            ));
        }

        let now = Utc::now();
        let consultation = self
            .consultations
            .insert_consultation(Consultation {
                consultation_id: Uuid::new_v4(),
                company,
                contact,
                email: email.to_lowercase(),
                phone,
                requirements,
                status: ConsultationStatus::Pending,
                checked_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            consultation_id = %consultation.consultation_id,
            company = %consultation.company,
            "Consultation request submitted"
        );
        Ok(consultation)
    }

    pub async fn list(
        &self,
        status: Option<ConsultationStatus>,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        Ok(self.consultations.list_consultations(status).await?)
    }

    /// Marking a consultation `checkedIn` stamps `checked_at`.
    pub async fn update_status(
        &self,
        consultation_id: &str,
        status: ConsultationStatus,
    ) -> Result<Consultation, ConsultationError> {
        let not_found = || ConsultationError::NotFound(consultation_id.to_string());
        let id = Uuid::parse_str(consultation_id.trim()).map_err(|_| not_found())?;
        let checked_at = (status == ConsultationStatus::CheckedIn).then(Utc::now);

        let consultation = self
            .consultations
            .update_consultation_status(id, status, checked_at)
            .await?
            .ok_or_else(not_found)?;

        tracing::info!(consultation_id = %id, status = %status, "Consultation status updated");
        Ok(consultation)
    }

    pub async fn search(&self, email: &str) -> Result<Vec<Consultation>, ConsultationError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ConsultationError::Invalid(
                "Email parameter required".to_string(),
            ));
        }
        Ok(self.consultations.search_consultations(&email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Repositories;

    fn desk() -> ConsultationDesk {
        ConsultationDesk::new(Repositories::in_memory().consultations)
    }

    fn request(company: &str, email: &str) -> NewConsultation {
        NewConsultation {
            company: Some(company.to_string()),
            contact: Some("Ravi Menon".to_string()),
            email: Some(email.to_string()),
            phone: Some("+91 (98) 7654-3210".to_string()),
            requirements: Some("Badge printing for 400 guests".to_string()),
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("ops@acme.io"));
        assert!(!is_valid_email("ops@acme"));
        assert!(!is_valid_email("ops acme@x.io"));
        assert!(!is_valid_email("@acme.io"));
        assert!(!is_valid_email("a@b@acme.io"));
    }

    #[tokio::test]
    async fn test_submit_normalizes_fields() {
        let consultation = desk()
            .submit(request("Acme", "Ops@Acme.IO"))
            .await
            .unwrap();
        assert_eq!(consultation.email, "ops@acme.io");
        assert_eq!(consultation.phone, "919876543210");
        assert_eq!(consultation.status, ConsultationStatus::Pending);
        assert!(consultation.checked_at.is_none());
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_and_malformed() {
        let desk = desk();
        let mut missing = request("Acme", "ops@acme.io");
        missing.requirements = Some("   ".to_string());
        assert!(matches!(
            desk.submit(missing).await,
            Err(ConsultationError::Invalid(msg)) if msg == "All fields are required"
        ));
        assert!(matches!(
            desk.submit(request("Acme", "ops-at-acme")).await,
            Err(ConsultationError::Invalid(msg)) if msg == "Invalid email format"
        ));
    }

    #[tokio::test]
    async fn test_status_filter_and_checked_at() {
        let desk = desk();
        let first = desk.submit(request("Acme", "ops@acme.io")).await.unwrap();
        desk.submit(request("Globex", "hr@globex.com")).await.unwrap();

        let id = first.consultation_id.to_string();
        let done = desk
            .update_status(&id, ConsultationStatus::Completed)
            .await
            .unwrap();
        assert!(done.checked_at.is_none());

        let arrived = desk
            .update_status(&id, ConsultationStatus::CheckedIn)
            .await
            .unwrap();
        assert!(arrived.checked_at.is_some());

        let pending = desk.list(Some(ConsultationStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].company, "Globex");
        assert_eq!(desk.list(None).await.unwrap().len(), 2);

        assert!(matches!(
            desk.update_status("not-a-uuid", ConsultationStatus::Completed).await,
            Err(ConsultationError::NotFound(_))
        ));
        assert!(matches!(
            desk.update_status(&Uuid::new_v4().to_string(), ConsultationStatus::Completed)
                .await,
            Err(ConsultationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_matches_fragment() {
        let desk = desk();
        desk.submit(request("Acme", "ops@acme.io")).await.unwrap();
        desk.submit(request("Acme", "sales@acme.io")).await.unwrap();
        desk.submit(request("Globex", "hr@globex.com")).await.unwrap();

        assert_eq!(desk.search(" ACME ").await.unwrap().len(), 2);
        assert_eq!(desk.search("hr@globex.com").await.unwrap().len(), 1);
        assert!(matches!(
            desk.search("  ").await,
            Err(ConsultationError::Invalid(_))
        ));
    }
}
