use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::handlers::registrations::EmailQuery;
use crate::models::{ConsultationStatus, NewConsultation};
use crate::state::AppState;
use crate::utils::response::{created, listed, success};
use crate::utils::AppError;

fn parse_status(raw: &str) -> Result<ConsultationStatus, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ValidationError(format!(
            "status must be one of pending, completed, checkedIn (got '{raw}')"
        ))
    })
}

pub async fn submit_consultation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewConsultation>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let consultation = state.consultations.submit(request).await?;
    Ok(created(consultation, "Consultation request submitted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// Admin only. `GET /consultations?status=`
pub async fn list_consultations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatusFilter>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(filter) = query?;
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_status)
        .transpose()?;
    let consultations = state.consultations.list(status).await?;
    Ok(listed(consultations, "Consultations retrieved successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ConsultationStatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// Admin only.
pub async fn update_consultation_status(
    State(state): State<Arc<AppState>>,
    Path(consultation_id): Path<String>,
    payload: Result<Json<ConsultationStatusUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(update) = payload?;
    let status = parse_status(&update.status)?;
    let consultation = state
        .consultations
        .update_status(&consultation_id, status)
        .await?;
    Ok(success(consultation, "Consultation status updated"))
}

/// `GET /consultations/search?email=`
pub async fn search_consultations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let consultations = state.consultations.search(&query.email).await?;
    Ok(listed(consultations, "Consultations retrieved successfully"))
}
