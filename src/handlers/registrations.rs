use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::AdminIdentity;
use crate::models::{RegistrationRequest, RegistrationStatus};
use crate::state::AppState;
use crate::utils::response::{created, listed, success};
use crate::utils::AppError;

pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let registration = state.ledger.register(request).await?;
    Ok(created(registration, "Registration successful"))
}

/// Admin only.
pub async fn list_registrations(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let registrations = state.ledger.list_all().await?;
    Ok(listed(registrations, "Registrations retrieved successfully"))
}

pub async fn get_registration(
    State(state): State<Arc<AppState>>,
    Path(registration_id): Path<String>,
) -> Result<Response, AppError> {
    let registration = state.ledger.get(&registration_id).await?;
    Ok(success(registration, "Registration retrieved successfully"))
}

pub async fn list_event_registrations(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let registrations = state.ledger.list_by_event(&event_id).await?;
    Ok(listed(registrations, "Registrations retrieved successfully"))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

/// `GET /registrations/search?email=`
pub async fn search_registrations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let registrations = state.ledger.list_by_email(&query.email).await?;
    Ok(listed(registrations, "Registrations retrieved successfully"))
}

/// `GET /registrations/user/:email`
pub async fn user_registrations(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Response, AppError> {
    let registrations = state.ledger.list_by_email(&email).await?;
    Ok(listed(registrations, "Registrations retrieved successfully"))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Admin only. `checked-in` goes through the check-in engine.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(registration_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(update) = payload?;
    let status: RegistrationStatus = update.status.trim().parse().map_err(|_| {
        AppError::ValidationError(format!(
            "status must be one of pending, confirmed, cancelled, checked-in (got '{}')",
            update.status
        ))
    })?;

    let registration = state
        .ledger
        .update_status(&registration_id, status, &admin.username)
        .await?;
    Ok(success(registration, "Registration status updated"))
}
