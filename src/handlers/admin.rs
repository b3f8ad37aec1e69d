use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::IssuedToken;
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppError;

const MAX_USERNAME_LEN: usize = 50;
const MAX_PASSWORD_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    #[serde(flatten)]
    pub token: IssuedToken,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::ValidationError(
            "username and password are required".to_string(),
        ));
    }
    if username.len() > MAX_USERNAME_LEN || request.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::ValidationError(
            "username or password is too long".to_string(),
        ));
    }

    if let Err(e) = state.auth.authenticate(username, &request.password) {
        tracing::warn!(username, "Admin login failed");
        return Err(e.into());
    }
    let token = state.auth.issue_token(username)?;
    tracing::info!(username, "Admin logged in");

    Ok(success(
        LoginResponse {
            username: username.to_string(),
            token,
        },
        "Login successful",
    ))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let view = state.dashboard.dashboard(&event_id, Utc::now()).await?;
    Ok(success(view, "Dashboard retrieved successfully"))
}

pub async fn export_registrations(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let export = state.dashboard.export_registrations(&event_id).await?;
    Ok(success(export, "Registrations exported"))
}

pub async fn export_checkins(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let export = state.dashboard.export_checkins(&event_id).await?;
    Ok(success(export, "Check-ins exported"))
}
