use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::optional_admin;
use crate::services::{CheckinOutcome, Selector};
use crate::state::AppState;
use crate::utils::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub qr_data: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
}

impl VerifyRequest {
    fn selector(self) -> Result<Selector, AppError> {
        match (self.qr_data, self.registration_id) {
            (Some(qr), _) => Ok(Selector::Qr(qr)),
            (None, Some(code)) => Ok(Selector::Manual(code)),
            (None, None) => Err(AppError::ValidationError(
                "qrData or registrationId is required".to_string(),
            )),
        }
    }
}

/// `POST /checkins/verify`. A duplicate scan is a 200 with
/// `alreadyCheckedIn: true`, not an error.
pub async fn verify_checkin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let selector = request.selector()?;
    let actor = optional_admin(&state, &headers);

    let body = match state.checkin.check_in(selector, &actor).await? {
        CheckinOutcome::Success {
            registration,
            checkin,
        } => json!({
            "success": true,
            "alreadyCheckedIn": false,
            "message": "Check-in successful",
            "data": { "registration": registration, "checkin": checkin },
        }),
        CheckinOutcome::AlreadyCheckedIn { registration } => json!({
            "success": false,
            "alreadyCheckedIn": true,
            "message": "Already checked in",
            "data": { "registration": registration },
        }),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
