use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::AuthError;
use crate::models::SYSTEM_ACTOR;
use crate::state::AppState;
use crate::utils::AppError;

/// Admin identity inserted into request extensions by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub username: String,
}

/// Rejects requests without a valid admin bearer token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let claims = state.auth.validate_authorization(header)?;
    request.extensions_mut().insert(AdminIdentity {
        username: claims.sub,
    });

    Ok(next.run(request).await)
}

/// Actor name for routes open to everyone: the admin's username when a
/// valid token is presented, `system` otherwise.
pub fn optional_admin(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| state.auth.validate_authorization(header).ok())
        .map(|claims| claims.sub)
        .unwrap_or_else(|| SYSTEM_ACTOR.to_string())
}
