use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::models::{EventUpdate, NewEvent};
use crate::state::AppState;
use crate::utils::response::{created, listed, success};
use crate::utils::AppError;

/// `GET /events`: active events with seat availability.
pub async fn list_events(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let events = state.events.list().await?;
    Ok(listed(events, "Events retrieved successfully"))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let event = state.events.get(&event_id).await?;
    Ok(success(event, "Event retrieved successfully"))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let event = state.events.create(input).await?;
    Ok(created(event, "Event created successfully"))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(update) = payload?;
    let event = state.events.update(&event_id, update).await?;
    Ok(success(event, "Event updated successfully"))
}

/// Soft delete.
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let event = state.events.deactivate(&event_id).await?;
    Ok(success(event, "Event deactivated successfully"))
}
