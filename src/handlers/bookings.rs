use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub event_id: String,
    #[serde(default)]
    pub ticket_tier: Option<String>,
    #[serde(default)]
    pub ticket_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuote {
    pub event_id: String,
    pub ticket_tier: String,
    pub ticket_price: Decimal,
    pub quantity: u32,
    pub total_amount: Decimal,
    pub available_seats: u32,
}

/// `POST /bookings`: validates a booking against current seat counts. Writes
/// nothing; the registration is what takes the seat.
pub async fn validate_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let admission = state
        .seats
        .reserve(
            request.event_id.trim(),
            request.ticket_tier.as_deref(),
            request.quantity.unwrap_or(1),
            request.ticket_price,
        )
        .await?;

    let quote = BookingQuote {
        event_id: admission.event.event_id,
        ticket_tier: admission.tier.name,
        ticket_price: admission.unit_price,
        quantity: admission.units,
        total_amount: admission.total_amount,
        available_seats: admission.remaining,
    };
    Ok(success(quote, "Booking validated"))
}
