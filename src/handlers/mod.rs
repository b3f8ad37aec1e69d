pub mod admin;
pub mod bookings;
pub mod checkins;
pub mod consultations;
pub mod events;
pub mod registrations;

use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "checkin-server",
    };

    success(payload, "Health check successful")
}
