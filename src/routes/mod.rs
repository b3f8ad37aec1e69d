use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{
    admin, bookings, checkins, consultations, events, health_check, registrations,
};
use crate::notify::socket::ws_handler;
use crate::state::AppState;

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", get(events::list_events))
        .route("/events/:event_id", get(events::get_event))
        .route("/bookings", post(bookings::validate_booking))
        .route("/registrations", post(registrations::create_registration))
        .route("/registrations/search", get(registrations::search_registrations))
        .route(
            "/registrations/event/:event_id",
            get(registrations::list_event_registrations),
        )
        .route(
            "/registrations/user/:email",
            get(registrations::user_registrations),
        )
        .route(
            "/registrations/:registration_id",
            get(registrations::get_registration),
        )
        .route("/checkins/verify", post(checkins::verify_checkin))
        .route("/consultations", post(consultations::submit_consultation))
        .route(
            "/consultations/search",
            get(consultations::search_consultations),
        )
        .route("/admin/login", post(admin::login))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", post(events::create_event))
        .route(
            "/events/:event_id",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/registrations", get(registrations::list_registrations))
        .route(
            "/registrations/:registration_id/status",
            patch(registrations::update_status),
        )
        .route("/consultations", get(consultations::list_consultations))
        .route(
            "/consultations/:consultation_id/status",
            patch(consultations::update_consultation_status),
        )
        .route("/admin/dashboard/:event_id", get(admin::dashboard))
        .route(
            "/admin/export/registrations/:event_id",
            get(admin::export_registrations),
        )
        .route("/admin/export/checkins/:event_id", get(admin::export_checkins))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

pub fn create_routes(state: Arc<AppState>, config: &Config) -> Router {
    let api = public_routes().merge(admin_routes(state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.server.cors_allowed_origins))
        .with_state(state)
}
