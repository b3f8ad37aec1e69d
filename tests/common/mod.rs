#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::util::ServiceExt;

use checkin_server::auth::AdminAuth;
use checkin_server::config::Config;
use checkin_server::mailer::LogMailer;
use checkin_server::models::{Event, TicketTier};
use checkin_server::routes::create_routes;
use checkin_server::state::AppState;
use checkin_server::store::Repositories;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin-pass";

pub fn test_state() -> (Arc<AppState>, Repositories) {
    let repos = Repositories::in_memory();
    let mut auth = AdminAuth::new("integration-secret-that-is-at-least-32-chars", 3600)
        .with_hash_cost(4);
    auth.add_admin(ADMIN_USER, ADMIN_PASS).unwrap();
    let state = Arc::new(AppState::new(repos.clone(), auth, Arc::new(LogMailer)));
    (state, repos)
}

pub fn test_app() -> (Router, Arc<AppState>, Repositories) {
    let (state, repos) = test_state();
    let config = Config::from_lookup(|_| None).unwrap();
    (create_routes(state.clone(), &config), state, repos)
}

/// `gold`: 2 seats at 500.
pub fn gold_event(event_id: &str) -> Event {
    let now = Utc::now();
    Event {
        event_id: event_id.to_string(),
        name: format!("Event {event_id}"),
        date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        time: "09:30".to_string(),
        venue: "Main Hall".to_string(),
        description: "Annual meetup".to_string(),
        image_url: String::new(),
        is_active: true,
        max_capacity: 100,
        ticket_tiers: vec![TicketTier {
            name: "gold".to_string(),
            price: Decimal::new(500, 0),
            seats: 2,
        }],
        created_at: now,
        updated_at: now,
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn admin_token(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/admin/login",
        Some(serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}
