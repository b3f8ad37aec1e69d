//! Event registration and check-in service.
//!
//! Attendees register for an event tier, receive a short registration code
//! and a QR payload, and are checked in at the door by scan or by code.
//! Admin dashboards follow registrations and check-ins live over a websocket.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
