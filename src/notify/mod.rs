//! Live notifications for dashboards.
//!
//! Mutations publish through [`Notifier`] after the store write has been
//! confirmed. Delivery is best-effort and at-most-once: nothing is persisted
//! and late subscribers get no replay. Clients connect on `/ws?eventId=` and
//! only see messages for that event.

pub mod events;
pub mod notifier;
pub mod socket;

pub use events::{Notification, NotificationMessage, RegistrationSummary};
pub use notifier::Notifier;
