//! Domain services. Each depends on the repository traits only.

pub mod checkin;
pub mod consultations;
pub mod dashboard;
pub mod events;
pub mod ledger;
pub mod qr;
pub mod seats;

pub use checkin::{CheckinEngine, CheckinError, CheckinOutcome, Selector};
pub use consultations::{ConsultationDesk, ConsultationError};
pub use dashboard::DashboardAggregator;
pub use events::{EventCatalog, EventError};
pub use ledger::{RegistrationError, RegistrationLedger};
pub use seats::{Admission, SeatAllocator, SeatError};
