pub mod checkin;
pub mod consultation;
pub mod dashboard;
pub mod event;
pub mod registration;

pub use checkin::{CheckinRecord, SYSTEM_ACTOR};
pub use consultation::{Consultation, ConsultationStatus, NewConsultation};
pub use dashboard::{DashboardStats, DashboardView, HourlyCount, RecentCheckin, TierBreakdown};
pub use event::{
    Event, EventSummary, EventUpdate, NewEvent, TicketTier, TierAvailability, GENERAL_TIER,
};
pub use registration::{
    Attendee, Registration, RegistrationChannel, RegistrationRequest, RegistrationStatus,
};
