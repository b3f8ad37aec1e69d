use std::sync::Arc;

use crate::auth::AdminAuth;
use crate::mailer::Mailer;
use crate::notify::Notifier;
use crate::services::{
    CheckinEngine, ConsultationDesk, DashboardAggregator, EventCatalog, RegistrationLedger,
    SeatAllocator,
};
use crate::store::Repositories;

/// Shared by every handler behind an `Arc`.
pub struct AppState {
    pub notifier: Arc<Notifier>,
    pub auth: AdminAuth,
    pub events: EventCatalog,
    pub seats: SeatAllocator,
    pub ledger: RegistrationLedger,
    pub checkin: CheckinEngine,
    pub dashboard: DashboardAggregator,
    pub consultations: ConsultationDesk,
}

impl AppState {
    pub fn new(repos: Repositories, auth: AdminAuth, mailer: Arc<dyn Mailer>) -> Self {
        let notifier = Arc::new(Notifier::default());
        let seats = SeatAllocator::new(repos.events.clone(), repos.registrations.clone());
        let checkin = CheckinEngine::new(
            repos.registrations.clone(),
            repos.checkins.clone(),
            notifier.clone(),
        );
        let ledger = RegistrationLedger::new(
            repos.registrations.clone(),
            seats.clone(),
            checkin.clone(),
            notifier.clone(),
            mailer,
        );

        Self {
            consultations: ConsultationDesk::new(repos.consultations),
            events: EventCatalog::new(repos.events.clone(), repos.registrations.clone()),
            dashboard: DashboardAggregator::new(repos.events, repos.registrations, repos.checkins),
            notifier,
            auth,
            seats,
            ledger,
            checkin,
        }
    }
}
