use serde::Serialize;

use super::{CheckinRecord, Event, Registration};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_registrations: u32,
    pub total_checkins: u32,
    pub online_registrations: u32,
    pub kiosk_registrations: u32,
    /// Percentage of registrations checked in, one decimal place.
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBreakdown {
    pub tier: String,
    pub seats: u32,
    pub registrations: u32,
    pub checked_in: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCheckin {
    #[serde(flatten)]
    pub checkin: CheckinRecord,
    pub registration: Option<Registration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub event: Event,
    pub statistics: DashboardStats,
    pub tiers: Vec<TierBreakdown>,
    pub recent_registrations: Vec<Registration>,
    pub recent_checkins: Vec<RecentCheckin>,
    pub hourly_checkins: Vec<HourlyCount>,
}
