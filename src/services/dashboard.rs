//! Read model for the admin dashboard and exports. Everything is recomputed
//! per request.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use super::events::{tier_availability, EventError};
use crate::models::{
    CheckinRecord, DashboardStats, DashboardView, Event, HourlyCount, RecentCheckin,
    Registration, RegistrationChannel, TierBreakdown,
};
use crate::store::{CheckinRepository, EventRepository, RegistrationRepository};

const RECENT_LIMIT: usize = 10;

/// Percentage with one decimal; zero when nobody registered.
pub fn attendance_rate(checked_in: u32, registered: u32) -> f64 {
    if registered == 0 {
        return 0.0;
    }
    let rate = f64::from(checked_in) / f64::from(registered) * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Check-ins on the UTC day of `now`, grouped by hour, ascending.
pub fn hourly_histogram(checkins: &[CheckinRecord], now: DateTime<Utc>) -> Vec<HourlyCount> {
    let today = now.date_naive();
    let mut buckets: BTreeMap<u32, u32> = BTreeMap::new();
    for checkin in checkins
        .iter()
        .filter(|c| c.checkin_time.date_naive() == today)
    {
        *buckets.entry(checkin.checkin_time.hour()).or_default() += 1;
    }
    buckets
        .into_iter()
        .map(|(hour, count)| HourlyCount { hour, count })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export<T> {
    pub event_name: String,
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationExportRow {
    #[serde(rename = "Registration ID")]
    pub registration_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Ticket Tier")]
    pub ticket_tier: String,
    #[serde(rename = "Registration Type")]
    pub registration_type: RegistrationChannel,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Checked In")]
    pub checked_in: &'static str,
    #[serde(rename = "Registration Date")]
    pub registration_date: String,
}

impl From<&Registration> for RegistrationExportRow {
    fn from(r: &Registration) -> Self {
        Self {
            registration_id: r.registration_id.clone(),
            name: r.name.clone(),
            email: r.email.clone(),
            phone: r.phone.clone(),
            ticket_tier: r.ticket_tier.clone(),
            registration_type: r.registration_type,
            status: r.status.to_string(),
            checked_in: if r.is_checked_in { "Yes" } else { "No" },
            registration_date: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckinExportRow {
    #[serde(rename = "Check-in ID")]
    pub checkin_id: String,
    #[serde(rename = "Registration ID")]
    pub registration_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Check-in Time")]
    pub checkin_time: String,
    #[serde(rename = "Checked In By")]
    pub checked_in_by: String,
}

impl CheckinExportRow {
    fn new(checkin: &CheckinRecord, registration: Option<&Registration>) -> Self {
        let field = |f: fn(&Registration) -> &str| {
            registration.map_or_else(|| "N/A".to_string(), |r| f(r).to_string())
        };
        Self {
            checkin_id: checkin.checkin_id.to_string(),
            registration_id: checkin.registration_id.clone(),
            name: field(|r| &r.name),
            email: field(|r| &r.email),
            phone: field(|r| &r.phone),
            checkin_time: checkin.checkin_time.to_rfc3339(),
            checked_in_by: checkin.checked_in_by.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardAggregator {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    checkins: Arc<dyn CheckinRepository>,
}

impl DashboardAggregator {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        checkins: Arc<dyn CheckinRepository>,
    ) -> Self {
        Self {
            events,
            registrations,
            checkins,
        }
    }

    async fn event(&self, event_id: &str) -> Result<Event, EventError> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| EventError::NotFound(event_id.to_string()))
    }

    pub async fn dashboard(
        &self,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DashboardView, EventError> {
        let event = self.event(event_id).await?;
        let registrations = self.registrations.list_by_event(event_id).await?;
        let checkins = self.checkins.list_checkins(event_id).await?;

        let active: Vec<&Registration> = registrations.iter().filter(|r| r.is_active()).collect();
        let total_registrations = active.len() as u32;
        let total_checkins = active.iter().filter(|r| r.is_checked_in).count() as u32;
        let by_channel = |channel: RegistrationChannel| {
            active
                .iter()
                .filter(|r| r.registration_type == channel)
                .count() as u32
        };

        let statistics = DashboardStats {
            total_registrations,
            total_checkins,
            online_registrations: by_channel(RegistrationChannel::Online),
            kiosk_registrations: by_channel(RegistrationChannel::Kiosk),
            attendance_rate: attendance_rate(total_checkins, total_registrations),
        };

        let tiers = tier_availability(&event, &registrations)
            .into_iter()
            .map(|tier| TierBreakdown {
                checked_in: active
                    .iter()
                    .filter(|r| r.is_checked_in && r.ticket_tier.eq_ignore_ascii_case(&tier.name))
                    .count() as u32,
                registrations: tier.booked,
                seats: tier.seats,
                tier: tier.name,
            })
            .collect();

        let by_id: HashMap<&str, &Registration> = registrations
            .iter()
            .map(|r| (r.registration_id.as_str(), r))
            .collect();
        let recent_checkins = checkins
            .iter()
            .take(RECENT_LIMIT)
            .map(|checkin| RecentCheckin {
                registration: by_id.get(checkin.registration_id.as_str()).map(|r| (*r).clone()),
                checkin: checkin.clone(),
            })
            .collect();

        Ok(DashboardView {
            statistics,
            tiers,
            recent_registrations: registrations.iter().take(RECENT_LIMIT).cloned().collect(),
            recent_checkins,
            hourly_checkins: hourly_histogram(&checkins, now),
            event,
        })
    }

    pub async fn export_registrations(
        &self,
        event_id: &str,
    ) -> Result<Export<RegistrationExportRow>, EventError> {
        let event = self.event(event_id).await?;
        let registrations = self.registrations.list_by_event(event_id).await?;
        Ok(Export {
            event_name: event.name,
            data: registrations.iter().map(RegistrationExportRow::from).collect(),
        })
    }

    pub async fn export_checkins(
        &self,
        event_id: &str,
    ) -> Result<Export<CheckinExportRow>, EventError> {
        let event = self.event(event_id).await?;
        let registrations = self.registrations.list_by_event(event_id).await?;
        let checkins = self.checkins.list_checkins(event_id).await?;

        let data = checkins
            .iter()
            .map(|checkin| {
                let registration = registrations
                    .iter()
                    .find(|r| r.registration_id == checkin.registration_id);
                CheckinExportRow::new(checkin, registration)
            })
            .collect();
        Ok(Export {
            event_name: event.name,
            data,
        })
    }
}
