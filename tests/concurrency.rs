mod common;

use std::sync::Arc;

use checkin_server::models::{Attendee, RegistrationRequest, SYSTEM_ACTOR};
use checkin_server::services::{CheckinOutcome, RegistrationError, SeatError, Selector};
use checkin_server::store::{CheckinRepository, EventRepository, RegistrationRepository};
use common::{gold_event, test_state};

fn request(email: &str) -> RegistrationRequest {
    RegistrationRequest {
        event_id: "E1".to_string(),
        attendee: Attendee {
            name: "Racer".to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
            organization: None,
            designation: None,
        },
        registration_type: None,
        ticket_tier: Some("gold".to_string()),
        ticket_price: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_checkins_write_one_record() {
    let (state, repos) = test_state();
    repos.events.insert_event(gold_event("E1")).await.unwrap();
    let registration = state.ledger.register(request("a@example.com")).await.unwrap();
    let code = registration.registration_id.clone();

    let mut handles = Vec::new();
    for i in 0..16 {
        let state = Arc::clone(&state);
        let selector = if i % 2 == 0 {
            Selector::Qr(format!("{code}|E1"))
        } else {
            Selector::Manual(code.clone())
        };
        handles.push(tokio::spawn(async move {
            state.checkin.check_in(selector, SYSTEM_ACTOR).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            CheckinOutcome::Success { .. } => successes += 1,
            CheckinOutcome::AlreadyCheckedIn { registration } => {
                assert!(registration.is_checked_in)
            }
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(repos.checkins.count_for_registration(&code).await.unwrap(), 1);
    let stored = repos.registrations.find(&code, "E1").await.unwrap().unwrap();
    assert!(stored.is_checked_in);
    assert!(stored.checked_in_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_registrations_never_exceed_seats() {
    let (state, repos) = test_state();
    repos.events.insert_event(gold_event("E1")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..12 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            state.ledger.register(request(&format!("racer{i}@example.com"))).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(RegistrationError::Seat(SeatError::SeatsExhausted { .. })) => {}
            Err(other) => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(admitted, 2);
    assert_eq!(repos.registrations.count_booked("E1", "gold").await.unwrap(), 2);
}

#[tokio::test]
async fn test_scenario_gold_tier_then_checkin() {
    let (state, repos) = test_state();
    repos.events.insert_event(gold_event("E1")).await.unwrap();

    let quote = state.seats.reserve("E1", Some("gold"), 1, None).await.unwrap();
    assert_eq!(quote.total_amount.to_string(), "500");

    let a = state.ledger.register(request("a@example.com")).await.unwrap();
    state.ledger.register(request("b@example.com")).await.unwrap();
    assert!(matches!(
        state.ledger.register(request("c@example.com")).await,
        Err(RegistrationError::Seat(SeatError::SeatsExhausted { .. }))
    ));

    let first = state
        .checkin
        .check_in(Selector::Manual(a.registration_id.clone()), SYSTEM_ACTOR)
        .await
        .unwrap();
    assert!(matches!(first, CheckinOutcome::Success { .. }));
    let second = state
        .checkin
        .check_in(Selector::Qr(a.qr_payload.clone()), SYSTEM_ACTOR)
        .await
        .unwrap();
    assert!(matches!(second, CheckinOutcome::AlreadyCheckedIn { .. }));
}
