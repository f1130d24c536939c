//! Tests for conflict detection — buffer handling, status and relevance
//! filtering, ordering.

use chrono::{NaiveDate, NaiveTime};
use slot_engine::conflict::find_conflicting_events;
use slot_engine::interval::Interval;
use slot_engine::policy::MidnightPolicy;
use slot_engine::{EngineConfig, EngineError, Event, EventId, EventStatus, Invite, InviteResponse, LeaderId};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 14).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn event(
    id: &str,
    created_by: &LeaderId,
    start: NaiveTime,
    end: NaiveTime,
    status: EventStatus,
) -> Event {
    Event {
        id: EventId::new(id),
        event_date: date(),
        start_time: start,
        end_time: end,
        status,
        created_by: created_by.clone(),
        invites: Vec::new(),
    }
}

fn window(start: NaiveTime, end: NaiveTime) -> Interval {
    Interval::from_times(start, end).unwrap()
}

#[test]
fn occupying_event_inside_the_window_conflicts() {
    let leader = LeaderId::new("lead-1");
    let events = vec![event("e1", &leader, hm(12, 0), hm(13, 0), EventStatus::Approved)];

    let hits = find_conflicting_events(
        &events,
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, EventId::new("e1"));
}

#[test]
fn buffer_extends_the_window_on_both_sides() {
    let leader = LeaderId::new("lead-1");
    // Window 09:00-17:00 with a 40-minute buffer reaches back to 08:20.
    // An event ending 08:21 conflicts; one ending exactly 08:20 does not.
    let events = vec![
        event("grazes", &leader, hm(7, 0), hm(8, 21), EventStatus::Approved),
        event("clears", &leader, hm(7, 0), hm(8, 20), EventStatus::Approved),
        event("late-grazes", &leader, hm(17, 39), hm(18, 30), EventStatus::Approved),
        event("late-clears", &leader, hm(17, 40), hm(18, 30), EventStatus::Approved),
    ];

    let hits = find_conflicting_events(
        &events,
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    let ids: Vec<&str> = hits.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["grazes", "late-grazes"]);
}

#[test]
fn rejected_and_cancelled_events_do_not_occupy() {
    let leader = LeaderId::new("lead-1");
    let events = vec![
        event("r", &leader, hm(12, 0), hm(13, 0), EventStatus::Rejected),
        event("c", &leader, hm(14, 0), hm(15, 0), EventStatus::Cancelled),
    ];

    let hits = find_conflicting_events(
        &events,
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    assert!(hits.is_empty());
}

#[test]
fn unrelated_events_are_not_relevant() {
    let leader = LeaderId::new("lead-1");
    let stranger = LeaderId::new("lead-2");
    let events = vec![event("e1", &stranger, hm(12, 0), hm(13, 0), EventStatus::Approved)];

    let hits = find_conflicting_events(
        &events,
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    assert!(hits.is_empty());
}

#[test]
fn an_invite_makes_the_event_relevant_regardless_of_response() {
    let leader = LeaderId::new("lead-1");
    let organizer = LeaderId::new("lead-2");
    let mut declined = event("e1", &organizer, hm(12, 0), hm(13, 0), EventStatus::Confirmed);
    declined.invites.push(Invite {
        musician_id: leader.clone(),
        response: InviteResponse::Unavailable,
    });

    let hits = find_conflicting_events(
        &vec![declined],
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    assert_eq!(hits.len(), 1);
}

#[test]
fn events_on_other_dates_are_ignored() {
    let leader = LeaderId::new("lead-1");
    let mut tomorrow = event("e1", &leader, hm(12, 0), hm(13, 0), EventStatus::Approved);
    tomorrow.event_date = date().succ_opt().unwrap();

    let hits = find_conflicting_events(
        &vec![tomorrow],
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    assert!(hits.is_empty());
}

#[test]
fn results_are_sorted_by_start_time() {
    let leader = LeaderId::new("lead-1");
    let events = vec![
        event("afternoon", &leader, hm(15, 0), hm(16, 0), EventStatus::Approved),
        event("morning", &leader, hm(10, 0), hm(11, 0), EventStatus::Proposed),
        event("midday", &leader, hm(12, 0), hm(13, 0), EventStatus::Confirmed),
    ];

    let hits = find_conflicting_events(
        &events,
        &leader,
        date(),
        window(hm(9, 0), hm(17, 0)),
        &EngineConfig::default(),
    )
    .unwrap();

    let ids: Vec<&str> = hits.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["morning", "midday", "afternoon"]);
}

#[test]
fn reject_policy_refuses_windows_whose_buffer_leaves_the_day() {
    let leader = LeaderId::new("lead-1");
    let config = EngineConfig {
        midnight_policy: MidnightPolicy::Reject,
        ..EngineConfig::default()
    };

    let result = find_conflicting_events(
        &Vec::<Event>::new(),
        &leader,
        date(),
        window(hm(23, 0), hm(23, 50)),
        &config,
    );

    assert!(matches!(result, Err(EngineError::BufferOverflow { .. })));

    // The default policy clamps instead and the scan proceeds.
    let hits = find_conflicting_events(
        &Vec::<Event>::new(),
        &leader,
        date(),
        window(hm(23, 0), hm(23, 50)),
        &EngineConfig::default(),
    )
    .unwrap();
    assert!(hits.is_empty());
}
