//! Tests for recurring availability expansion.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use slot_engine::{expand_recurring, EngineError, LeaderId, RecurringAvailability};

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A Monday.
fn first_monday() -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    assert_eq!(date.weekday(), Weekday::Mon);
    date
}

fn declaration(rrule: &str) -> RecurringAvailability {
    RecurringAvailability {
        leader_id: LeaderId::new("lead-1"),
        rrule: rrule.to_string(),
        first_date: first_monday(),
        start_time: hm(18, 0),
        end_time: hm(22, 0),
        timezone: "UTC".to_string(),
        until: None,
        count: None,
        is_public: true,
        notes: Some("weekly rehearsal block".to_string()),
    }
}

#[test]
fn weekly_pattern_expands_to_one_row_per_occurrence() {
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO,WE");
    decl.count = Some(4);

    let rows = expand_recurring(&decl).unwrap();

    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 6).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 11).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 13).unwrap(),
        ]
    );
    for row in &rows {
        assert_eq!(row.leader_id, LeaderId::new("lead-1"));
        assert_eq!(row.start_time, hm(18, 0));
        assert_eq!(row.end_time, hm(22, 0));
        assert!(row.is_active);
        assert!(row.is_public);
        assert_eq!(row.notes.as_deref(), Some("weekly rehearsal block"));
    }
    // Each row gets its own identity.
    assert_ne!(rows[0].id, rows[1].id);
}

#[test]
fn until_bounds_the_expansion_inclusively() {
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO");
    decl.until = Some(NaiveDate::from_ymd_opt(2026, 5, 18).unwrap());

    let rows = expand_recurring(&decl).unwrap();

    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 11).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 18).unwrap(),
        ]
    );
}

#[test]
fn occurrences_keep_the_local_calendar_date() {
    // 18:00 in Los Angeles is past midnight UTC; the rows must carry the
    // leader's local date, not the UTC one.
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO");
    decl.timezone = "America/Los_Angeles".to_string();
    decl.count = Some(1);

    let rows = expand_recurring(&decl).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, first_monday());
}

#[test]
fn zero_count_expands_to_nothing() {
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO");
    decl.count = Some(0);
    assert!(expand_recurring(&decl).unwrap().is_empty());
}

#[test]
fn empty_rule_is_rejected() {
    let decl = declaration("");
    assert!(matches!(
        expand_recurring(&decl),
        Err(EngineError::InvalidRule(_))
    ));
}

#[test]
fn garbage_rule_is_rejected() {
    let decl = declaration("FREQ=SOMETIMES");
    assert!(matches!(
        expand_recurring(&decl),
        Err(EngineError::InvalidRule(_))
    ));
}

#[test]
fn unknown_timezone_is_rejected() {
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO");
    decl.timezone = "Mars/Olympus_Mons".to_string();
    assert!(matches!(
        expand_recurring(&decl),
        Err(EngineError::InvalidTimezone(_))
    ));
}

#[test]
fn inverted_time_bounds_are_rejected() {
    let mut decl = declaration("FREQ=WEEKLY;BYDAY=MO");
    decl.start_time = hm(22, 0);
    decl.end_time = hm(18, 0);
    assert!(matches!(
        expand_recurring(&decl),
        Err(EngineError::InvalidInterval { .. })
    ));
}
