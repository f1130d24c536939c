//! Recurring availability expansion — weekly declarations into per-date rows.
//!
//! Leaders publish recurring blocks of personal time; the reconciliation
//! core only understands per-date fragments. This module turns an RFC 5545
//! weekly pattern into concrete [`LeaderAvailability`] rows, one per
//! occurrence date, ready to feed through
//! [`reconcile_availability_created`](crate::reconcile::ReconcileEngine::reconcile_availability_created).
//!
//! Expansion is timezone-aware (a leader's "every Tuesday 18:00" follows
//! their local clock), but the produced rows are naive dates and times, as
//! the reconciliation core requires.

use chrono::{NaiveDate, NaiveTime};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::interval::Interval;
use crate::model::{FragmentId, LeaderAvailability, LeaderId};

/// A recurring availability declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringAvailability {
    pub leader_id: LeaderId,
    /// RFC 5545 RRULE string, e.g. "FREQ=WEEKLY;BYDAY=TU,TH".
    pub rrule: String,
    /// Date of the first occurrence (DTSTART's date component).
    pub first_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// IANA timezone the pattern is anchored in, e.g. "Europe/Berlin".
    pub timezone: String,
    /// Optional last date to expand through.
    pub until: Option<NaiveDate>,
    /// Optional maximum number of occurrences (overrides COUNT in the rule).
    pub count: Option<u32>,
    pub is_public: bool,
    pub notes: Option<String>,
}

/// Cap on expansion when the declaration is open-ended.
const MAX_OCCURRENCES: u16 = 500;

/// Expand a recurring declaration into per-date availability rows.
///
/// # Errors
/// Returns [`EngineError::InvalidInterval`] when `start_time >= end_time`,
/// [`EngineError::InvalidRule`] when the RRULE string is empty or
/// unparseable, and [`EngineError::InvalidTimezone`] when the timezone is
/// not a valid IANA identifier.
pub fn expand_recurring(declaration: &RecurringAvailability) -> Result<Vec<LeaderAvailability>> {
    Interval::from_times(declaration.start_time, declaration.end_time)?;

    if declaration.rrule.is_empty() {
        return Err(EngineError::InvalidRule("empty RRULE string".to_string()));
    }

    // Short-circuit: caller explicitly wants zero occurrences.
    if declaration.count == Some(0) {
        return Ok(Vec::new());
    }

    // Validate the timezone by parsing it as a chrono-tz Tz.
    let _tz: chrono_tz::Tz = declaration
        .timezone
        .parse()
        .map_err(|_| EngineError::InvalidTimezone(declaration.timezone.clone()))?;

    let dtstart_ical = format!(
        "{}T{}",
        declaration.first_date.format("%Y%m%d"),
        declaration.start_time.format("%H%M%S")
    );

    // Build the RRULE text block, injecting COUNT or UNTIL when the caller
    // supplies them and the rule itself does not.
    let mut rrule_str = declaration.rrule.clone();
    if let Some(c) = declaration.count {
        if !rrule_str.to_uppercase().contains("COUNT=") {
            rrule_str = format!("{};COUNT={}", rrule_str, c);
        }
    }
    if let Some(until) = declaration.until {
        if !rrule_str.to_uppercase().contains("UNTIL=") {
            // UNTIL and DTSTART must share a timezone. For UTC the value
            // needs a trailing "Z"; otherwise bare local time.
            let mut until_ical = format!("{}T235959", until.format("%Y%m%d"));
            if declaration.timezone == "UTC" {
                until_ical.push('Z');
            }
            rrule_str = format!("{};UNTIL={}", rrule_str, until_ical);
        }
    }

    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        declaration.timezone, dtstart_ical, rrule_str
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| EngineError::InvalidRule(format!("{}", e)))?;

    let max_count: u16 = declaration
        .count
        .map(|c| c as u16)
        .unwrap_or(MAX_OCCURRENCES);
    let instances = rrule_set.all(max_count);

    let mut rows: Vec<LeaderAvailability> = instances
        .dates
        .into_iter()
        .map(|dt| LeaderAvailability {
            id: FragmentId::random(),
            leader_id: declaration.leader_id.clone(),
            // Occurrences come back in the declaration's timezone; the row
            // keeps the local calendar date.
            date: dt.date_naive(),
            start_time: declaration.start_time,
            end_time: declaration.end_time,
            is_active: true,
            is_public: declaration.is_public,
            notes: declaration.notes.clone(),
        })
        .collect();

    if let Some(c) = declaration.count {
        rows.truncate(c as usize);
    }

    Ok(rows)
}
