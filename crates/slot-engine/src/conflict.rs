//! Find the events that occupy a leader's time within a candidate window.
//!
//! The detector is read-only: it queries an [`EventSource`] for the date,
//! applies the buffer to the window, and filters to events that are both
//! occupying (proposed, approved, confirmed) and relevant to the leader
//! (created by them, or carrying an invite record for them).

use chrono::NaiveDate;

use crate::error::Result;
use crate::interval::{self, Interval};
use crate::model::{Event, LeaderId};
use crate::policy::EngineConfig;

/// Read-only access to the events scheduled on a date.
///
/// The engine never mutates events; the surrounding application owns their
/// lifecycle and calls the matching reconcile trigger on each transition.
pub trait EventSource {
    /// All events scheduled on the given date, regardless of status or
    /// participants. The detector does its own filtering.
    fn events_on(&self, date: NaiveDate) -> Result<Vec<Event>>;
}

/// A plain event list works as a source; useful for tests and for callers
/// that already hold the day's events.
impl EventSource for Vec<Event> {
    fn events_on(&self, date: NaiveDate) -> Result<Vec<Event>> {
        Ok(self
            .iter()
            .filter(|e| e.event_date == date)
            .cloned()
            .collect())
    }
}

/// The empty source, for flows that never run conflict detection.
impl EventSource for () {
    fn events_on(&self, _date: NaiveDate) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }
}

/// Find the events occupying `leader`'s time within `window` on `date`.
///
/// The configured buffer is applied to the window before testing overlap:
/// an event conflicts when `start < window.end + buffer` and
/// `end > window.start - buffer`. An event whose bounds merely touch the
/// buffered window does not conflict.
///
/// The result is sorted by start time ascending so fragment construction is
/// deterministic; callers must not rely on the order otherwise.
pub fn find_conflicting_events<E: EventSource>(
    events: &E,
    leader: &LeaderId,
    date: NaiveDate,
    window: Interval,
    config: &EngineConfig,
) -> Result<Vec<Event>> {
    let probe = interval::expand(window, config.buffer_minutes, config.midnight_policy)?;

    let mut hits = Vec::new();
    for event in events.events_on(date)? {
        if !event.status.is_occupying() || !event.involves(leader) {
            continue;
        }
        if event.interval()?.overlaps(&probe) {
            hits.push(event);
        }
    }
    hits.sort_by(|a, b| a.start_time.cmp(&b.start_time));

    tracing::debug!(
        leader = %leader,
        date = %date,
        conflicts = hits.len(),
        "conflict scan"
    );
    Ok(hits)
}
