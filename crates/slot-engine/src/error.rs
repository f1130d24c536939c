//! Error types for reconciliation operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{EventId, EventStatus, LeaderId};

/// Errors that can occur while reconciling availability fragments.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A time range with `start >= end` was supplied. Rejected before any
    /// mutation reaches the store.
    #[error("invalid interval: start {start} >= end {end} (minutes since midnight)")]
    InvalidInterval { start: i32, end: i32 },

    /// A declared availability window overlaps another active fragment for
    /// the same leader and date. Rejected before any mutation.
    #[error("declared window overlaps an active fragment for leader {leader} on {date}")]
    OverlapsExisting { leader: LeaderId, date: NaiveDate },

    /// The `(leader, date)` lock could not be acquired. Recoverable; the
    /// caller may retry the whole triggering operation.
    #[error("availability for leader {leader} on {date} is locked by another reconciliation")]
    Contention { leader: LeaderId, date: NaiveDate },

    /// The availability store rejected a read or write. The transaction is
    /// aborted and no partial fragment set is left behind.
    #[error("availability store error: {0}")]
    Store(String),

    /// Active fragments overlap after a reconciliation. This is a
    /// programming error, never repaired silently.
    #[error("active fragments overlap for leader {leader} on {date} after reconciliation")]
    Inconsistent { leader: LeaderId, date: NaiveDate },

    /// Buffer expansion crossed the day boundary under
    /// [`MidnightPolicy::Reject`](crate::policy::MidnightPolicy).
    #[error("buffered window [{start}, {end}) crosses the day boundary")]
    BufferOverflow { start: i32, end: i32 },

    /// An operation was invoked for an event whose status does not match
    /// the trigger (e.g. consuming a cancelled event).
    #[error("event {event} has status {status}, which does not match this trigger")]
    InvalidTransition { event: EventId, status: EventStatus },

    /// The recurrence rule string was empty or unparseable.
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// The timezone was not a valid IANA identifier.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Convenience alias used throughout slot-engine.
pub type Result<T> = std::result::Result<T, EngineError>;
