//! Domain types shared by the detector, the engine, and its collaborators.
//!
//! Everything here is plain data: identities are opaque string newtypes,
//! times are calendar dates and times-of-day with no timezone attached.
//! Interval arithmetic lives in [`crate::interval`]; these types only carry
//! the declared bounds.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::interval::Interval;

/// Opaque identity of a leader (a musician who publishes availability).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaderId(String);

impl LeaderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of a bookable event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of one availability fragment row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id for rows the engine creates itself.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One contiguous free time range published by a leader.
///
/// For a fixed `(leader_id, date)`, all rows with `is_active = true` are
/// pairwise disjoint; touching endpoints are allowed. Rows are deactivated
/// when their time is consumed, never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderAvailability {
    pub id: FragmentId,
    pub leader_id: LeaderId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub is_public: bool,
    /// Free text carrying the provenance of the fragment, e.g.
    /// "restored after event … was freed".
    pub notes: Option<String>,
}

impl LeaderAvailability {
    /// The declared bounds as a closed-open minute interval.
    pub fn interval(&self) -> Result<Interval> {
        Interval::from_times(self.start_time, self.end_time)
    }
}

/// A musician's response to an event invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteResponse {
    #[default]
    Pending,
    Available,
    Unavailable,
}

/// Links an invited musician to an event. The existence of the record is
/// what makes the event relevant to that musician's availability; the
/// response value itself is for the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub musician_id: LeaderId,
    pub response: InviteResponse,
}

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Proposed,
    Approved,
    Confirmed,
    Rejected,
    Cancelled,
}

impl EventStatus {
    /// Whether an event in this status counts toward conflict detection.
    pub fn is_occupying(self) -> bool {
        matches!(self, Self::Proposed | Self::Approved | Self::Confirmed)
    }

    /// Whether the lifecycle allows moving from this status to `next`.
    ///
    /// The engine itself only reads status; this helper lets callers
    /// validate a transition before invoking the matching trigger.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Proposed, Approved)
                | (Proposed, Rejected)
                | (Approved, Confirmed)
                | (Approved, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A bookable event consuming leader time on a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: EventStatus,
    pub created_by: LeaderId,
    pub invites: Vec<Invite>,
}

impl Event {
    /// The event's own bounds as a closed-open minute interval. The 40-minute
    /// buffer is never stored; it is applied at query time only.
    pub fn interval(&self) -> Result<Interval> {
        Interval::from_times(self.start_time, self.end_time)
    }

    /// Whether the event counts as occupying this leader's time: the leader
    /// created it, or holds an invite record on it.
    pub fn involves(&self, leader: &LeaderId) -> bool {
        self.created_by == *leader || self.invites.iter().any(|i| i.musician_id == *leader)
    }

    /// Every leader whose availability this event may affect: the creator
    /// plus all invited musicians, deduplicated, creator first.
    pub fn affected_leaders(&self) -> Vec<LeaderId> {
        let mut leaders = vec![self.created_by.clone()];
        for invite in &self.invites {
            if !leaders.contains(&invite.musician_id) {
                leaders.push(invite.musician_id.clone());
            }
        }
        leaders
    }
}
