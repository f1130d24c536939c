//! The reconciliation engine.
//!
//! Reacts to lifecycle transitions of events and availability declarations,
//! turning each trigger into a set of fragment mutations applied inside a
//! `(leader, date)` transaction:
//!
//! - availability created/updated — split the declared window around
//!   conflicting events (buffer applied);
//! - event consumed — subtract the buffered event window from every
//!   affected leader's fragments;
//! - event freed — restore the event's exact window (no buffer) and merge
//!   it with adjacent-or-overlapping fragments;
//! - event rescheduled — restore the old bounds, then consume the new ones,
//!   inside one transaction so intermediate states are never observable.
//!
//! Only the observable end state is contractual: the engine always
//! deactivates consumed or absorbed rows and inserts fresh rows for each
//! surviving sub-interval or merged cover.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::conflict::{find_conflicting_events, EventSource};
use crate::error::{EngineError, Result};
use crate::interval::{self, Interval};
use crate::model::{Event, FragmentId, LeaderAvailability, LeaderId};
use crate::policy::EngineConfig;
use crate::store::{AvailabilityStore, FragmentTx};

/// Fragment mutations committed for one `(leader, date)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDelta {
    pub leader_id: LeaderId,
    pub date: NaiveDate,
    /// Rows marked inactive by this reconciliation.
    pub deactivated: Vec<FragmentId>,
    /// Rows inserted (or re-asserted whole) by this reconciliation.
    pub created: Vec<LeaderAvailability>,
}

impl FragmentDelta {
    fn new(leader_id: LeaderId, date: NaiveDate) -> Self {
        Self {
            leader_id,
            date,
            deactivated: Vec::new(),
            created: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.deactivated.is_empty() && self.created.is_empty()
    }

    /// Drop rows that were created and then deactivated inside the same
    /// transaction; they were never observable.
    fn compacted(mut self) -> Self {
        let created_ids: HashSet<FragmentId> = self.created.iter().map(|f| f.id.clone()).collect();
        let transient: HashSet<FragmentId> = self
            .deactivated
            .iter()
            .filter(|id| created_ids.contains(*id))
            .cloned()
            .collect();
        self.created.retain(|f| !transient.contains(&f.id));
        self.deactivated.retain(|id| !transient.contains(id));
        self
    }
}

/// What a reconciliation changed, one delta per touched `(leader, date)`.
/// Empty when the trigger was a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub deltas: Vec<FragmentDelta>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.deltas.is_empty()
    }

    fn push(&mut self, delta: FragmentDelta) {
        if !delta.is_noop() {
            self.deltas.push(delta);
        }
    }
}

/// Orchestrates the interval algebra and the conflict detector at each
/// lifecycle transition, applying fragment mutations through the store.
pub struct ReconcileEngine<S, E> {
    store: S,
    events: E,
    config: EngineConfig,
}

impl<S, E> ReconcileEngine<S, E>
where
    S: AvailabilityStore,
    E: EventSource,
{
    pub fn new(store: S, events: E) -> Self {
        Self::with_config(store, events, EngineConfig::default())
    }

    pub fn with_config(store: S, events: E, config: EngineConfig) -> Self {
        Self {
            store,
            events,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// A leader published a new availability window.
    ///
    /// If occupying events already overlap the buffered window, the declared
    /// row is stored deactivated and the surviving sub-intervals become
    /// fresh active fragments; otherwise the row is stored whole.
    pub fn reconcile_availability_created(
        &self,
        availability: &LeaderAvailability,
    ) -> Result<ReconcileReport> {
        tracing::debug!(
            leader = %availability.leader_id,
            date = %availability.date,
            "reconcile availability created"
        );
        self.reconcile_declared(availability)
    }

    /// A leader changed the bounds of a still-whole availability row.
    /// Reconciles exactly like creation, against the new bounds.
    pub fn reconcile_availability_updated(
        &self,
        availability: &LeaderAvailability,
        old_start: NaiveTime,
        old_end: NaiveTime,
    ) -> Result<ReconcileReport> {
        let old = Interval::from_times(old_start, old_end)?;
        tracing::debug!(
            leader = %availability.leader_id,
            date = %availability.date,
            old_start = old.start(),
            old_end = old.end(),
            "reconcile availability updated"
        );
        self.reconcile_declared(availability)
    }

    /// An event entered an occupying status: subtract its buffered window
    /// from every affected leader's active fragments on the event date.
    ///
    /// # Errors
    /// [`EngineError::InvalidTransition`] when the event is not occupying.
    pub fn reconcile_event_consumed(&self, event: &Event) -> Result<ReconcileReport> {
        if !event.status.is_occupying() {
            return Err(EngineError::InvalidTransition {
                event: event.id.clone(),
                status: event.status,
            });
        }
        let busy = interval::expand(
            event.interval()?,
            self.config.buffer_minutes,
            self.config.midnight_policy,
        )?;
        tracing::debug!(event = %event.id, status = %event.status, "reconcile event consumed");

        let mut report = ReconcileReport::default();
        for leader in event.affected_leaders() {
            let delta = self.store.in_transaction(&leader, event.event_date, |tx| {
                let mut delta = FragmentDelta::new(leader.clone(), event.event_date);
                consume_window(tx, busy, &mut delta)?;
                check_disjoint(tx, &leader, event.event_date)?;
                Ok(delta)
            })?;
            report.push(delta);
        }
        Ok(report)
    }

    /// An event was rejected, cancelled, or deleted: restore its exact
    /// window — never the buffer margin, which was never actually booked —
    /// for every affected leader, merging with whatever fragments the
    /// restored window touches or overlaps.
    ///
    /// Freeing the same event twice is a no-op: a window already covered by
    /// an active fragment is not restored again.
    pub fn reconcile_event_freed(&self, event: &Event) -> Result<ReconcileReport> {
        let candidate = event.interval()?;
        tracing::debug!(event = %event.id, status = %event.status, "reconcile event freed");

        let mut report = ReconcileReport::default();
        for leader in event.affected_leaders() {
            let delta = self.store.in_transaction(&leader, event.event_date, |tx| {
                let mut delta = FragmentDelta::new(leader.clone(), event.event_date);
                restore_window(tx, event, &leader, candidate, &mut delta)?;
                check_disjoint(tx, &leader, event.event_date)?;
                Ok(delta)
            })?;
            report.push(delta);
        }
        Ok(report)
    }

    /// A still-occupying event changed its time bounds: restore the old
    /// window, then consume the new one, inside a single transaction per
    /// affected leader.
    ///
    /// # Errors
    /// [`EngineError::InvalidTransition`] when the event is not occupying.
    pub fn reconcile_event_rescheduled(
        &self,
        event: &Event,
        old_start: NaiveTime,
        old_end: NaiveTime,
    ) -> Result<ReconcileReport> {
        if !event.status.is_occupying() {
            return Err(EngineError::InvalidTransition {
                event: event.id.clone(),
                status: event.status,
            });
        }
        let old_window = Interval::from_times(old_start, old_end)?;
        let busy = interval::expand(
            event.interval()?,
            self.config.buffer_minutes,
            self.config.midnight_policy,
        )?;
        tracing::debug!(
            event = %event.id,
            old_start = old_window.start(),
            old_end = old_window.end(),
            "reconcile event rescheduled"
        );

        let mut report = ReconcileReport::default();
        for leader in event.affected_leaders() {
            let delta = self.store.in_transaction(&leader, event.event_date, |tx| {
                let mut delta = FragmentDelta::new(leader.clone(), event.event_date);
                restore_window(tx, event, &leader, old_window, &mut delta)?;
                consume_window(tx, busy, &mut delta)?;
                check_disjoint(tx, &leader, event.event_date)?;
                Ok(delta.compacted())
            })?;
            report.push(delta);
        }
        Ok(report)
    }

    /// Shared path for availability creation and bounds updates.
    fn reconcile_declared(&self, availability: &LeaderAvailability) -> Result<ReconcileReport> {
        let window = availability.interval()?;
        let leader = availability.leader_id.clone();
        let date = availability.date;

        let conflicts =
            find_conflicting_events(&self.events, &leader, date, window, &self.config)?;
        let mut busy = Vec::with_capacity(conflicts.len());
        for event in &conflicts {
            busy.push(interval::expand(
                event.interval()?,
                self.config.buffer_minutes,
                self.config.midnight_policy,
            )?);
        }
        let remaining = interval::subtract(window, &busy);

        let delta = self.store.in_transaction(&leader, date, |tx| {
            // A declared window may not overlap any other active fragment;
            // the disjointness invariant is enforced, not repaired.
            for existing in tx.list_active()? {
                if existing.id == availability.id {
                    continue;
                }
                if existing.interval()?.overlaps(&window) {
                    return Err(EngineError::OverlapsExisting {
                        leader: leader.clone(),
                        date,
                    });
                }
            }

            let mut delta = FragmentDelta::new(leader.clone(), date);
            if remaining.len() == 1 && remaining[0] == window {
                // No conflicts touch the window; it stays whole.
                let mut whole = availability.clone();
                whole.is_active = true;
                tx.upsert(&whole)?;
                delta.created.push(whole);
            } else {
                let mut declared = availability.clone();
                declared.is_active = false;
                tx.upsert(&declared)?;
                delta.deactivated.push(availability.id.clone());
                for piece in &remaining {
                    let row = fragment_row(availability, *piece)?;
                    tx.upsert(&row)?;
                    delta.created.push(row);
                }
            }
            check_disjoint(tx, &leader, date)?;
            Ok(delta)
        })?;

        let mut report = ReconcileReport::default();
        report.push(delta);
        Ok(report)
    }
}

/// Subtract `busy` from every active fragment it overlaps, deactivating the
/// original row and inserting the surviving sub-intervals.
fn consume_window(
    tx: &mut dyn FragmentTx,
    busy: Interval,
    delta: &mut FragmentDelta,
) -> Result<()> {
    for fragment in tx.list_active()? {
        let span = fragment.interval()?;
        if !span.overlaps(&busy) {
            continue;
        }
        let remaining = interval::subtract(span, std::slice::from_ref(&busy));

        tx.deactivate(&fragment.id)?;
        delta.deactivated.push(fragment.id.clone());

        for piece in remaining {
            let row = fragment_row(&fragment, piece)?;
            tx.upsert(&row)?;
            delta.created.push(row);
        }
    }
    Ok(())
}

/// Restore `candidate` as available time, merging with every active
/// fragment it touches or overlaps. A candidate already covered by an
/// active fragment is left alone.
fn restore_window(
    tx: &mut dyn FragmentTx,
    event: &Event,
    leader: &LeaderId,
    candidate: Interval,
    delta: &mut FragmentDelta,
) -> Result<()> {
    let active = tx.list_active()?;
    for fragment in &active {
        if fragment.interval()?.contains(&candidate) {
            tracing::debug!(event = %event.id, leader = %leader, "window already available");
            return Ok(());
        }
    }

    let mut cluster = vec![candidate];
    let mut absorbed: Vec<&LeaderAvailability> = Vec::new();
    for fragment in &active {
        let span = fragment.interval()?;
        if span.touches_or_overlaps(&candidate) {
            cluster.push(span);
            absorbed.push(fragment);
        }
    }
    let cover = interval::merge(&cluster);

    for fragment in &absorbed {
        tx.deactivate(&fragment.id)?;
        delta.deactivated.push(fragment.id.clone());
    }

    let is_public = absorbed.first().map(|f| f.is_public).unwrap_or(true);
    let notes = Some(format!("restored after event {} was freed", event.id));
    for piece in cover {
        let (start_time, end_time) = piece.times().ok_or_else(|| EngineError::Inconsistent {
            leader: leader.clone(),
            date: event.event_date,
        })?;
        let row = LeaderAvailability {
            id: FragmentId::random(),
            leader_id: leader.clone(),
            date: event.event_date,
            start_time,
            end_time,
            is_active: true,
            is_public,
            notes: notes.clone(),
        };
        tx.upsert(&row)?;
        delta.created.push(row);
    }
    Ok(())
}

/// Build a replacement row for one surviving sub-interval of `template`,
/// carrying its `is_public` and `notes` forward.
fn fragment_row(template: &LeaderAvailability, piece: Interval) -> Result<LeaderAvailability> {
    let (start_time, end_time) = piece.times().ok_or_else(|| EngineError::Inconsistent {
        leader: template.leader_id.clone(),
        date: template.date,
    })?;
    Ok(LeaderAvailability {
        id: FragmentId::random(),
        leader_id: template.leader_id.clone(),
        date: template.date,
        start_time,
        end_time,
        is_active: true,
        is_public: template.is_public,
        notes: template.notes.clone(),
    })
}

/// Verify the pairwise-disjointness invariant over the key's active rows.
/// Touching endpoints are allowed; any overlap aborts the transaction.
fn check_disjoint(tx: &mut dyn FragmentTx, leader: &LeaderId, date: NaiveDate) -> Result<()> {
    let mut spans = Vec::new();
    for fragment in tx.list_active()? {
        spans.push(fragment.interval()?);
    }
    spans.sort_by_key(|iv| (iv.start(), iv.end()));
    for pair in spans.windows(2) {
        if pair[1].start() < pair[0].end() {
            return Err(EngineError::Inconsistent {
                leader: leader.clone(),
                date,
            });
        }
    }
    Ok(())
}
