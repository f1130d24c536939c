//! The availability store collaborator.
//!
//! The engine treats fragment persistence as a transactional key-value set
//! keyed by `(leader, date)`. All reads and writes for one key during a
//! reconciliation are serialized against any other reconciliation touching
//! the same key; different leaders or dates proceed independently.
//!
//! [`MemoryStore`] is the reference implementation: per-key pessimistic
//! locks, staged writes committed only when the transaction closure returns
//! `Ok`, rows deactivated rather than deleted.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::error::{EngineError, Result};
use crate::model::{FragmentId, LeaderAvailability, LeaderId};

/// Mutations available inside one `(leader, date)` transaction.
pub trait FragmentTx {
    /// The active fragments for the transaction's key.
    fn list_active(&mut self) -> Result<Vec<LeaderAvailability>>;

    /// Insert the fragment, or replace the row with the same id.
    fn upsert(&mut self, fragment: &LeaderAvailability) -> Result<()>;

    /// Mark the row inactive. Rows are never hard-deleted.
    fn deactivate(&mut self, id: &FragmentId) -> Result<()>;
}

/// Transactional access to availability fragments.
pub trait AvailabilityStore {
    /// Run `work` inside a transaction scoped to `(leader, date)`.
    ///
    /// The implementation must hold the key's lock for the duration, apply
    /// the staged writes only when `work` returns `Ok`, and discard them
    /// entirely otherwise — no partial fragment set may ever be visible
    /// outside a completed transaction.
    ///
    /// # Errors
    /// [`EngineError::Contention`] when the key's lock cannot be acquired;
    /// whatever `work` itself returns, with the staged state discarded.
    fn in_transaction<T, F>(&self, leader: &LeaderId, date: NaiveDate, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn FragmentTx) -> Result<T>;
}

type DayKey = (LeaderId, NaiveDate);

/// In-memory reference store.
///
/// Cloning is cheap and clones share the same underlying rows, so a handle
/// can be kept for inspection while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<DayKey, Vec<LeaderAvailability>>>,
    locks: Arc<DashMap<DayKey, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row for the key, active or not, sorted by start time.
    pub fn all_fragments(&self, leader: &LeaderId, date: NaiveDate) -> Vec<LeaderAvailability> {
        let mut rows = self
            .rows
            .get(&(leader.clone(), date))
            .map(|r| r.value().clone())
            .unwrap_or_default();
        rows.sort_by_key(|f| (f.start_time, f.end_time));
        rows
    }

    /// The active fragments for the key, sorted by start time.
    pub fn active_fragments(&self, leader: &LeaderId, date: NaiveDate) -> Vec<LeaderAvailability> {
        let mut rows = self.all_fragments(leader, date);
        rows.retain(|f| f.is_active);
        rows
    }

    /// Load a fixture row directly, bypassing transactions and invariant
    /// checks. Intended for seeding test state.
    pub fn seed(&self, fragment: LeaderAvailability) {
        let key = (fragment.leader_id.clone(), fragment.date);
        self.rows.entry(key).or_default().push(fragment);
    }
}

impl AvailabilityStore for MemoryStore {
    fn in_transaction<T, F>(&self, leader: &LeaderId, date: NaiveDate, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn FragmentTx) -> Result<T>,
    {
        let key = (leader.clone(), date);
        let lock = {
            let entry = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.try_lock().map_err(|_| {
            tracing::warn!(leader = %leader, date = %date, "reconciliation lock contention");
            EngineError::Contention {
                leader: leader.clone(),
                date,
            }
        })?;

        // Stage a copy of the key's rows; commit only on success.
        let staged = self
            .rows
            .get(&key)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        let mut tx = MemoryTx { rows: staged };
        let out = work(&mut tx)?;
        self.rows.insert(key, tx.rows);
        Ok(out)
    }
}

struct MemoryTx {
    rows: Vec<LeaderAvailability>,
}

impl FragmentTx for MemoryTx {
    fn list_active(&mut self) -> Result<Vec<LeaderAvailability>> {
        Ok(self.rows.iter().filter(|f| f.is_active).cloned().collect())
    }

    fn upsert(&mut self, fragment: &LeaderAvailability) -> Result<()> {
        match self.rows.iter_mut().find(|f| f.id == fragment.id) {
            Some(row) => *row = fragment.clone(),
            None => self.rows.push(fragment.clone()),
        }
        Ok(())
    }

    fn deactivate(&mut self, id: &FragmentId) -> Result<()> {
        match self.rows.iter_mut().find(|f| f.id == *id) {
            Some(row) => {
                row.is_active = false;
                Ok(())
            }
            None => Err(EngineError::Store(format!("deactivate: unknown fragment {id}"))),
        }
    }
}
