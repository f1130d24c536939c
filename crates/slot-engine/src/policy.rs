//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Margin applied symmetrically around an event's time window when testing
/// for or consuming conflicts. Never applied when restoring freed time.
pub const DEFAULT_BUFFER_MINUTES: i32 = 40;

/// Behavior when buffer expansion would cross the day boundary.
///
/// The engine operates within a single calendar date and never examines
/// adjacent-date fragments, so a buffered window near midnight has to be
/// handled one way or the other, explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MidnightPolicy {
    /// Truncate the buffered window at 00:00/24:00.
    #[default]
    Clamp,
    /// Refuse the reconciliation with
    /// [`EngineError::BufferOverflow`](crate::error::EngineError), for
    /// callers that own their own cross-date handling.
    Reject,
}

/// Tunables for a [`ReconcileEngine`](crate::reconcile::ReconcileEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Margin in whole minutes added on both sides of an event window.
    pub buffer_minutes: i32,
    /// What to do when the buffered window crosses the day boundary.
    pub midnight_policy: MidnightPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            midnight_policy: MidnightPolicy::default(),
        }
    }
}
