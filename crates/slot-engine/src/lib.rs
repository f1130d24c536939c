//! # slot-engine
//!
//! Availability interval reconciliation for musician booking schedules.
//!
//! Leaders publish blocks of personal time; bookable events consume portions
//! of it. This crate is the engine that keeps the two in agreement: it
//! detects which events occupy a leader's declared window (respecting a
//! fixed buffer), fragments the window around the busy sub-ranges when a
//! conflicting event is created or edited, and restores and re-merges
//! fragments when an event that consumed time is rejected, cancelled, or
//! deleted.
//!
//! Persistence, routing, auth, and notifications live in the surrounding
//! application; the engine sees them only through the narrow
//! [`store::AvailabilityStore`] and [`conflict::EventSource`] seams.
//!
//! ## Modules
//!
//! - [`interval`] — closed-open minute intervals, subtract/merge algebra
//! - [`conflict`] — which events occupy a leader's time in a window
//! - [`reconcile`] — lifecycle triggers → fragment mutations
//! - [`store`] — transactional fragment store collaborator + in-memory impl
//! - [`recurrence`] — weekly declarations → per-date availability rows
//! - [`model`] — domain types
//! - [`policy`] — buffer width and midnight-boundary configuration
//! - [`error`] — error types

pub mod conflict;
pub mod error;
pub mod interval;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod recurrence;
pub mod store;

pub use conflict::{find_conflicting_events, EventSource};
pub use error::EngineError;
pub use interval::Interval;
pub use model::{
    Event, EventId, EventStatus, FragmentId, Invite, InviteResponse, LeaderAvailability, LeaderId,
};
pub use policy::{EngineConfig, MidnightPolicy, DEFAULT_BUFFER_MINUTES};
pub use reconcile::{FragmentDelta, ReconcileEngine, ReconcileReport};
pub use recurrence::{expand_recurring, RecurringAvailability};
pub use store::{AvailabilityStore, FragmentTx, MemoryStore};
