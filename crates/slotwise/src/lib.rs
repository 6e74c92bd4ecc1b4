//! # slotwise
//!
//! Provider availability and booking-conflict engine for appointment
//! scheduling (vets, trainers, groomers, sitters -- anyone with standing
//! hours, blackout rules, and live bookings competing for the same time).
//!
//! The engine answers two questions -- "is this date/time bookable?" and
//! "what open slots exist on this date?" -- and exposes mutation entry points
//! for blackout rules and race-free booking reservation. It renders nothing
//! and owns no users, payments, or notifications.
//!
//! ## Modules
//!
//! - [`types`] -- data model: providers, hours, rules, bookings, resolved slots
//! - [`recurrence`] -- "does this rule apply on this date?" as an O(1) predicate
//! - [`resolver`] -- hours minus blackouts minus bookings, the single source of
//!   truth for openness
//! - [`store`] -- storage traits plus the in-memory reference store
//! - [`query`] -- single-date and calendar-range slot queries
//! - [`manager`] -- blackout-rule creation/deletion with validation
//! - [`guard`] -- transactional re-check that closes the booking race
//! - [`error`] -- error types

pub mod error;
pub mod guard;
pub mod manager;
pub mod query;
pub mod recurrence;
pub mod resolver;
pub mod store;
pub mod types;

pub use error::{EngineError, Result};
pub use guard::BookingConflictGuard;
pub use manager::BlackoutRuleManager;
pub use query::AvailabilityQueryService;
pub use recurrence::applies_on;
pub use resolver::resolve;
pub use store::{BookingStore, MemoryStore, RuleStore};
pub use types::{
    BlackoutRule, Booking, BookingDraft, BookingId, BookingStatus, BusinessHours, Provider,
    ProviderId, RecurrencePattern, ResolvedSlot, RuleDraft, RuleId, RuleKind, RulePayload,
    TimeWindow,
};
