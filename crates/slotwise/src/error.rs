//! Error types for engine operations.
//!
//! Taxonomy: validation and conflict errors are locally correctable by the
//! caller; `SlotNoLongerAvailable` is the expected outcome of the
//! check-then-act race at reservation time; `UnsupportedRecurrence` and
//! `InvalidRuleState` are data-integrity faults that make resolution fail
//! closed rather than under-block.

use crate::types::{BookingId, ProviderId, RuleId};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input; `field` names the offending payload field.
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// The proposed blackout window already contains a confirmed booking.
    /// Requires `force = true` or manual resolution; the engine never
    /// auto-cancels a confirmed booking.
    #[error("rule would block confirmed booking {booking_id} on {date}; pass force to override")]
    ConflictWithExistingBooking { booking_id: BookingId, date: NaiveDate },

    /// The requested interval is no longer inside an open slot. This is the
    /// normal outcome of losing the booking race; callers should re-query and
    /// reselect, not retry the same request.
    #[error("requested slot is no longer available")]
    SlotNoLongerAvailable,

    #[error("provider not found: {0}")]
    ProviderNotFound(ProviderId),

    /// A stored rule carries a recurrence pattern this engine does not
    /// understand. Failing loudly here beats silently ignoring a rule the
    /// provider believes is active.
    #[error("unsupported recurrence pattern: {0}")]
    UnsupportedRecurrence(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A stored rule violates its own shape invariant (e.g. a non-all-day
    /// rule without `start_time < end_time`). Resolution fails closed.
    #[error("rule {rule_id} is in an invalid state: {message}")]
    InvalidRuleState { rule_id: RuleId, message: String },

    /// Storage-layer fault surfaced after any internal retries.
    #[error("storage error: {0}")]
    Store(String),
}

/// Convenience alias used throughout slotwise.
pub type Result<T> = std::result::Result<T, EngineError>;
