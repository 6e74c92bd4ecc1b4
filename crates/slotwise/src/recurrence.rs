//! Recurrence as a predicate -- answers "does this rule apply on this date?"
//!
//! Recurrence here is simple (weekly on a fixed weekday), so it is treated as
//! an O(1) predicate per date instead of a generative occurrence sequence.
//! The dominant query shape in this domain is per-date availability checks,
//! which stay cheap this way, and there is no unbounded expansion to cap.

use crate::error::{EngineError, Result};
use crate::types::{BlackoutRule, RecurrencePattern, RuleKind};
use chrono::{Datelike, NaiveDate};

/// Whether `rule` blocks time on `date`.
///
/// - One-time rules apply exactly on their stored date.
/// - Weekly recurring rules apply on every date with the matching weekday.
///
/// # Errors
/// Returns `EngineError::UnsupportedRecurrence` for recurrence patterns this
/// engine does not understand. An unknown pattern must never silently match
/// nothing: the provider believes the rule is active, so under-blocking here
/// would expose time they intended to close.
pub fn applies_on(rule: &BlackoutRule, date: NaiveDate) -> Result<bool> {
    match &rule.kind {
        RuleKind::OneTime { date: rule_date } => Ok(*rule_date == date),
        RuleKind::Recurring {
            day_of_week,
            recurrence_pattern,
        } => match recurrence_pattern {
            RecurrencePattern::Weekly => Ok(date.weekday() == *day_of_week),
            RecurrencePattern::Other(pattern) => {
                Err(EngineError::UnsupportedRecurrence(pattern.clone()))
            }
        },
    }
}
