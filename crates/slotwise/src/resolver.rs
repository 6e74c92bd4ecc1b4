//! Interval resolution -- the algorithmic core of the engine.
//!
//! Merges business hours, applicable blackout rules, and occupying bookings
//! for a single date into the final list of open slots. All read paths for
//! "is this slot open" funnel through [`resolve`], so there is exactly one
//! source of truth for openness.
//!
//! Arithmetic happens on minute-of-day integers (0..=1440) with half-open
//! `[start, end)` semantics throughout: touching boundaries never overlap, so
//! back-to-back bookings and blocks are legal.

use crate::error::{EngineError, Result};
use crate::recurrence;
use crate::types::{BlackoutRule, Booking, BusinessHours, ResolvedSlot};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

/// Minute-of-day pair, half-open. The upper bound may reach 1440 for blocks
/// clipped at end of day, but never for open slots (business hours end before
/// midnight by construction of `NaiveTime`).
type MinuteSpan = (i64, i64);

pub(crate) fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) / 60
}

/// Inverse of [`minutes_of`] for values produced by the resolver. Open-slot
/// boundaries are always derived from business-hours times, so they stay
/// strictly below 24:00.
fn time_from_minutes(minutes: i64) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt((minutes * 60) as u32, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// Clip a UTC interval to provider-local `date`, returning the overlapping
/// minute span or `None` when the interval does not touch that date.
///
/// A booking that spans local midnight yields a span on each affected date;
/// callers clip once per date.
///
/// Timestamps may carry seconds while slots are minute-granular, so the span
/// rounds outward: start floors, end ceils. A booking ending at 10:30:30
/// blocks through 10:31 rather than leaving 30 booked seconds inside an open
/// slot, and a requested interval grows rather than shrinks, keeping
/// admission conservative.
pub(crate) fn clip_to_local_date(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    date: NaiveDate,
    tz: Tz,
) -> Option<MinuteSpan> {
    let start_local = start.with_timezone(&tz).naive_local();
    let end_local = end.with_timezone(&tz).naive_local();

    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);

    let clipped_start = start_local.max(day_start);
    let clipped_end = end_local.min(day_end);
    if clipped_start >= clipped_end {
        return None;
    }

    let start_minutes = (clipped_start - day_start).num_seconds() / 60;
    // `i64::div_ceil` is unstable; the duration is positive here, so plain
    // ceiling division is equivalent.
    let end_minutes = ((clipped_end - day_start).num_seconds() + 59) / 60;
    Some((start_minutes, end_minutes))
}

/// Subtract a blocked span from every interval in the working set, splitting
/// intervals that straddle the block and dropping any reduced to zero length.
fn subtract(working: &mut Vec<MinuteSpan>, block_start: i64, block_end: i64) {
    let mut next = Vec::with_capacity(working.len() + 1);
    for &(start, end) in working.iter() {
        // Half-open: a block ending exactly at an interval's start (or vice
        // versa) does not touch it.
        if block_end <= start || end <= block_start {
            next.push((start, end));
            continue;
        }
        if start < block_start {
            next.push((start, block_start));
        }
        if block_end < end {
            next.push((block_end, end));
        }
    }
    *working = next;
}

/// Sort and merge overlapping or adjacent spans. Subtraction alone cannot
/// produce overlaps, so this is defensive against unsorted business hours.
fn coalesce(working: &mut Vec<MinuteSpan>) {
    working.sort_unstable();
    let mut merged: Vec<MinuteSpan> = Vec::with_capacity(working.len());
    for &(start, end) in working.iter() {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    *working = merged;
}

/// Resolve the open slots for `date`.
///
/// Starts from the business-hours windows for the date's weekday (none means
/// the provider is closed -- terminal, not an error), subtracts every blackout
/// rule that applies on the date (cumulatively; an all-day rule clears the
/// working set and dominates everything after it), then subtracts every
/// occupying booking converted from UTC to provider-local time and clipped to
/// the date.
///
/// # Errors
/// - `UnsupportedRecurrence` when a stored rule carries an unknown pattern.
/// - `InvalidRuleState` when a non-all-day rule is missing its window or has
///   `start_time >= end_time`. Such a rule should have been rejected at
///   creation; encountering one makes resolution fail closed (the whole date
///   reads as blocked) rather than risk exposing time the provider meant to
///   close. The fault is logged, never silently skipped.
pub fn resolve(
    date: NaiveDate,
    hours: &BusinessHours,
    rules: &[BlackoutRule],
    bookings: &[Booking],
    tz: Tz,
) -> Result<Vec<ResolvedSlot>> {
    let mut working: Vec<MinuteSpan> = hours
        .for_weekday(date.weekday())
        .iter()
        .map(|w| (minutes_of(w.start), minutes_of(w.end)))
        .filter(|&(start, end)| start < end)
        .collect();
    if working.is_empty() {
        return Ok(Vec::new());
    }

    for rule in rules {
        if !recurrence::applies_on(rule, date)? {
            continue;
        }
        if rule.is_all_day {
            // An all-day block dominates; nothing after it can reopen time.
            working.clear();
            break;
        }
        let window = rule.window().ok_or_else(|| {
            log::error!(
                "blackout rule {} has an invalid time window; treating {} as fully blocked",
                rule.id,
                date
            );
            EngineError::InvalidRuleState {
                rule_id: rule.id,
                message: "non-all-day rule requires start_time < end_time".to_string(),
            }
        })?;
        subtract(&mut working, minutes_of(window.start), minutes_of(window.end));
    }

    for booking in bookings {
        if !booking.status.occupies_time() {
            continue;
        }
        if let Some((start, end)) = clip_to_local_date(booking.start, booking.end, date, tz) {
            subtract(&mut working, start, end);
        }
        if working.is_empty() {
            break;
        }
    }

    coalesce(&mut working);

    Ok(working
        .into_iter()
        .map(|(start, end)| ResolvedSlot {
            date,
            start_time: time_from_minutes(start),
            end_time: time_from_minutes(end),
            duration_minutes: end - start,
        })
        .collect())
}
