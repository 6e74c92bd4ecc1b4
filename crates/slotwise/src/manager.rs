//! Blackout-rule lifecycle: validated creation and idempotent deletion.

use crate::error::{EngineError, Result};
use crate::recurrence;
use crate::resolver;
use crate::store::{BookingStore, RuleStore};
use crate::types::{
    BlackoutRule, BookingStatus, ProviderId, RecurrencePattern, RuleDraft, RuleId, RuleKind,
    RulePayload, TimeWindow,
};
use crate::types::weekday_num::weekday_from_index;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Creates and deletes blackout rules on behalf of a provider.
///
/// Creation validates payload shape and, by default, refuses rules whose
/// window already contains a confirmed booking -- silently orphaning a booking
/// the client paid for is worse than making the provider decide. `force`
/// downgrades that check to advisory; this engine never auto-cancels, so any
/// follow-up cancellation is the caller's workflow.
pub struct BlackoutRuleManager<S> {
    store: Arc<S>,
    /// How far into the past a one-time rule's date may lie. Zero means
    /// "today is still acceptable".
    grace: Duration,
}

impl<S: RuleStore + BookingStore> BlackoutRuleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            grace: Duration::zero(),
        }
    }

    /// Adjust the past-date tolerance for one-time rules.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Validate and persist a new blackout rule.
    ///
    /// Overlap with existing rules is deliberately not checked: overlapping
    /// blackout rules are legal and simply compound at resolution.
    pub fn create(
        &self,
        provider_id: &ProviderId,
        payload: RulePayload,
        force: bool,
    ) -> Result<BlackoutRule> {
        self.create_at(provider_id, payload, force, Utc::now())
    }

    /// Clock-injectable variant of [`create`](Self::create).
    pub fn create_at(
        &self,
        provider_id: &ProviderId,
        payload: RulePayload,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<BlackoutRule> {
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or_else(|| EngineError::ProviderNotFound(provider_id.clone()))?;
        let tz: Tz = provider
            .timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(provider.timezone.clone()))?;

        let draft = validate_payload(payload, now, tz, self.grace)?;

        if !force {
            self.check_confirmed_bookings(provider_id, &draft, now, tz)?;
        }

        let rule = self.store.insert_rule(provider_id, draft)?;
        log::debug!("created blackout rule {} for provider {}", rule.id, provider_id);
        Ok(rule)
    }

    /// Delete a rule. Idempotent: deleting an absent rule succeeds, since the
    /// desired end state already holds.
    pub fn delete(&self, provider_id: &ProviderId, rule_id: RuleId) -> Result<()> {
        self.store.delete_rule(provider_id, rule_id)
    }

    /// Reject the draft if any confirmed future booking falls inside its
    /// window. Only `confirmed` bookings guard rule creation; pending ones
    /// have not been promised to anyone yet.
    fn check_confirmed_bookings(
        &self,
        provider_id: &ProviderId,
        draft: &RuleDraft,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<()> {
        let bookings =
            self.store
                .bookings_overlapping(provider_id, now, DateTime::<Utc>::MAX_UTC)?;
        if bookings.is_empty() {
            return Ok(());
        }

        // Probe rule so the conflict check and the resolver share one
        // applicability predicate. The id is never stored.
        let probe = draft.clone().into_rule(RuleId(u64::MAX));

        for booking in bookings {
            if booking.status != BookingStatus::Confirmed {
                continue;
            }
            let first_date = booking.start.with_timezone(&tz).date_naive();
            let last_date = booking.end.with_timezone(&tz).date_naive();
            let mut date = first_date;
            while date <= last_date {
                if recurrence::applies_on(&probe, date)? {
                    if let Some((start, end)) =
                        resolver::clip_to_local_date(booking.start, booking.end, date, tz)
                    {
                        let blocked = if probe.is_all_day {
                            true
                        } else {
                            probe.window().is_some_and(|w| {
                                start < resolver::minutes_of(w.end)
                                    && resolver::minutes_of(w.start) < end
                            })
                        };
                        if blocked {
                            return Err(EngineError::ConflictWithExistingBooking {
                                booking_id: booking.id,
                                date,
                            });
                        }
                    }
                }
                match date.succ_opt() {
                    Some(next) => date = next,
                    None => break,
                }
            }
        }
        Ok(())
    }
}

/// Shape validation for the creation payload: exactly one of `date` or
/// `day_of_week` + `recurrence_pattern`, a well-formed window unless all-day,
/// and (for one-time rules) a date that is not in the past.
fn validate_payload(
    payload: RulePayload,
    now: DateTime<Utc>,
    tz: Tz,
    grace: Duration,
) -> Result<RuleDraft> {
    let kind = match (payload.date, payload.day_of_week) {
        (Some(_), Some(_)) => {
            return Err(EngineError::Validation {
                field: "date",
                message: "provide either `date` or `day_of_week`, not both".to_string(),
            })
        }
        (None, None) => {
            return Err(EngineError::Validation {
                field: "date",
                message: "one of `date` (one-time) or `day_of_week` (recurring) is required"
                    .to_string(),
            })
        }
        (Some(date), None) => {
            let today = now.with_timezone(&tz).date_naive();
            if date < today - grace {
                return Err(EngineError::Validation {
                    field: "date",
                    message: format!("date {} is in the past (today is {})", date, today),
                });
            }
            RuleKind::OneTime { date }
        }
        (None, Some(index)) => {
            let day_of_week = weekday_from_index(index).ok_or(EngineError::Validation {
                field: "day_of_week",
                message: format!("must be in 0..=6 (Monday=0), got {}", index),
            })?;
            let pattern = payload
                .recurrence_pattern
                .as_deref()
                .ok_or(EngineError::Validation {
                    field: "recurrence_pattern",
                    message: "required for recurring rules".to_string(),
                })?;
            match RecurrencePattern::from(pattern.to_string()) {
                RecurrencePattern::Weekly => {}
                RecurrencePattern::Other(other) => {
                    return Err(EngineError::Validation {
                        field: "recurrence_pattern",
                        message: format!("unsupported pattern {:?}; only WEEKLY is supported", other),
                    })
                }
            }
            RuleKind::Recurring {
                day_of_week,
                recurrence_pattern: RecurrencePattern::Weekly,
            }
        }
    };

    let (start_time, end_time) = if payload.is_all_day {
        // Whole day blocked; any provided times are ignored.
        (None, None)
    } else {
        let start = payload.start_time.ok_or(EngineError::Validation {
            field: "start_time",
            message: "required unless is_all_day".to_string(),
        })?;
        let end = payload.end_time.ok_or(EngineError::Validation {
            field: "end_time",
            message: "required unless is_all_day".to_string(),
        })?;
        let window = TimeWindow::new(start, end).ok_or(EngineError::Validation {
            field: "start_time",
            message: format!("start_time {} must be before end_time {}", start, end),
        })?;
        (Some(window.start), Some(window.end))
    };

    Ok(RuleDraft {
        kind,
        is_all_day: payload.is_all_day,
        start_time,
        end_time,
        reason: payload.reason,
    })
}
