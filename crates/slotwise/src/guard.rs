//! Final authoritative check at booking time.
//!
//! Availability shown to a client is stale the moment it is rendered. The
//! guard closes the check-then-act race by re-resolving availability from
//! current state and inserting the booking under a per-provider advisory lock,
//! the in-memory equivalent of a serializable transaction: two concurrent
//! reserves for overlapping intervals cannot both observe the slot as open.

use crate::error::{EngineError, Result};
use crate::resolver;
use crate::store::{BookingStore, RuleStore};
use crate::types::{Booking, BookingDraft, BookingStatus, ProviderId};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct BookingConflictGuard<S> {
    store: Arc<S>,
    locks: Mutex<HashMap<ProviderId, Arc<Mutex<()>>>>,
}

impl<S: RuleStore + BookingStore> BookingConflictGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve `[start, end)` for the provider, confirming the booking only if
    /// the interval is still fully contained in one open slot.
    ///
    /// # Errors
    /// - `SlotNoLongerAvailable` when another booking or a newly created
    ///   blackout rule consumed the slot since the caller last queried. This
    ///   is the expected race outcome, indistinguishable from "slot was
    ///   already taken"; callers should re-fetch availability and reselect.
    /// - Resolution faults (`InvalidRuleState`, `UnsupportedRecurrence`)
    ///   propagate: an undecidable date must not accept bookings.
    pub fn reserve(
        &self,
        provider_id: &ProviderId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking> {
        if start >= end {
            return Err(EngineError::Validation {
                field: "start_datetime",
                message: format!("start {} must be before end {}", start, end),
            });
        }

        let lock = self.provider_lock(provider_id)?;
        let _serialized = lock
            .lock()
            .map_err(|_| EngineError::Store("provider reservation lock poisoned".to_string()))?;

        // Everything below reads *current* state, not whatever the caller saw
        // when availability was rendered.
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or_else(|| EngineError::ProviderNotFound(provider_id.clone()))?;
        let tz: Tz = provider
            .timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(provider.timezone.clone()))?;
        let rules = self.store.rules_for(provider_id)?;

        let first_date = start.with_timezone(&tz).date_naive();
        let last_date = end.with_timezone(&tz).date_naive();
        let (fetch_start, fetch_end) = crate::query::utc_fetch_window(first_date, last_date);
        let bookings = self
            .store
            .bookings_overlapping(provider_id, fetch_start, fetch_end)?;

        // A booking that spans local midnight must fit an open slot on every
        // date it touches.
        let mut date = first_date;
        while date <= last_date {
            if let Some((want_start, want_end)) = resolver::clip_to_local_date(start, end, date, tz)
            {
                let slots = resolver::resolve(date, &provider.hours, &rules, &bookings, tz)?;
                let contained = slots.iter().any(|slot| {
                    resolver::minutes_of(slot.start_time) <= want_start
                        && want_end <= resolver::minutes_of(slot.end_time)
                });
                if !contained {
                    log::debug!(
                        "reservation for provider {} on {} lost the slot race",
                        provider_id,
                        date
                    );
                    return Err(EngineError::SlotNoLongerAvailable);
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        self.store.insert_booking(BookingDraft {
            provider_id: provider_id.clone(),
            start,
            end,
            status: BookingStatus::Confirmed,
        })
    }

    fn provider_lock(&self, provider_id: &ProviderId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| EngineError::Store("guard lock table poisoned".to_string()))?;
        Ok(locks.entry(provider_id.clone()).or_default().clone())
    }
}
