//! Read path: open-slot queries for a single date or a calendar range.

use crate::error::{EngineError, Result};
use crate::resolver;
use crate::store::{BookingStore, RuleStore};
use crate::types::{Provider, ProviderId, ResolvedSlot};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers "what open slots exist on this date (or range)?" by loading state
/// once and funnelling it through the resolver. Safe to run fully
/// concurrently: stale answers are corrected at booking time by the conflict
/// guard.
pub struct AvailabilityQueryService<S> {
    store: Arc<S>,
}

impl<S: RuleStore + BookingStore> AvailabilityQueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open slots for one provider-local date.
    ///
    /// An unknown provider is an error; a provider that is closed or fully
    /// booked that date yields an empty list.
    pub fn get_slots(&self, provider_id: &ProviderId, date: NaiveDate) -> Result<Vec<ResolvedSlot>> {
        let (provider, tz) = self.load_provider(provider_id)?;
        let rules = self.store.rules_for(provider_id)?;
        let (fetch_start, fetch_end) = utc_fetch_window(date, date);
        let bookings = self
            .store
            .bookings_overlapping(provider_id, fetch_start, fetch_end)?;
        resolver::resolve(date, &provider.hours, &rules, &bookings, tz)
    }

    /// Open slots for every date in `[start_date, end_date]`, keyed by date.
    ///
    /// Rules and bookings are fetched once for the whole range and sliced per
    /// date in memory -- one storage round trip per kind, not one per date.
    /// Every date in the range gets an entry (possibly empty) so calendar
    /// views can render closed days without special-casing.
    pub fn get_slots_range(
        &self,
        provider_id: &ProviderId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<ResolvedSlot>>> {
        if start_date > end_date {
            return Err(EngineError::Validation {
                field: "start_date",
                message: format!("start_date {} is after end_date {}", start_date, end_date),
            });
        }
        let (provider, tz) = self.load_provider(provider_id)?;
        let rules = self.store.rules_for(provider_id)?;
        let (fetch_start, fetch_end) = utc_fetch_window(start_date, end_date);
        let bookings = self
            .store
            .bookings_overlapping(provider_id, fetch_start, fetch_end)?;

        let mut by_date = BTreeMap::new();
        let mut date = start_date;
        while date <= end_date {
            let slots = resolver::resolve(date, &provider.hours, &rules, &bookings, tz)?;
            by_date.insert(date, slots);
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(by_date)
    }

    fn load_provider(&self, provider_id: &ProviderId) -> Result<(Provider, Tz)> {
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or_else(|| EngineError::ProviderNotFound(provider_id.clone()))?;
        let tz: Tz = provider
            .timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(provider.timezone.clone()))?;
        Ok((provider, tz))
    }
}

/// UTC fetch window covering the local dates, widened by a day on each side so
/// no timezone offset can push a relevant booking outside it. The resolver
/// clips precisely; over-fetching a day is harmless.
pub(crate) fn utc_fetch_window(
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (start_date.and_time(NaiveTime::MIN) - Duration::days(1)).and_utc();
    let end = (end_date.and_time(NaiveTime::MIN) + Duration::days(2)).and_utc();
    (start, end)
}
