//! Storage traits and the in-memory reference store.
//!
//! The engine holds no long-lived state of its own; rules, hours, and bookings
//! live behind these traits. [`MemoryStore`] is the reference implementation
//! used by the CLI and the test suite. A database-backed implementation plugs
//! in by implementing the same two traits; transient connection failures
//! should be retried inside the implementation and surfaced as
//! `EngineError::Store` only once retries are exhausted.

use crate::error::{EngineError, Result};
use crate::types::{
    BlackoutRule, Booking, BookingDraft, BookingId, BookingStatus, Provider, ProviderId, RuleDraft,
    RuleId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Persistence for providers and their blackout rules. Pure data access; all
/// business logic lives in the manager/resolver layers.
pub trait RuleStore: Send + Sync {
    fn provider(&self, provider_id: &ProviderId) -> Result<Option<Provider>>;

    /// All rules owned by the provider, in insertion order.
    fn rules_for(&self, provider_id: &ProviderId) -> Result<Vec<BlackoutRule>>;

    /// Persist a validated draft, assigning its id.
    fn insert_rule(&self, provider_id: &ProviderId, draft: RuleDraft) -> Result<BlackoutRule>;

    /// Remove a rule. Removing an absent rule is a successful no-op: the
    /// desired end state ("rule gone") already holds, and retrying clients
    /// depend on that.
    fn delete_rule(&self, provider_id: &ProviderId, rule_id: RuleId) -> Result<()>;
}

/// Read/insert access to the booking rows the engine checks against. Bookings
/// are owned by the surrounding booking workflow, not by this engine.
pub trait BookingStore: Send + Sync {
    /// Bookings for the provider whose `[start, end)` overlaps the given UTC
    /// range, regardless of status.
    fn bookings_overlapping(
        &self,
        provider_id: &ProviderId,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    /// Persist a booking, assigning its id.
    fn insert_booking(&self, draft: BookingDraft) -> Result<Booking>;
}

#[derive(Default)]
struct Inner {
    providers: HashMap<ProviderId, Provider>,
    rules: HashMap<ProviderId, Vec<BlackoutRule>>,
    bookings: HashMap<ProviderId, Vec<Booking>>,
}

/// In-memory store backing the CLI and tests. Interior mutability via a single
/// `Mutex`; id assignment via atomic counters so ids stay unique even across
/// lock boundaries.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    next_rule_id: AtomicU64,
    next_booking_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Store("memory store lock poisoned".to_string()))
    }

    pub fn upsert_provider(&self, provider: Provider) -> Result<()> {
        let mut inner = self.lock()?;
        inner.providers.insert(provider.id.clone(), provider);
        Ok(())
    }

    /// Insert a fully-formed rule as-is, id included. Fixture/seeding path --
    /// normal creation goes through `insert_rule`, which validates nothing but
    /// assigns ids; this path also lets tests plant intentionally malformed
    /// rules to exercise fail-closed resolution.
    pub fn seed_rule(&self, provider_id: &ProviderId, rule: BlackoutRule) -> Result<()> {
        let mut inner = self.lock()?;
        // Keep the id counter ahead of seeded ids.
        self.next_rule_id.fetch_max(rule.id.0 + 1, Ordering::Relaxed);
        inner.rules.entry(provider_id.clone()).or_default().push(rule);
        Ok(())
    }

    /// Insert a fully-formed booking as-is, id included (fixture/seeding path).
    pub fn seed_booking(&self, booking: Booking) -> Result<()> {
        let mut inner = self.lock()?;
        self.next_booking_id
            .fetch_max(booking.id.0 + 1, Ordering::Relaxed);
        inner
            .bookings
            .entry(booking.provider_id.clone())
            .or_default()
            .push(booking);
        Ok(())
    }

    pub fn booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let inner = self.lock()?;
        Ok(inner
            .bookings
            .values()
            .flatten()
            .find(|b| b.id == id)
            .cloned())
    }

    /// Flip a booking's status (e.g. `confirmed` -> `cancelled`). Returns
    /// false when the booking is unknown. Stands in for the external booking
    /// workflow's own state transitions.
    pub fn set_booking_status(&self, id: BookingId, status: BookingStatus) -> Result<bool> {
        let mut inner = self.lock()?;
        for bookings in inner.bookings.values_mut() {
            if let Some(booking) = bookings.iter_mut().find(|b| b.id == id) {
                booking.status = status;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl RuleStore for MemoryStore {
    fn provider(&self, provider_id: &ProviderId) -> Result<Option<Provider>> {
        let inner = self.lock()?;
        Ok(inner.providers.get(provider_id).cloned())
    }

    fn rules_for(&self, provider_id: &ProviderId) -> Result<Vec<BlackoutRule>> {
        let inner = self.lock()?;
        Ok(inner.rules.get(provider_id).cloned().unwrap_or_default())
    }

    fn insert_rule(&self, provider_id: &ProviderId, draft: RuleDraft) -> Result<BlackoutRule> {
        let mut inner = self.lock()?;
        let id = RuleId(self.next_rule_id.fetch_add(1, Ordering::Relaxed));
        let rule = draft.into_rule(id);
        inner
            .rules
            .entry(provider_id.clone())
            .or_default()
            .push(rule.clone());
        Ok(rule)
    }

    fn delete_rule(&self, provider_id: &ProviderId, rule_id: RuleId) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(rules) = inner.rules.get_mut(provider_id) {
            rules.retain(|r| r.id != rule_id);
        }
        Ok(())
    }
}

impl BookingStore for MemoryStore {
    fn bookings_overlapping(
        &self,
        provider_id: &ProviderId,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let inner = self.lock()?;
        Ok(inner
            .bookings
            .get(provider_id)
            .map(|bookings| {
                bookings
                    .iter()
                    .filter(|b| b.start < range_end && b.end > range_start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_booking(&self, draft: BookingDraft) -> Result<Booking> {
        let mut inner = self.lock()?;
        let booking = Booking {
            id: BookingId(self.next_booking_id.fetch_add(1, Ordering::Relaxed)),
            provider_id: draft.provider_id.clone(),
            start: draft.start,
            end: draft.end,
            status: draft.status,
        };
        inner
            .bookings
            .entry(draft.provider_id)
            .or_default()
            .push(booking.clone());
        Ok(booking)
    }
}
