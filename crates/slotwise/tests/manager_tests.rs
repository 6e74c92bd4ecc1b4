//! Tests for blackout-rule creation/deletion.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use slotwise::{
    BlackoutRuleManager, Booking, BookingId, BookingStatus, BusinessHours, EngineError,
    MemoryStore, Provider, ProviderId, RecurrencePattern, RuleId, RuleKind, RulePayload,
    RuleStore, TimeWindow,
};
use std::sync::Arc;

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A fixed "now": Monday 2025-03-03 08:00 New York (13:00Z).
fn now() -> DateTime<Utc> {
    "2025-03-03T13:00:00Z".parse().unwrap()
}

fn store_with_provider() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let hours = BusinessHours::default().with(
        Weekday::Mon,
        vec![TimeWindow::new(time(9, 0), time(17, 0)).unwrap()],
    );
    store
        .upsert_provider(Provider {
            id: ProviderId::new("vet-1"),
            timezone: "America/New_York".to_string(),
            hours,
        })
        .unwrap();
    store
}

fn provider() -> ProviderId {
    ProviderId::new("vet-1")
}

fn one_time_payload(on: NaiveDate, start: (u32, u32), end: (u32, u32)) -> RulePayload {
    RulePayload {
        date: Some(on),
        start_time: Some(time(start.0, start.1)),
        end_time: Some(time(end.0, end.1)),
        ..Default::default()
    }
}

fn weekly_payload(day_of_week: u8, start: (u32, u32), end: (u32, u32)) -> RulePayload {
    RulePayload {
        day_of_week: Some(day_of_week),
        recurrence_pattern: Some("WEEKLY".to_string()),
        start_time: Some(time(start.0, start.1)),
        end_time: Some(time(end.0, end.1)),
        ..Default::default()
    }
}

fn confirmed_booking(id: u64, start: &str, end: &str) -> Booking {
    Booking {
        id: BookingId(id),
        provider_id: provider(),
        start: start.parse().unwrap(),
        end: end.parse().unwrap(),
        status: BookingStatus::Confirmed,
    }
}

// ── Creation: happy paths ────────────────────────────────────────────────────

#[test]
fn creates_a_weekly_rule() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store.clone());

    let rule = manager
        .create_at(&provider(), weekly_payload(0, (12, 0), (13, 0)), false, now())
        .unwrap();

    assert_eq!(
        rule.kind,
        RuleKind::Recurring {
            day_of_week: Weekday::Mon,
            recurrence_pattern: RecurrencePattern::Weekly,
        }
    );
    assert_eq!(rule.start_time, Some(time(12, 0)));
    assert_eq!(store.rules_for(&provider()).unwrap(), vec![rule]);
}

#[test]
fn creates_a_one_time_rule_for_a_future_date() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let rule = manager
        .create_at(
            &provider(),
            one_time_payload(date(2025, 3, 10), (9, 0), (12, 0)),
            false,
            now(),
        )
        .unwrap();

    assert_eq!(rule.kind, RuleKind::OneTime { date: date(2025, 3, 10) });
}

#[test]
fn all_day_rule_ignores_provided_times() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        is_all_day: true,
        date: Some(date(2025, 3, 10)),
        // Present but meaningless; the stored rule must not carry them.
        start_time: Some(time(14, 0)),
        end_time: Some(time(9, 0)),
        ..Default::default()
    };
    let rule = manager.create_at(&provider(), payload, false, now()).unwrap();

    assert!(rule.is_all_day);
    assert_eq!(rule.start_time, None);
    assert_eq!(rule.end_time, None);
}

#[test]
fn today_is_not_in_the_past() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    // `now` is 2025-03-03 08:00 New York, so 2025-03-03 is today.
    let result = manager.create_at(
        &provider(),
        one_time_payload(date(2025, 3, 3), (15, 0), (16, 0)),
        false,
        now(),
    );
    assert!(result.is_ok());
}

#[test]
fn grace_widens_the_past_date_tolerance() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store).with_grace(Duration::days(1));

    let result = manager.create_at(
        &provider(),
        one_time_payload(date(2025, 3, 2), (15, 0), (16, 0)),
        false,
        now(),
    );
    assert!(result.is_ok());
}

#[test]
fn overlapping_rules_are_legal() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    manager
        .create_at(&provider(), weekly_payload(0, (10, 0), (12, 0)), false, now())
        .unwrap();
    // Overlaps the first rule; compounding is the intended behavior.
    let result =
        manager.create_at(&provider(), weekly_payload(0, (11, 0), (13, 0)), false, now());
    assert!(result.is_ok());
}

// ── Creation: validation failures ────────────────────────────────────────────

#[test]
fn rejects_inverted_window() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let err = manager
        .create_at(
            &provider(),
            one_time_payload(date(2025, 3, 10), (14, 0), (13, 0)),
            false,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "start_time", .. }));
}

#[test]
fn rejects_missing_window_when_not_all_day() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        date: Some(date(2025, 3, 10)),
        ..Default::default()
    };
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "start_time", .. }));
}

#[test]
fn rejects_payload_with_both_date_and_weekday() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        date: Some(date(2025, 3, 10)),
        day_of_week: Some(0),
        recurrence_pattern: Some("WEEKLY".to_string()),
        start_time: Some(time(9, 0)),
        end_time: Some(time(10, 0)),
        ..Default::default()
    };
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "date", .. }));
}

#[test]
fn rejects_payload_with_neither_date_nor_weekday() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        start_time: Some(time(9, 0)),
        end_time: Some(time(10, 0)),
        ..Default::default()
    };
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "date", .. }));
}

#[test]
fn rejects_out_of_range_weekday() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let err = manager
        .create_at(&provider(), weekly_payload(7, (9, 0), (10, 0)), false, now())
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "day_of_week", .. }));
}

#[test]
fn rejects_recurring_rule_without_pattern() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        day_of_week: Some(0),
        start_time: Some(time(9, 0)),
        end_time: Some(time(10, 0)),
        ..Default::default()
    };
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation { field: "recurrence_pattern", .. }
    ));
}

#[test]
fn rejects_unsupported_recurrence_pattern() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let mut payload = weekly_payload(0, (9, 0), (10, 0));
    payload.recurrence_pattern = Some("BIWEEKLY".to_string());
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation { field: "recurrence_pattern", .. }
    ));
}

#[test]
fn rejects_past_date() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let err = manager
        .create_at(
            &provider(),
            one_time_payload(date(2025, 3, 2), (9, 0), (10, 0)),
            false,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { field: "date", .. }));
}

#[test]
fn rejects_unknown_provider() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let err = manager
        .create_at(
            &ProviderId::new("nobody"),
            weekly_payload(0, (9, 0), (10, 0)),
            false,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::ProviderNotFound(_)));
}

// ── Creation vs confirmed bookings ───────────────────────────────────────────

#[test]
fn refuses_rule_over_confirmed_booking() {
    let store = store_with_provider();
    // Next Monday, 10:00-11:00 New York (EDT after the 2025-03-09 switch,
    // so UTC-4) = 14:00Z-15:00Z.
    store
        .seed_booking(confirmed_booking(
            1,
            "2025-03-10T14:00:00Z",
            "2025-03-10T15:00:00Z",
        ))
        .unwrap();
    let manager = BlackoutRuleManager::new(store);

    let err = manager
        .create_at(&provider(), weekly_payload(0, (10, 0), (11, 0)), false, now())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ConflictWithExistingBooking { booking_id: BookingId(1), .. }
    ));
}

#[test]
fn force_overrides_the_booking_conflict() {
    let store = store_with_provider();
    store
        .seed_booking(confirmed_booking(
            1,
            "2025-03-10T14:00:00Z",
            "2025-03-10T15:00:00Z",
        ))
        .unwrap();
    let manager = BlackoutRuleManager::new(store.clone());

    let rule = manager
        .create_at(&provider(), weekly_payload(0, (10, 0), (11, 0)), true, now())
        .unwrap();

    // The rule lands, and the booking is untouched -- cancellation is the
    // caller's workflow, never this engine's.
    assert_eq!(store.rules_for(&provider()).unwrap().len(), 1);
    assert_eq!(
        store.booking(BookingId(1)).unwrap().unwrap().status,
        BookingStatus::Confirmed
    );
    assert_eq!(rule.start_time, Some(time(10, 0)));
}

#[test]
fn pending_bookings_do_not_block_rule_creation() {
    let store = store_with_provider();
    let mut pending = confirmed_booking(1, "2025-03-10T14:00:00Z", "2025-03-10T15:00:00Z");
    pending.status = BookingStatus::Pending;
    store.seed_booking(pending).unwrap();
    let manager = BlackoutRuleManager::new(store);

    let result =
        manager.create_at(&provider(), weekly_payload(0, (10, 0), (11, 0)), false, now());
    assert!(result.is_ok());
}

#[test]
fn booking_outside_the_window_does_not_conflict() {
    let store = store_with_provider();
    // 15:00-16:00 New York (EDT), clear of the proposed 10:00-11:00 block.
    store
        .seed_booking(confirmed_booking(
            1,
            "2025-03-10T19:00:00Z",
            "2025-03-10T20:00:00Z",
        ))
        .unwrap();
    let manager = BlackoutRuleManager::new(store);

    let result =
        manager.create_at(&provider(), weekly_payload(0, (10, 0), (11, 0)), false, now());
    assert!(result.is_ok());
}

#[test]
fn all_day_rule_conflicts_with_any_confirmed_booking_that_day() {
    let store = store_with_provider();
    store
        .seed_booking(confirmed_booking(
            1,
            "2025-03-10T19:00:00Z",
            "2025-03-10T20:00:00Z",
        ))
        .unwrap();
    let manager = BlackoutRuleManager::new(store);

    let payload = RulePayload {
        is_all_day: true,
        date: Some(date(2025, 3, 10)),
        ..Default::default()
    };
    let err = manager.create_at(&provider(), payload, false, now()).unwrap_err();
    assert!(matches!(err, EngineError::ConflictWithExistingBooking { .. }));
}

// ── Deletion ─────────────────────────────────────────────────────────────────

#[test]
fn delete_removes_the_rule() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store.clone());

    let rule = manager
        .create_at(&provider(), weekly_payload(0, (12, 0), (13, 0)), false, now())
        .unwrap();
    manager.delete(&provider(), rule.id).unwrap();

    assert!(store.rules_for(&provider()).unwrap().is_empty());
}

#[test]
fn delete_is_idempotent() {
    let store = store_with_provider();
    let manager = BlackoutRuleManager::new(store);

    let rule_id = RuleId(42);
    // Deleting a rule that never existed, twice: both succeed -- the desired
    // end state ("rule gone") already holds, and retrying clients rely on it.
    assert!(manager.delete(&provider(), rule_id).is_ok());
    assert!(manager.delete(&provider(), rule_id).is_ok());
}
