//! Core data model: providers, business hours, blackout rules, bookings, and
//! resolved slots.
//!
//! Time-of-day values cross the API boundary as `"HH:MM"` strings and weekdays
//! as integers (0 = Monday .. 6 = Sunday); the serde modules at the bottom of
//! this file own those encodings. Booking timestamps are UTC and use chrono's
//! RFC 3339 serde impls directly.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque provider identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque blackout-rule identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque booking identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A half-open time-of-day interval `[start, end)` within a single day.
///
/// Half-open semantics make adjacent windows non-overlapping: a window ending
/// at 10:00 and one starting at 10:00 do not touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted ranges.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Half-open overlap test: touching boundaries do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Standing weekly business hours: zero or more open windows per weekday.
///
/// Unset weekdays default to empty, which means "closed" — business hours have
/// no independent lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    pub monday: Vec<TimeWindow>,
    pub tuesday: Vec<TimeWindow>,
    pub wednesday: Vec<TimeWindow>,
    pub thursday: Vec<TimeWindow>,
    pub friday: Vec<TimeWindow>,
    pub saturday: Vec<TimeWindow>,
    pub sunday: Vec<TimeWindow>,
}

impl BusinessHours {
    pub fn for_weekday(&self, weekday: Weekday) -> &[TimeWindow] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn set(&mut self, weekday: Weekday, windows: Vec<TimeWindow>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = windows;
    }

    /// Builder-style variant of [`set`](Self::set) for fixture construction.
    pub fn with(mut self, weekday: Weekday, windows: Vec<TimeWindow>) -> Self {
        self.set(weekday, windows);
        self
    }
}

/// Recurrence pattern for recurring blackout rules.
///
/// Only `WEEKLY` is understood today. Unknown strings are preserved as
/// [`Other`](RecurrencePattern::Other) rather than rejected at the storage
/// boundary, so that resolution can fail loudly on them instead of a newer
/// writer's rules being silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecurrencePattern {
    Weekly,
    Other(String),
}

impl From<String> for RecurrencePattern {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("WEEKLY") {
            RecurrencePattern::Weekly
        } else {
            RecurrencePattern::Other(s)
        }
    }
}

impl From<RecurrencePattern> for String {
    fn from(p: RecurrencePattern) -> Self {
        match p {
            RecurrencePattern::Weekly => "WEEKLY".to_string(),
            RecurrencePattern::Other(s) => s,
        }
    }
}

/// Discriminated rule kind: a fixed calendar date or a recurring weekday.
///
/// The `kind` tag is flattened into the rule's boundary representation, so the
/// wire shape stays flat (`{"kind": "one_time", "date": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    OneTime {
        date: NaiveDate,
    },
    Recurring {
        #[serde(with = "weekday_num")]
        day_of_week: Weekday,
        recurrence_pattern: RecurrencePattern,
    },
}

/// A provider-defined closure: one-time or recurring, all-day or windowed.
///
/// Invariant (enforced at creation): when `is_all_day` is false, `start_time`
/// and `end_time` are present with `start_time < end_time`. A stored rule that
/// violates this is a data-integrity fault and makes resolution fail closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackoutRule {
    pub id: RuleId,
    #[serde(flatten)]
    pub kind: RuleKind,
    pub is_all_day: bool,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BlackoutRule {
    /// The blocked window for a non-all-day rule, `None` when the stored
    /// times are missing or inverted.
    pub fn window(&self) -> Option<TimeWindow> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => TimeWindow::new(start, end),
            _ => None,
        }
    }
}

/// A validated blackout rule awaiting an id from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub kind: RuleKind,
    pub is_all_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

impl RuleDraft {
    pub fn into_rule(self, id: RuleId) -> BlackoutRule {
        BlackoutRule {
            id,
            kind: self.kind,
            is_all_day: self.is_all_day,
            start_time: self.start_time,
            end_time: self.end_time,
            reason: self.reason,
        }
    }
}

/// Unvalidated rule-creation payload as it crosses the API boundary.
///
/// Exactly one of `date` (one-time) or `day_of_week` + `recurrence_pattern`
/// (recurring) must be present; the manager rejects payloads with both or
/// neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePayload {
    pub is_all_day: bool,
    #[serde(with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Booking lifecycle status. Only non-cancelled, non-rejected bookings occupy
/// time for conflict purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub fn occupies_time(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// A booking row. Timestamps are stored in UTC; conversion to provider-local
/// civil time happens at resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub provider_id: ProviderId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
}

/// A booking awaiting an id from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub provider_id: ProviderId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
}

/// A contiguous open interval on a specific date, after applying business
/// hours, blackout rules, and occupying bookings.
///
/// Derived data: computed on demand, never persisted, recomputed on every
/// query to avoid staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

/// A service provider's schedule root: identity, IANA timezone, and standing
/// hours. The timezone is stored as a string and parsed on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub timezone: String,
    #[serde(default)]
    pub hours: BusinessHours,
}

/// Serde adapter for `"HH:MM"` time-of-day strings.
///
/// Serializes as `"HH:MM"`; accepts `"HH:MM"` and `"HH:MM:SS"` on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub(crate) fn parse(s: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map_err(|_| format!("expected HH:MM time-of-day, got {:?}", s))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => super::serialize(t, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            s.map(|s| super::parse(&s).map_err(D::Error::custom))
                .transpose()
        }
    }
}

/// Serde adapter for weekdays as integers, 0 = Monday .. 6 = Sunday.
pub mod weekday_num {
    use chrono::Weekday;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(weekday.num_days_from_monday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let n = u8::deserialize(deserializer)?;
        weekday_from_index(n).ok_or_else(|| {
            D::Error::custom(format!("day_of_week must be 0..=6 (Monday=0), got {}", n))
        })
    }

    /// 0 = Monday .. 6 = Sunday, `None` outside that range.
    pub fn weekday_from_index(n: u8) -> Option<Weekday> {
        match n {
            0 => Some(Weekday::Mon),
            1 => Some(Weekday::Tue),
            2 => Some(Weekday::Wed),
            3 => Some(Weekday::Thu),
            4 => Some(Weekday::Fri),
            5 => Some(Weekday::Sat),
            6 => Some(Weekday::Sun),
            _ => None,
        }
    }
}
