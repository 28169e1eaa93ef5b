use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, used for creation timestamps.
pub type Ms = i64;

/// Identifier of one physical car in the fleet.
pub type UnitId = u32;

/// Closed calendar-date interval `[start, end]`. Both days are booked.
///
/// `start <= end` always holds: the only constructor checks it, and
/// deserialized spans come from WAL records written from checked spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    /// `None` if `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of booked days, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Inclusive overlap: sharing a single boundary day is a conflict.
    pub fn overlaps(&self, other: &DateSpan) -> bool {
        !(self.end < other.start || self.start > other.end)
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Customer details carried through to the ledger untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub pobox: Option<String>,
    pub occupation: Option<String>,
    pub workplace: Option<String>,
    pub additional_driver: Option<String>,
}

impl Customer {
    /// All fields as `(column, value)` pairs, absent optionals as empty strings.
    pub fn fields(&self) -> [(&'static str, &str); 9] {
        [
            ("name", self.name.as_str()),
            ("surname", self.surname.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.address.as_str()),
            ("pobox", self.pobox.as_deref().unwrap_or("")),
            ("occupation", self.occupation.as_deref().unwrap_or("")),
            ("workplace", self.workplace.as_deref().unwrap_or("")),
            ("additional_driver", self.additional_driver.as_deref().unwrap_or("")),
        ]
    }
}

/// A booking that has not been allocated a unit yet. Never visible to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub category: String,
    pub span: DateSpan,
    pub customer: Customer,
}

/// A committed booking of one unit. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub category: String,
    pub unit_id: UnitId,
    pub plate: String,
    pub span: DateSpan,
    pub created_at: Ms,
    pub customer: Customer,
}

/// Spans booked on a single unit, sorted by `start`.
#[derive(Debug, Clone, Default)]
pub struct UnitSchedule {
    pub spans: Vec<DateSpan>,
}

impl UnitSchedule {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Insert span maintaining sort order by start.
    pub fn insert(&mut self, span: DateSpan) {
        let pos = self
            .spans
            .binary_search_by_key(&span.start, |s| s.start)
            .unwrap_or_else(|e| e);
        self.spans.insert(pos, span);
    }

    /// Return only spans overlapping the query.
    /// Uses binary search to skip spans starting after `query.end`.
    pub fn overlapping(&self, query: &DateSpan) -> impl Iterator<Item = &DateSpan> {
        // Everything at index >= right_bound starts after query.end → can't overlap.
        let right_bound = self.spans.partition_point(|s| s.start <= query.end);
        self.spans[..right_bound]
            .iter()
            .filter(move |s| s.end >= query.start)
    }

    pub fn is_free(&self, query: &DateSpan) -> bool {
        self.overlapping(query).next().is_none()
    }
}

/// The event types. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCommitted(Reservation),
}
