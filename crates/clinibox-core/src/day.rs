//! Clinic day partitioning.
//!
//! Queue views and entry numbers are scoped to a calendar day. `ClinicDay`
//! is the partition key: a plain date that orders, hashes and serializes as
//! `YYYY-MM-DD`.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// The calendar-day partition a visit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicDay(pub Date);

impl ClinicDay {
    /// The day containing the given instant, in UTC.
    pub fn of(instant: OffsetDateTime) -> Self {
        Self(instant.date())
    }

    /// Today's clinic day (UTC).
    pub fn today() -> Self {
        Self::of(OffsetDateTime::now_utc())
    }

    /// Returns the underlying date.
    pub fn date(&self) -> Date {
        self.0
    }

    /// Whether this day falls within the inclusive range `[from, to]`.
    pub fn in_range(&self, from: ClinicDay, to: ClinicDay) -> bool {
        *self >= from && *self <= to
    }
}

impl std::fmt::Display for ClinicDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Date> for ClinicDay {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_day_ordering_and_range() {
        let a = ClinicDay(date!(2025 - 03 - 01));
        let b = ClinicDay(date!(2025 - 03 - 02));
        let c = ClinicDay(date!(2025 - 03 - 05));
        assert!(a < b);
        assert!(b.in_range(a, c));
        assert!(!a.in_range(b, c));
    }

    #[test]
    fn test_day_of_instant() {
        let instant = date!(2025 - 03 - 02).midnight().assume_utc();
        assert_eq!(ClinicDay::of(instant), ClinicDay(date!(2025 - 03 - 02)));
    }
}
