use crate::error::DacError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The Monday that opens an ISO week.
///
/// A week covers the half-open interval `[monday 00:00, next monday 00:00)`,
/// so every timestamp belongs to exactly one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct WeekStart(NaiveDate);

impl WeekStart {
    pub fn new(date: NaiveDate) -> Result<Self, DacError> {
        if date.weekday() != Weekday::Mon {
            return Err(DacError::invalid_input(
                "week_start",
                &date.to_string(),
                format!("weeks start on Monday, got {}", date.weekday()),
            ));
        }
        Ok(Self(date))
    }

    pub fn from_iso(year: i32, week: u32) -> Result<Self, DacError> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(Self)
            .ok_or_else(|| {
                DacError::invalid_input(
                    "iso_week",
                    &format!("{}-W{:02}", year, week),
                    "no such ISO week",
                )
            })
    }

    /// The week whose interval contains `date`.
    pub fn containing_date(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self(date - Duration::days(offset))
    }

    pub fn containing(timestamp: NaiveDateTime) -> Self {
        Self::containing_date(timestamp.date())
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn start(self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    pub fn end_exclusive(self) -> NaiveDateTime {
        self.next().start()
    }

    pub fn contains(self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start() && timestamp < self.end_exclusive()
    }

    pub fn next(self) -> Self {
        Self(self.0 + Duration::days(7))
    }

    pub fn iso_week(self) -> (i32, u32) {
        let iso = self.0.iso_week();
        (iso.year(), iso.week())
    }

    /// Every week from the one containing `from` through the one containing `to`.
    pub fn range_inclusive(from: NaiveDate, to: NaiveDate) -> Vec<WeekStart> {
        let last = Self::containing_date(to);
        let mut weeks = Vec::new();
        let mut current = Self::containing_date(from);
        while current <= last {
            weeks.push(current);
            current = current.next();
        }
        weeks
    }
}

impl TryFrom<NaiveDate> for WeekStart {
    type Error = DacError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        Self::new(date)
    }
}

impl From<WeekStart> for NaiveDate {
    fn from(week: WeekStart) -> Self {
        week.0
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, week) = self.iso_week();
        write!(f, "{}-W{:02} ({})", year, week, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_non_monday() {
        assert!(matches!(
            WeekStart::new(date(2024, 3, 5)),
            Err(DacError::InvalidInput { .. })
        ));
        assert!(WeekStart::new(date(2024, 3, 4)).is_ok());
    }

    #[test]
    fn boundaries_are_half_open() {
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        assert!(week.contains(date(2024, 3, 4).and_hms_opt(0, 0, 0).unwrap()));
        assert!(week.contains(date(2024, 3, 10).and_hms_opt(23, 59, 59).unwrap()));
        assert!(!week.contains(date(2024, 3, 11).and_hms_opt(0, 0, 0).unwrap()));
        assert!(week.next().contains(date(2024, 3, 11).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn containing_maps_to_monday() {
        let sunday = date(2024, 3, 10).and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(WeekStart::containing(sunday).date(), date(2024, 3, 4));
    }

    #[test]
    fn iso_week_round_trips() {
        let week = WeekStart::from_iso(2024, 10).unwrap();
        assert_eq!(week.date(), date(2024, 3, 4));
        assert_eq!(week.iso_week(), (2024, 10));
        assert!(WeekStart::from_iso(2024, 60).is_err());
    }

    #[test]
    fn range_covers_partial_weeks() {
        let weeks = WeekStart::range_inclusive(date(2024, 3, 6), date(2024, 3, 18));
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].date(), date(2024, 3, 4));
        assert_eq!(weeks[2].date(), date(2024, 3, 18));
    }
}
