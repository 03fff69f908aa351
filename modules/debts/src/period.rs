//! Billing month arithmetic
//!
//! A billing month is a calendar month in UTC. Its window runs from the first
//! instant of the month to the last millisecond (23:59:59.999) of its last day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("Year out of range: {0}")]
    InvalidYear(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

/// Inclusive time window covered by a billing month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        // Both the first of this month and the first of the next must exist
        let next_year = if month == 12 { year.checked_add(1) } else { Some(year) };
        let valid = NaiveDate::from_ymd_opt(year, month, 1).is_some()
            && next_year
                .and_then(|y| NaiveDate::from_ymd_opt(y, month % 12 + 1, 1))
                .is_some();
        if !valid {
            return Err(PeriodError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    /// The billing month containing `at`
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// "YYYY-MM"
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // Validated in new()/containing()
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn window(&self) -> MonthWindow {
        let start = Utc.from_utc_datetime(&self.first_day().and_time(chrono::NaiveTime::MIN));
        let next_start =
            Utc.from_utc_datetime(&self.next().first_day().and_time(chrono::NaiveTime::MIN));
        MonthWindow {
            start,
            end: next_start - Duration::milliseconds(1),
        }
    }
}

impl std::fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_zero_pads_month() {
        assert_eq!(BillingMonth::new(2025, 1).unwrap().label(), "2025-01");
        assert_eq!(BillingMonth::new(2025, 11).unwrap().label(), "2025-11");
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert_eq!(BillingMonth::new(2025, 0), Err(PeriodError::InvalidMonth(0)));
        assert_eq!(BillingMonth::new(2025, 13), Err(PeriodError::InvalidMonth(13)));
    }

    #[test]
    fn test_window_bounds() {
        let window = BillingMonth::new(2024, 2).unwrap().window();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_december_window_rolls_year() {
        let window = BillingMonth::new(2025, 12).unwrap().window();
        assert_eq!(
            window.end + Duration::milliseconds(1),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_previous_and_next() {
        let jan = BillingMonth::new(2026, 1).unwrap();
        assert_eq!(jan.previous(), BillingMonth::new(2025, 12).unwrap());
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(BillingMonth::new(2025, 7).unwrap().previous().label(), "2025-06");
    }

    #[test]
    fn test_containing() {
        let at = Utc.with_ymd_and_hms(2025, 11, 30, 23, 59, 59).unwrap();
        assert_eq!(BillingMonth::containing(at).label(), "2025-11");
    }
}
