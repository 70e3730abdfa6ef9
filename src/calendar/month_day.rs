use chrono::{Datelike, NaiveDate};

/// A calendar date with the year stripped, ordered as `MMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Callers are trusted to pass a real month/day pair; `on_year` tolerates Feb 29.
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    /// Concrete date in `year`. Feb 29 lands on Feb 28 in non-leap years.
    pub fn on_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day).or_else(|| {
            if self.month == 2 && self.day == 29 {
                NaiveDate::from_ymd_opt(year, 2, 28)
            } else {
                None
            }
        })
    }
}

/// Inclusive month-day window that may wrap past Dec 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDayRange {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl MonthDayRange {
    pub fn new(start: MonthDay, end: MonthDay) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: MonthDay) -> bool {
        if self.start <= self.end {
            self.start <= value && value <= self.end
        } else {
            value >= self.start || value <= self.end
        }
    }
}
