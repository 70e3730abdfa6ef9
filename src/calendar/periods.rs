use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::month_day::MonthDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    I,
    II,
    III,
    IV,
    V,
    Summer,
}

impl Period {
    /// Declaration order. Range labels always prefer the earliest match.
    pub const ALL: [Period; 6] = [
        Period::I,
        Period::II,
        Period::III,
        Period::IV,
        Period::V,
        Period::Summer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::I => "I",
            Period::II => "II",
            Period::III => "III",
            Period::IV => "IV",
            Period::V => "V",
            Period::Summer => "Summer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Period::ALL
            .into_iter()
            .find(|period| period.as_str() == name.trim())
    }

    /// Autumn periods sit in the first calendar year of the academic year.
    fn in_autumn(&self) -> bool {
        matches!(self, Period::I | Period::II)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed month-day window of one period. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodDefinition {
    pub period: Period,
    pub start: MonthDay,
    pub end: MonthDay,
}

pub const PERIOD_DEFINITIONS: [PeriodDefinition; 6] = [
    PeriodDefinition {
        period: Period::I,
        start: MonthDay::new(8, 25),
        end: MonthDay::new(10, 14),
    },
    PeriodDefinition {
        period: Period::II,
        start: MonthDay::new(10, 15),
        end: MonthDay::new(12, 31),
    },
    PeriodDefinition {
        period: Period::III,
        start: MonthDay::new(1, 1),
        end: MonthDay::new(2, 19),
    },
    PeriodDefinition {
        period: Period::IV,
        start: MonthDay::new(2, 20),
        end: MonthDay::new(4, 14),
    },
    PeriodDefinition {
        period: Period::V,
        start: MonthDay::new(4, 15),
        end: MonthDay::new(5, 24),
    },
    PeriodDefinition {
        period: Period::Summer,
        start: MonthDay::new(5, 25),
        end: MonthDay::new(8, 24),
    },
];

/// Academic year identified by the calendar year its autumn falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcademicYear {
    pub start_year: i32,
}

impl AcademicYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The catalog year a user is browsing on `today`.
    ///
    /// January through May belong to the year that started last autumn; from
    /// June onwards the upcoming autumn's catalog is the current one.
    pub fn for_catalog(today: NaiveDate) -> Self {
        if today.month() <= 5 {
            Self::new(today.year() - 1)
        } else {
            Self::new(today.year())
        }
    }

    /// Calendar year a period's window is anchored to.
    pub fn year_of(&self, period: Period) -> i32 {
        if period.in_autumn() {
            self.start_year
        } else {
            self.start_year + 1
        }
    }
}
