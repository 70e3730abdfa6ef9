//! Maps course start/end dates onto named academic periods.
//!
//! Dates are compared as year-less `MonthDay` keys so a course from any year
//! lands in the same period. The academic year only matters when the trailing
//! offset is added to a period's end: that arithmetic runs on the concrete
//! date (so Dec 31 + 7 days rolls into January and Feb 29 exists only in leap
//! years) and the result is normalized back to a key.

pub mod month_day;
pub mod periods;

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::models::Course;

pub use month_day::{MonthDay, MonthDayRange};
pub use periods::{AcademicYear, Period, PeriodDefinition, PERIOD_DEFINITIONS};

pub const DEFAULT_PERIOD_OFFSET_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodMatch {
    pub starts: bool,
    pub ends: bool,
}

#[derive(Debug, Clone)]
pub struct PeriodCalendar {
    year: AcademicYear,
    offset: Duration,
    definitions: Vec<PeriodDefinition>,
}

impl PeriodCalendar {
    pub fn new(year: AcademicYear, offset: Duration) -> Self {
        Self {
            year,
            offset,
            definitions: PERIOD_DEFINITIONS.to_vec(),
        }
    }

    /// Calendar for the catalog currently being browsed.
    pub fn for_today(offset: Duration) -> Self {
        Self::new(AcademicYear::for_catalog(Local::now().date_naive()), offset)
    }

    pub fn year(&self) -> AcademicYear {
        self.year
    }

    pub fn in_period(&self, period: Period, course: &Course<'_>) -> PeriodMatch {
        let Some(def) = self.definition(period) else {
            return PeriodMatch::default();
        };

        let start_window = MonthDayRange::new(def.start, def.end);
        let starts = course
            .start_date()
            .map(|date| start_window.contains(MonthDay::of(&date)))
            .unwrap_or(false);
        let ends = course
            .end_date()
            .map(|date| self.ends_window(def).contains(MonthDay::of(&date)))
            .unwrap_or(false);

        PeriodMatch { starts, ends }
    }

    /// Same as [`in_period`](Self::in_period) for a stored period name.
    /// Unknown names never match.
    pub fn in_period_named(&self, name: &str, course: &Course<'_>) -> PeriodMatch {
        Period::from_name(name)
            .map(|period| self.in_period(period, course))
            .unwrap_or_default()
    }

    /// `"I"`, `"I-II"`, or `""` when no period matches.
    ///
    /// The start label is the first declared period the course starts in. The
    /// end label is searched from that period onwards, wrapping past Summer,
    /// so an end date inside an earlier period's trailing offset cannot yield
    /// a reversed label such as `"III-II"`.
    pub fn period_range(&self, course: &Course<'_>) -> String {
        let matches: Vec<(Period, PeriodMatch)> = self
            .definitions
            .iter()
            .map(|def| (def.period, self.in_period(def.period, course)))
            .collect();

        let start_index = matches.iter().position(|(_, matched)| matched.starts);
        let start_label = start_index.map(|index| matches[index].0);
        let end_label = matches
            .iter()
            .cycle()
            .skip(start_index.unwrap_or(0))
            .take(matches.len())
            .find(|(_, matched)| matched.ends)
            .map(|(period, _)| *period);

        match (start_label, end_label) {
            (Some(start), Some(end)) if start == end => start.to_string(),
            (Some(start), Some(end)) => format!("{start}-{end}"),
            (Some(only), None) | (None, Some(only)) => only.to_string(),
            (None, None) => String::new(),
        }
    }

    fn definition(&self, period: Period) -> Option<&PeriodDefinition> {
        self.definitions.iter().find(|def| def.period == period)
    }

    /// `[start, end + offset]`, with the offset applied to this year's concrete end date.
    fn ends_window(&self, def: &PeriodDefinition) -> MonthDayRange {
        let shifted_end = def
            .end
            .on_year(self.year.year_of(def.period))
            .and_then(|end: NaiveDate| end.checked_add_signed(self.offset))
            .map(|date| MonthDay::of(&date))
            .unwrap_or(def.end);
        MonthDayRange::new(def.start, shifted_end)
    }
}
