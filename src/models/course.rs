//! Read-only view over one raw course object from the catalog envelope.
//!
//! The object is never copied or rebuilt; the view only knows where the three
//! fields the engine depends on live.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

pub const COURSE_REF_FIELD: &str = "hed__Course__r";
pub const COURSE_CODE_FIELD: &str = "CourseCode__c";
pub const START_DATE_FIELD: &str = "hed__Start_Date__c";
pub const END_DATE_FIELD: &str = "hed__End_Date__c";

#[derive(Debug, Clone, Copy)]
pub struct Course<'a> {
    raw: &'a Value,
}

impl<'a> Course<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    /// Normalized course code, `None` when absent or blank.
    pub fn code(&self) -> Option<String> {
        let code = self
            .raw
            .get(COURSE_REF_FIELD)?
            .get(COURSE_CODE_FIELD)?
            .as_str()
            .map(normalize_code)?;
        (!code.is_empty()).then_some(code)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.date_field(START_DATE_FIELD)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.date_field(END_DATE_FIELD)
    }

    fn date_field(&self, field: &str) -> Option<NaiveDate> {
        self.raw.get(field)?.as_str().and_then(parse_course_date)
    }
}

fn is_stray_char(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '"' | '\'' | '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FFFD}'
        )
}

/// Strip the wrapping bytes the catalog sometimes leaves around codes and dates
/// (quotes, BOM, zero-width and no-break spaces, replacement characters).
pub fn normalize_code(raw: &str) -> String {
    raw.trim_matches(is_stray_char).to_string()
}

/// Accepts `YYYY-MM-DD`, full RFC 3339 timestamps, or any string starting
/// with a `YYYY-MM-DD` prefix.
pub fn parse_course_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim_matches(is_stray_char);

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
