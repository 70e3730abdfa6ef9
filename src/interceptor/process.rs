use serde::Serialize;
use serde_json::Value;

use crate::calendar::PeriodCalendar;
use crate::envelope::{rewrite_courses, EnvelopeError, Rewrite};
use crate::filters::{CourseFilter, FilterConfig, FilterSelection};
use crate::models::Course;
use crate::settings::CoursePeriods;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub kept: usize,
    pub total: usize,
}

/// Result of running one decoded body through the filter.
#[derive(Debug)]
pub struct ProcessedBody {
    pub rewrite: Rewrite,
    /// Non-empty period-range labels of the surviving courses, keyed by code.
    pub course_periods: CoursePeriods,
    /// `None` when the body carried no course list.
    pub counts: Option<FilterCounts>,
}

/// Filter the course array inside `text` and collect period labels for what
/// survives. Synchronous and CPU-bound.
///
/// With `period_field` set, each surviving course object also gets its label
/// written under that key.
pub fn process_body(
    text: &str,
    selection: &FilterSelection,
    calendar: &PeriodCalendar,
    config: &FilterConfig,
    period_field: Option<&str>,
) -> Result<ProcessedBody, EnvelopeError> {
    let filter = CourseFilter::new(selection, calendar, config);
    let mut course_periods = CoursePeriods::new();
    let mut kept = 0;
    let mut total = 0;

    let rewrite = rewrite_courses(text, |courses| {
        total = courses.len();
        let mut survivors = filter.apply(courses);
        kept = survivors.len();

        for raw in &mut survivors {
            let course = Course::new(raw);
            let label = calendar.period_range(&course);
            let code = course.code();

            if let Some(code) = code.filter(|_| !label.is_empty()) {
                course_periods.insert(code, label.clone());
            }
            if let (Some(field), Value::Object(map)) = (period_field, raw) {
                map.insert(field.to_string(), Value::String(label));
            }
        }
        survivors
    })?;

    let counts = match rewrite {
        Rewrite::Passthrough => None,
        Rewrite::Rewritten(_) => Some(FilterCounts { kept, total }),
    };
    Ok(ProcessedBody {
        rewrite,
        course_periods,
        counts,
    })
}
