use serde_json::Value;

use crate::calendar::PeriodCalendar;
use crate::models::Course;

use super::config::FilterConfig;
use super::selection::{AxisRule, FilterAxis, FilterSelection};

/// Decides which courses survive the current selection.
pub struct CourseFilter<'a> {
    selection: &'a FilterSelection,
    calendar: &'a PeriodCalendar,
    config: &'a FilterConfig,
}

impl<'a> CourseFilter<'a> {
    pub fn new(
        selection: &'a FilterSelection,
        calendar: &'a PeriodCalendar,
        config: &'a FilterConfig,
    ) -> Self {
        Self {
            selection,
            calendar,
            config,
        }
    }

    /// Narrow by prefix, then by period. Survivors keep their input order and
    /// are moved out untouched.
    pub fn apply(&self, courses: Vec<Value>) -> Vec<Value> {
        FilterAxis::ALL
            .into_iter()
            .fold(courses, |remaining, axis| self.apply_axis(axis, remaining))
    }

    fn apply_axis(&self, axis: FilterAxis, mut courses: Vec<Value>) -> Vec<Value> {
        courses.retain(|raw| self.axis_keeps(axis, &Course::new(raw)));
        courses
    }

    fn axis_keeps(&self, axis: FilterAxis, course: &Course<'_>) -> bool {
        match self.selection.axis(axis).rule(self.config.min_len(axis)) {
            AxisRule::Include(values) => values.iter().any(|v| self.matches(axis, v, course)),
            AxisRule::Exclude(values) => !values.iter().any(|v| self.matches(axis, v, course)),
            AxisRule::Unconstrained => true,
        }
    }

    fn matches(&self, axis: FilterAxis, value: &str, course: &Course<'_>) -> bool {
        match axis {
            FilterAxis::Prefix => course
                .code()
                .map(|code| matches_prefix(&code, value, self.config.strip_leading_char))
                .unwrap_or(false),
            FilterAxis::Period => self.calendar.in_period_named(value, course).starts,
        }
    }
}

/// `CS` matches `CS-E4580`, and with `strip_leading_char` also `ACS-E4580`.
pub fn matches_prefix(code: &str, prefix: &str, strip_leading_char: bool) -> bool {
    if code.starts_with(prefix) {
        return true;
    }
    if !strip_leading_char {
        return false;
    }
    let mut chars = code.chars();
    chars.next();
    chars.as_str().starts_with(prefix)
}

/// Convenience wrapper over [`CourseFilter::apply`].
pub fn filter_courses(
    courses: Vec<Value>,
    selection: &FilterSelection,
    calendar: &PeriodCalendar,
    config: &FilterConfig,
) -> Vec<Value> {
    CourseFilter::new(selection, calendar, config).apply(courses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{AcademicYear, DEFAULT_PERIOD_OFFSET_DAYS};
    use crate::filters::selection::{AxisSelection, FilterValues};
    use chrono::Duration;
    use proptest::prelude::*;
    use serde_json::json;

    fn course(code: &str, start: &str, end: &str) -> Value {
        json!({
            "Id": format!("id-{code}"),
            "hed__Course__r": { "CourseCode__c": code },
            "hed__Start_Date__c": start,
            "hed__End_Date__c": end,
        })
    }

    fn calendar() -> PeriodCalendar {
        PeriodCalendar::new(AcademicYear::new(2024), Duration::days(DEFAULT_PERIOD_OFFSET_DAYS))
    }

    fn codes(courses: &[Value]) -> Vec<String> {
        courses
            .iter()
            .filter_map(|raw| Course::new(raw).code())
            .collect()
    }

    fn two_courses() -> Vec<Value> {
        vec![
            course("CS-E4580", "2024-09-02", "2024-10-14"),
            course("MS-C1620", "2024-09-02", "2024-10-14"),
        ]
    }

    fn prefixes(positive: &[&str], negative: &[&str]) -> FilterSelection {
        FilterSelection {
            prefixes: AxisSelection {
                positive: FilterValues::new(positive.iter().copied()),
                negative: FilterValues::new(negative.iter().copied()),
            },
            ..FilterSelection::default()
        }
    }

    #[test]
    fn positive_prefix_keeps_only_matches() {
        let out = filter_courses(
            two_courses(),
            &prefixes(&["CS"], &[]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(codes(&out), ["CS-E4580"]);
    }

    #[test]
    fn negative_prefix_excludes_matches() {
        let out = filter_courses(
            two_courses(),
            &prefixes(&[], &["MS"]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(codes(&out), ["CS-E4580"]);
    }

    #[test]
    fn negative_is_ignored_when_positive_is_valid() {
        let out = filter_courses(
            two_courses(),
            &prefixes(&["CS", "MS"], &["MS"]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(codes(&out), ["CS-E4580", "MS-C1620"]);
    }

    #[test]
    fn short_prefix_invalidates_the_set() {
        let out = filter_courses(
            two_courses(),
            &prefixes(&["C"], &[]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn leading_letter_is_tolerated() {
        assert!(matches_prefix("ACS-A1120", "CS", true));
        assert!(!matches_prefix("ACS-A1120", "CS", false));
        assert!(matches_prefix("CS-A1120", "CS", false));
        assert!(!matches_prefix("ELEC-A7100", "CS", true));
    }

    #[test]
    fn period_filter_uses_start_date() {
        let courses = vec![
            course("CS-E4580", "2024-09-02", "2024-12-10"),
            course("CS-E5520", "2025-01-08", "2025-02-19"),
        ];
        let selection = FilterSelection {
            periods: AxisSelection {
                positive: FilterValues::new(["III"]),
                negative: FilterValues::default(),
            },
            ..FilterSelection::default()
        };
        let out = filter_courses(courses, &selection, &calendar(), &FilterConfig::default());
        assert_eq!(codes(&out), ["CS-E5520"]);
    }

    #[test]
    fn prefix_and_period_compose() {
        let courses = vec![
            course("CS-E4580", "2024-09-02", "2024-10-14"),
            course("CS-E5520", "2025-01-08", "2025-02-19"),
            course("MS-C1620", "2024-09-02", "2024-10-14"),
        ];
        let selection = FilterSelection {
            prefixes: AxisSelection {
                positive: FilterValues::new(["CS"]),
                negative: FilterValues::default(),
            },
            periods: AxisSelection {
                positive: FilterValues::default(),
                negative: FilterValues::new(["III"]),
            },
        };
        let out = filter_courses(courses, &selection, &calendar(), &FilterConfig::default());
        assert_eq!(codes(&out), ["CS-E4580"]);
    }

    #[test]
    fn courses_without_code_fail_positive_and_pass_negative() {
        let anonymous = json!({ "hed__Start_Date__c": "2024-09-02" });
        let include = filter_courses(
            vec![anonymous.clone()],
            &prefixes(&["CS"], &[]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert!(include.is_empty());
        let exclude = filter_courses(
            vec![anonymous],
            &prefixes(&[], &["CS"]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(exclude.len(), 1);
    }

    #[test]
    fn survivors_are_untouched() {
        let input = two_courses();
        let out = filter_courses(
            input.clone(),
            &prefixes(&["CS"], &[]),
            &calendar(),
            &FilterConfig::default(),
        );
        assert_eq!(out[0], input[0]);
    }

    fn arb_courses() -> impl Strategy<Value = Vec<Value>> {
        let prefix = prop::sample::select(vec!["CS", "MS", "ELEC", "PHYS", "ACS"]);
        let day = 0i64..365;
        prop::collection::vec((prefix, 1000u32..9999, day), 0..20).prop_map(|items| {
            items
                .into_iter()
                .map(|(prefix, number, offset)| {
                    let start = chrono::NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
                        + Duration::days(offset);
                    let end = start + Duration::days(40);
                    course(&format!("{prefix}-E{number}"), &start.to_string(), &end.to_string())
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn empty_selection_is_identity(courses in arb_courses()) {
            let out = filter_courses(
                courses.clone(),
                &FilterSelection::default(),
                &calendar(),
                &FilterConfig::default(),
            );
            prop_assert_eq!(out, courses);
        }

        #[test]
        fn positive_prefix_wins_regardless_of_negative(
            courses in arb_courses(),
            negative in prop::collection::vec("[A-Z]{2,4}", 0..4),
        ) {
            let selection = FilterSelection {
                prefixes: AxisSelection {
                    positive: FilterValues::new(["CS"]),
                    negative: FilterValues::new(negative),
                },
                ..FilterSelection::default()
            };
            let out = filter_courses(courses.clone(), &selection, &calendar(), &FilterConfig::default());
            let expected: Vec<Value> = courses
                .into_iter()
                .filter(|raw| {
                    Course::new(raw)
                        .code()
                        .map(|code| matches_prefix(&code, "CS", true))
                        .unwrap_or(false)
                })
                .collect();
            prop_assert_eq!(out, expected);
        }

        #[test]
        fn output_is_an_ordered_subsequence(
            courses in arb_courses(),
            period in prop::sample::select(vec!["I", "II", "III", "IV", "V", "Summer"]),
        ) {
            let selection = FilterSelection {
                periods: AxisSelection {
                    positive: FilterValues::default(),
                    negative: FilterValues::new([period]),
                },
                ..FilterSelection::default()
            };
            let out = filter_courses(courses.clone(), &selection, &calendar(), &FilterConfig::default());
            let mut remaining = courses.iter();
            for kept in &out {
                prop_assert!(remaining.any(|c| c == kept));
            }
        }
    }
}
