//! Positive/negative filter rules over course prefixes and periods.

pub mod catalog;
pub mod config;
pub mod evaluator;
pub mod selection;

pub use config::FilterConfig;
pub use evaluator::{filter_courses, matches_prefix, CourseFilter};
pub use selection::{
    AxisRule, AxisSelection, FilterAxis, FilterSelection, FilterValues, OptionState, Polarity,
};
