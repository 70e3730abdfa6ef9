pub mod course;

pub use course::{normalize_code, parse_course_date, Course};
