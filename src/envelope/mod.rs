//! Narrow view over the catalog backend's action envelope.
//!
//! The only path the engine relies on is
//! `actions[0].returnValue.returnValue.courses`. Everything else is carried in
//! the parsed tree untouched; the course array is swapped in place so sibling
//! keys keep their position and values on re-serialization.

mod error;

use serde_json::Value;

pub use error::EnvelopeError;

const ACTIONS_FIELD: &str = "actions";
const RETURN_VALUE_FIELD: &str = "returnValue";
const COURSES_FIELD: &str = "courses";

#[derive(Debug, Clone)]
pub struct EnvelopeView {
    root: Value,
}

impl EnvelopeView {
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let root: Value = serde_json::from_str(text).map_err(EnvelopeError::Malformed)?;
        if courses_slot(&root).is_none() {
            return Err(EnvelopeError::MissingCourseData);
        }
        Ok(Self { root })
    }

    /// Move the course array out, leaving an empty one in its place.
    pub fn take_courses(&mut self) -> Vec<Value> {
        courses_slot_mut(&mut self.root)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn set_courses(&mut self, courses: Vec<Value>) {
        if let Some(slot) = courses_slot_mut(&mut self.root) {
            *slot = courses;
        }
    }

    pub fn to_text(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(&self.root).map_err(EnvelopeError::Encode)
    }
}

fn first_payload(root: &Value) -> Option<&Value> {
    root.get(ACTIONS_FIELD)?
        .as_array()?
        .first()?
        .get(RETURN_VALUE_FIELD)?
        .get(RETURN_VALUE_FIELD)
}

fn courses_slot(root: &Value) -> Option<&Vec<Value>> {
    first_payload(root)?.get(COURSES_FIELD)?.as_array()
}

fn courses_slot_mut(root: &mut Value) -> Option<&mut Vec<Value>> {
    root.get_mut(ACTIONS_FIELD)?
        .as_array_mut()?
        .first_mut()?
        .get_mut(RETURN_VALUE_FIELD)?
        .get_mut(RETURN_VALUE_FIELD)?
        .get_mut(COURSES_FIELD)?
        .as_array_mut()
}

/// Outcome of a rewrite that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// No course list: the body must go out exactly as received.
    Passthrough,
    Rewritten(String),
}

impl Rewrite {
    pub fn into_bytes(self, original: Vec<u8>) -> Vec<u8> {
        match self {
            Rewrite::Passthrough => original,
            Rewrite::Rewritten(text) => text.into_bytes(),
        }
    }
}

/// Apply `transform` to the envelope's course array and re-serialize.
///
/// A missing course path is not an error here and yields
/// [`Rewrite::Passthrough`]; only unparsable input or an encoding failure
/// comes back as `Err`.
pub fn rewrite_courses<F>(text: &str, transform: F) -> Result<Rewrite, EnvelopeError>
where
    F: FnOnce(Vec<Value>) -> Vec<Value>,
{
    let mut view = match EnvelopeView::parse(text) {
        Ok(view) => view,
        Err(EnvelopeError::MissingCourseData) => return Ok(Rewrite::Passthrough),
        Err(err) => return Err(err),
    };

    let courses = view.take_courses();
    view.set_courses(transform(courses));
    view.to_text().map(Rewrite::Rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENVELOPE: &str = r#"{"actions":[{"id":"123;a","state":"SUCCESS","returnValue":{"returnValue":{"totalCount":2,"courses":[{"hed__Course__r":{"CourseCode__c":"CS-E4580"},"hed__Start_Date__c":"2024-09-02"},{"hed__Course__r":{"CourseCode__c":"MS-C1620"},"hed__Start_Date__c":"2024-09-02"}],"facets":{"z":1,"a":2.50}},"cacheable":false}},{"id":"124;a","returnValue":{"returnValue":{"courses":[]}}}],"context":{"mode":"PROD","fwuid":"x1"}}"#;

    #[test]
    fn identity_transform_preserves_structure() {
        let out = rewrite_courses(ENVELOPE, |courses| courses).unwrap();
        let Rewrite::Rewritten(text) = out else {
            panic!("expected a rewrite");
        };
        let before: Value = serde_json::from_str(ENVELOPE).unwrap();
        let after: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn compact_input_round_trips_byte_for_byte() {
        let out = rewrite_courses(ENVELOPE, |courses| courses).unwrap();
        assert_eq!(out, Rewrite::Rewritten(ENVELOPE.to_string()));
    }

    #[test]
    fn only_the_first_action_courses_change() {
        let out = rewrite_courses(ENVELOPE, |mut courses| {
            courses.truncate(1);
            courses
        })
        .unwrap()
        .into_bytes(ENVELOPE.as_bytes().to_vec());
        let out = String::from_utf8(out).unwrap();

        let after: Value = serde_json::from_str(&out).unwrap();
        let payload = &after["actions"][0]["returnValue"]["returnValue"];
        assert_eq!(payload["courses"].as_array().unwrap().len(), 1);
        assert_eq!(payload["totalCount"], json!(2));
        assert_eq!(after["actions"][0]["returnValue"]["cacheable"], json!(false));
        assert_eq!(after["actions"][1]["id"], json!("124;a"));
        assert_eq!(after["context"]["fwuid"], json!("x1"));

        // Sibling key order and number spelling survive.
        assert!(out.contains(r#""facets":{"z":1,"a":2.50}"#));
        assert!(out.starts_with(r#"{"actions":[{"id":"123;a","state":"SUCCESS""#));
    }

    #[test]
    fn envelopes_without_courses_pass_through() {
        let no_courses = r#"{"actions":[{"returnValue":{"returnValue":{"user":"x"}}}]}"#;
        let no_actions = r#"{"context":{}}"#;
        let empty_actions = r#"{"actions":[]}"#;
        let courses_not_array = r#"{"actions":[{"returnValue":{"returnValue":{"courses":null}}}]}"#;

        for text in [no_courses, no_actions, empty_actions, courses_not_array] {
            let out = rewrite_courses(text, |_| panic!("transform must not run")).unwrap();
            assert_eq!(out, Rewrite::Passthrough);
            assert_eq!(out.into_bytes(text.as_bytes().to_vec()), text.as_bytes());
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = rewrite_courses(r#"{"actions":[{"#, |c| c).unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn view_reports_missing_course_data_explicitly() {
        let err = EnvelopeView::parse(r#"{"actions":[{}]}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingCourseData));

        let mut view = EnvelopeView::parse(ENVELOPE).unwrap();
        assert_eq!(view.take_courses().len(), 2);
    }
}
