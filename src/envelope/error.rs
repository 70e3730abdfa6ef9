/// Why an intercepted body could not be rewritten.
///
/// Both variants are recoverable: the caller emits the original body.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("envelope carries no course list")]
    MissingCourseData,

    #[error("failed to re-encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}
