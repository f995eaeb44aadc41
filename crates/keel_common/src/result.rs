//! Common result and error types for the Keel toolchain.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates a broken invariant inside the build machinery, not a
/// problem in the user's sources. Source problems are reported through
/// `DiagnosticSink` and the build still returns `Ok`.
pub type KeelResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Keel, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal build error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
