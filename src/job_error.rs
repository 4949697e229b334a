use std::borrow::Cow;
use std::fmt;

use crate::codec::CodecError;

/// An error a job can fail with.
///
/// The failure sink stores it as `{kind}: {message} (#{code})`.
pub trait JobError: Send + Sync {
    fn kind(&self) -> Cow<'_, str>;

    fn message(&self) -> Cow<'_, str>;

    fn code(&self) -> i64;
}

/// Formats an error the way it is stored in the `failures` table.
pub fn format_job_error(error: Option<&dyn JobError>) -> Option<String> {
    error.map(|e| format!("{}: {} (#{})", e.kind(), e.message(), e.code()))
}

/// A ready-made [`JobError`] for handlers that have no error type of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    kind: String,
    message: String,
    code: i64,
}

impl FailureReason {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, code: i64) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code,
        }
    }

    /// Wraps any std error, using its type name as the kind.
    pub fn from_error<E: std::error::Error>(error: &E, code: i64) -> Self {
        let type_name = std::any::type_name::<E>();
        let kind = type_name.rsplit("::").next().unwrap_or(type_name);
        Self::new(kind, error.to_string(), code)
    }
}

impl JobError for FailureReason {
    fn kind(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.kind)
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn code(&self) -> i64 {
        self.code
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (#{})", self.kind, self.message, self.code)
    }
}

impl std::error::Error for FailureReason {}

impl From<CodecError> for FailureReason {
    fn from(value: CodecError) -> Self {
        let kind = match value {
            CodecError::Encode(_) => "EncodeError",
            CodecError::Decode(_) => "DecodeError",
        };
        Self::new(kind, value.to_string(), 0)
    }
}
