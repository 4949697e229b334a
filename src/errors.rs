use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur during queue operations.
///
/// Expected outcomes such as an empty queue or a job that is already gone are
/// not errors, they are reported through `Option` and `bool` return values.
#[derive(Error, Debug)]
pub enum QueueError {
    /// An error occurred while executing an SQL query
    #[error("Error occured while query: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A payload could not be encoded or decoded
    #[error("Error while handling payload: {0}")]
    CodecError(#[from] CodecError),

    /// The delay does not fit in a timestamp
    #[error("Delay of {0:?} is too large to schedule a job")]
    InvalidDelay(std::time::Duration),
}

/// A Result type alias for QueueError.
pub type Result<T> = core::result::Result<T, QueueError>;
