use confluence_core::{Time, TimeSetError};
use thiserror::Error;

/// Errors that can occur when filling or querying a buffer.
///
/// A failed insertion leaves the buffer unmodified.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BufferError {
    #[error("cannot add a time {} to a buffer of {}s", kind_name(.is_span), other_kind_name(.is_span))]
    MixedTimeKinds { is_span: bool },

    #[error("time stamp {stamp} does not follow the last buffered stamp {last}")]
    OutOfOrder { stamp: f64, last: f64 },

    #[error("time span starting at {start} overlaps the last buffered span ending at {last_end}")]
    Overlap { start: f64, last_end: f64 },

    #[error("expected {expected} values per time, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("index {index} is out of range for a buffer of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("buffer is empty")]
    Empty,

    #[error("extrapolation to {requested} is not permitted, buffer covers [{first}, {last}]")]
    ExtrapolationNotPermitted {
        requested: Time,
        first: f64,
        last: f64,
    },
}

fn kind_name(is_span: &bool) -> &'static str {
    if *is_span { "span" } else { "stamp" }
}

fn other_kind_name(is_span: &bool) -> &'static str {
    kind_name(&!*is_span)
}

impl From<TimeSetError> for BufferError {
    fn from(err: TimeSetError) -> Self {
        match err {
            TimeSetError::MixedTimeKinds { is_span } => BufferError::MixedTimeKinds { is_span },
            TimeSetError::OutOfOrder { stamp, last } => BufferError::OutOfOrder { stamp, last },
            TimeSetError::Overlap { start, last_end } => BufferError::Overlap { start, last_end },
        }
    }
}
