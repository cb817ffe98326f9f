//! Error types.
//!
//! [`EnqueueError`] is what a producer gets back from the dispatcher; its numeric
//! [code](EnqueueError::code) is the value returned to the native stub which called
//! [`enqueue_raw`](crate::dispatcher::Dispatcher::enqueue_raw).
//!
//! [`ProtocolError`] covers decoding and encoding on a channel. It never reaches a producer.

use thiserror::Error;

/// Errors returned to a producer by [`Dispatcher::enqueue`](crate::dispatcher::Dispatcher::enqueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The listener is not ready yet (or has been shut down).
    #[error("attach listener is disabled")]
    Disabled,
    /// All request slots are in use.
    #[error("too many pending attach operations")]
    ResourceExhausted,
    /// A command, argument or channel name is malformed.
    #[error("illegal attach argument")]
    IllegalArgument,
    /// A synchronization primitive failed.
    #[error("internal attach error")]
    Internal,
}

impl EnqueueError {
    /// Numeric code exchanged with the producer stub.
    pub const fn code(self) -> i32 {
        match self {
            EnqueueError::Disabled => 100,
            EnqueueError::ResourceExhausted => 101,
            EnqueueError::IllegalArgument => 102,
            EnqueueError::Internal => 103,
        }
    }

    /// Reverse of [`code`](Self::code). `0` and unknown codes give `None`.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            100 => Some(EnqueueError::Disabled),
            101 => Some(EnqueueError::ResourceExhausted),
            102 => Some(EnqueueError::IllegalArgument),
            103 => Some(EnqueueError::Internal),
            _ => None,
        }
    }
}

/// Errors raised while reading a request from, or writing a reply to, a channel.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("channel i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported protocol version {0:?}")]
    UnsupportedVersion(String),
    #[error("field exceeds {max} bytes")]
    TooLong { max: usize },
    #[error("more than {max} arguments")]
    TooManyArgs { max: usize },
    #[error("request ended prematurely")]
    Truncated,
    #[error("field is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid request size {0:?}")]
    InvalidSize(String),
    #[error("invalid reply: {0}")]
    InvalidReply(String),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for err in [
            EnqueueError::Disabled,
            EnqueueError::ResourceExhausted,
            EnqueueError::IllegalArgument,
            EnqueueError::Internal,
        ] {
            assert_eq!(EnqueueError::from_code(err.code()), Some(err));
        }
        assert_eq!(EnqueueError::Disabled.code(), 100);
        assert_eq!(EnqueueError::Internal.code(), 103);
        assert_eq!(EnqueueError::from_code(0), None);
    }
}
