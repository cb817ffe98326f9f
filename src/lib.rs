//! Attach listener: lets a client submit a diagnostic operation to a running process and read
//! the result back, without any long-lived channel between the two.
//!
//! The design follows the Java [Attach
//! API](https://docs.oracle.com/javase/8/docs/technotes/guides/attach/index.html):
//!
//! * the client prepares a named channel it owns (the "pipe server" side)
//! * it signals the target process out-of-band; a short-lived producer thread inside the target
//!   calls [`Dispatcher::enqueue`](dispatcher::Dispatcher::enqueue) with the channel name
//! * a dedicated consumer thread blocked in
//!   [`Dispatcher::dequeue`](dispatcher::Dispatcher::dequeue) wakes up, opens the channel and
//!   materializes an [`Operation`](operation::Operation)
//! * the execution layer runs the command and calls
//!   [`Operation::complete`](operation::Operation::complete), which writes the reply
//!
//! ## Bounded memory
//!
//! Requests are stored in a fixed pool of [`MAX_ENQUEUED_OPERATIONS`] preallocated slots. The
//! producer side never allocates and never blocks on pool capacity: a saturated pool is reported
//! immediately as [`EnqueueError::ResourceExhausted`](error::EnqueueError::ResourceExhausted).
//!
//! ## Protocol versions
//!
//! * V1: command and arguments are passed inline to `enqueue`, the channel is only used for the
//!   reply.
//! * V2: only the channel name is passed to `enqueue`; command and arguments are read from the
//!   channel once the request is dequeued (see [`protocol`]).
//!
//! ## Example
//!
//! See the `server` and `client` demos in the Git repository.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod attach;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod operate;
pub mod operation;
pub mod protocol;
pub mod request;

#[cfg(unix)]
mod internal;
mod sync;

/// Maximum length in bytes of a command name.
pub const NAME_LENGTH_MAX: usize = 16;

/// Maximum length in bytes of an inline argument.
pub const ARG_LENGTH_MAX: usize = 1024;

/// Number of arguments carried inline by a request.
pub const ARG_COUNT_MAX: usize = 3;

/// Maximum length in bytes of a channel name.
pub const CHANNEL_NAME_MAX: usize = 256;

/// Number of preallocated request slots, hence the maximum number of pending requests.
pub const MAX_ENQUEUED_OPERATIONS: usize = 4;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    // The tests sending signals to the test process need to run separately
    pub(crate) static ATTACH_PROCESS_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
}
