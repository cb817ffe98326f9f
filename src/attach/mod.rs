//! Sub-module where the out-of-band attach mechanism is located.
//!
//! An [`Attacher`] carries a channel name from a client to the target process. On the target
//! side, [`trigger`] turns every received channel name into a producer call to
//! [`Dispatcher::enqueue`](crate::dispatcher::Dispatcher::enqueue). On the client side,
//! [`client`] prepares the channel, signals the target and exchanges the request and the reply.

use std::future::Future;

use futures::Stream;

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub mod trigger;
#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::UnixAttacher as DefaultAttacher;

/// Attacher abstraction.
pub trait Attacher {
    /// The type of signal returned by [signal](`Attacher::signal`).
    type Signal: AttacherSignal;

    /// Returns a signal asking process `pid` to serve a request on `channel`.
    fn signal(pid: u32, channel: &str) -> Result<Self::Signal, Box<dyn std::error::Error>>;

    /// Starts listening for attach signals in the current process and yields the channel name of
    /// each request.
    ///
    /// Listening starts when this function returns, before the stream is polled.
    fn requests() -> impl Stream<Item = Result<String, Box<dyn std::error::Error>>>;
}

/// Attachment signal abstraction.
pub trait AttacherSignal {
    /// Sends the signal asynchronously. It is a no-op once the target has taken the request.
    fn send(&mut self) -> impl Future<Output = Result<(), Box<dyn std::error::Error>>>;
}
