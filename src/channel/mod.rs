//! Named byte-stream channels.
//!
//! The client owns the channel (it is the "pipe server"); the target process opens it by name
//! when it dequeues the request. [`Transport`] is the seam between the dispatcher and the
//! platform's named channels.
//!
//! [`unix_socket`] exposes UNIX sockets as channels.

use std::{future::Future, io};

use futures::{AsyncRead, AsyncWrite};

#[cfg(test)]
pub(crate) mod memory;
#[cfg(unix)]
pub mod unix_socket;

/// How a channel is opened by the target process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Only the reply is written (V1 requests).
    WriteOnly,
    /// The request is read before the reply is written (V2 requests).
    ReadWrite,
}

/// Opens channels by name.
pub trait Transport: Send + Sync {
    /// Reliable, ordered, bidirectional byte stream.
    ///
    /// Flushing pushes buffered output to the remote end, closing releases the channel.
    type Channel: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens the channel `name`, which has to exist already.
    fn open(&self, name: &str, mode: OpenMode) -> impl Future<Output = io::Result<Self::Channel>>;
}
