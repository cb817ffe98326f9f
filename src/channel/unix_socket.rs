//! Channels backed by UNIX sockets.
//!
//! The channel name is the path of a socket bound by the client. The target process connects to
//! it when servicing the request.

use std::{io, net::Shutdown, path::Path};

use async_net::unix::UnixStream;

use crate::channel::{OpenMode, Transport};

/// [`Transport`] connecting to UNIX sockets.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnixSocketTransport;

impl Transport for UnixSocketTransport {
    type Channel = UnixStream;

    async fn open(&self, name: &str, mode: OpenMode) -> io::Result<UnixStream> {
        let stream = UnixStream::connect(Path::new(name)).await?;
        if mode == OpenMode::WriteOnly {
            stream.shutdown(Shutdown::Read)?;
        }
        Ok(stream)
    }
}
