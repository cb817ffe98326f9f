//! In-memory channels for tests, built on `sluice` pipes.

use std::{
    collections::HashMap,
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};

use futures::{AsyncRead, AsyncWrite};
use sluice::pipe::{pipe, PipeReader, PipeWriter};

use crate::channel::{OpenMode, Transport};

#[derive(Default, Debug)]
pub(crate) struct ChannelStats {
    pub(crate) opened_read_write: AtomicUsize,
    pub(crate) opened_write_only: AtomicUsize,
    pub(crate) flushes: AtomicUsize,
    pub(crate) closes: AtomicUsize,
}

impl ChannelStats {
    pub(crate) fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ServerEnds {
    request: PipeReader,
    reply: PipeWriter,
    stats: Arc<ChannelStats>,
}

/// The client side of a listening in-memory channel.
pub(crate) struct ClientEnd {
    pub(crate) request: PipeWriter,
    pub(crate) reply: PipeReader,
    pub(crate) stats: Arc<ChannelStats>,
}

/// Named in-memory channels, each one can be opened once.
#[derive(Default)]
pub(crate) struct MemoryTransport {
    endpoints: Mutex<HashMap<String, ServerEnds>>,
}

impl MemoryTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes `name` available to [`open`](Transport::open).
    pub(crate) fn listen(&self, name: &str) -> ClientEnd {
        let (request_reader, request_writer) = pipe();
        let (reply_reader, reply_writer) = pipe();
        let stats = Arc::new(ChannelStats::default());
        self.endpoints.lock().unwrap().insert(
            name.to_owned(),
            ServerEnds {
                request: request_reader,
                reply: reply_writer,
                stats: stats.clone(),
            },
        );
        ClientEnd {
            request: request_writer,
            reply: reply_reader,
            stats,
        }
    }
}

impl Transport for MemoryTransport {
    type Channel = MemoryChannel;

    async fn open(&self, name: &str, mode: OpenMode) -> io::Result<MemoryChannel> {
        let ends = self
            .endpoints
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no channel {name}")))?;
        let request = match mode {
            OpenMode::WriteOnly => {
                ends.stats.opened_write_only.fetch_add(1, Ordering::SeqCst);
                None
            }
            OpenMode::ReadWrite => {
                ends.stats.opened_read_write.fetch_add(1, Ordering::SeqCst);
                Some(ends.request)
            }
        };
        Ok(MemoryChannel {
            request,
            reply: ends.reply,
            stats: ends.stats,
        })
    }
}

#[derive(Debug)]
pub(crate) struct MemoryChannel {
    request: Option<PipeReader>,
    reply: PipeWriter,
    stats: Arc<ChannelStats>,
}

impl AsyncRead for MemoryChannel {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        match self.request.as_mut() {
            Some(request) => Pin::new(request).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "channel opened write-only",
            ))),
        }
    }
}

impl AsyncWrite for MemoryChannel {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.reply).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let res = Pin::new(&mut self.reply).poll_flush(cx);
        if res.is_ready() {
            self.stats.flushes.fetch_add(1, Ordering::SeqCst);
        }
        res
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let res = Pin::new(&mut self.reply).poll_close(cx);
        if res.is_ready() {
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
        res
    }
}
