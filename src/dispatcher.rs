//! The attach request dispatcher.
//!
//! Producers, which may run on tiny native threads started by a client, call
//! [`enqueue`](Dispatcher::enqueue): it validates the request, copies it into a preallocated slot
//! and wakes the consumer, without ever allocating or waiting for pool capacity.
//!
//! The single consumer thread calls [`dequeue`](Dispatcher::dequeue) in a loop. It blocks until a
//! request is pending, opens the request's channel and turns it into an [`Operation`]. Requests
//! whose channel cannot be opened or read are logged and dropped, the consumer then waits for the
//! next one.

use std::{
    future::Future,
    pin::pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    thread,
    time::Duration,
};

use async_io::Timer;
use futures::future::{self, Either};

use crate::{
    channel::{OpenMode, Transport},
    config::ListenerConfig,
    error::EnqueueError,
    operation::Operation,
    protocol::read_request,
    request::{ApiVersion, SlotArena},
    sync::Semaphore,
    ARG_COUNT_MAX, ARG_LENGTH_MAX, CHANNEL_NAME_MAX, MAX_ENQUEUED_OPERATIONS, NAME_LENGTH_MAX,
};

/// The most recent protocol version served. Older versions are accepted as well.
pub const SUPPORTED_VERSION: ApiVersion = ApiVersion::V2;

/// Occupancy of the request slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Slots available to producers.
    pub free: usize,
    /// Requests waiting for the consumer.
    pub queued: usize,
}

/// What the consumer needs from a slot once it is back in the pool.
enum PendingRequest {
    V1 {
        name: String,
        args: Vec<String>,
        channel: String,
    },
    V2 {
        channel: String,
    },
    Unsupported {
        version: u32,
        name: String,
    },
}

/// Owner of the request slots and of the synchronization between producers and the consumer.
///
/// There is one dispatcher per process, shared by reference (usually an `Arc`) between the
/// producer call sites and the consumer thread.
pub struct Dispatcher<T> {
    transport: T,
    config: ListenerConfig,
    // Protects the free pool and the pending queue as one unit
    requests: Mutex<SlotArena>,
    // Count of pending requests
    enqueued: Semaphore,
    ready: AtomicBool,
    // Set once by shutdown, under the requests lock
    closed: AtomicBool,
}

impl<T> Dispatcher<T>
where
    T: Transport,
{
    /// Creates the dispatcher with all its slots preallocated.
    ///
    /// Producers get [`EnqueueError::Disabled`] until [`mark_ready`](Self::mark_ready) is called.
    pub fn new(transport: T, config: ListenerConfig) -> Self {
        Self {
            transport,
            config,
            requests: Mutex::new(SlotArena::new()),
            enqueued: Semaphore::new(0, MAX_ENQUEUED_OPERATIONS),
            ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// See [`SUPPORTED_VERSION`].
    pub fn supported_version(&self) -> ApiVersion {
        SUPPORTED_VERSION
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Declares the consumer ready: producers stop waiting.
    ///
    /// Does nothing after [`shutdown`](Self::shutdown).
    pub fn mark_ready(&self) {
        let _requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.closed.load(Ordering::Acquire) {
            self.ready.store(true, Ordering::Release);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Refuses new requests and lets [`dequeue`](Self::dequeue) return `None` once the pending
    /// ones are served.
    ///
    /// A producer racing with the shutdown either has its request queued before the semaphore
    /// closes, and served, or gets [`EnqueueError::Disabled`].
    pub fn shutdown(&self) {
        {
            let _requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
            self.ready.store(false, Ordering::Release);
        }
        self.enqueued.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Submits a request.
    ///
    /// For [`ApiVersion::V2`] the command and the arguments are ignored and should be empty: they
    /// are read from the channel later on.
    pub fn enqueue(
        &self,
        version: ApiVersion,
        name: &str,
        args: &[&str; ARG_COUNT_MAX],
        channel: &str,
    ) -> Result<(), EnqueueError> {
        self.enqueue_version(version.as_u32(), name, args, channel)
    }

    /// Producer entry point taking a raw version and returning the numeric error code, `0` on
    /// success.
    pub fn enqueue_raw(
        &self,
        version: u32,
        name: &str,
        arg0: &str,
        arg1: &str,
        arg2: &str,
        channel: &str,
    ) -> i32 {
        match self.enqueue_version(version, name, &[arg0, arg1, arg2], channel) {
            Ok(()) => 0,
            Err(e) => e.code(),
        }
    }

    // No allocation on this path.
    fn enqueue_version(
        &self,
        version: u32,
        name: &str,
        args: &[&str; ARG_COUNT_MAX],
        channel: &str,
    ) -> Result<(), EnqueueError> {
        self.wait_ready()?;

        if name.len() > NAME_LENGTH_MAX
            || args.iter().any(|arg| arg.len() > ARG_LENGTH_MAX)
            || channel.len() > CHANNEL_NAME_MAX
            || !channel.starts_with(self.config.channel_prefix.as_str())
        {
            return Err(EnqueueError::IllegalArgument);
        }

        let mut requests = self.requests.lock().map_err(|_| EnqueueError::Internal)?;
        // Shut down since the readiness wait
        if !self.is_ready() {
            return Err(EnqueueError::Disabled);
        }

        let index = requests
            .pop_free()
            .ok_or(EnqueueError::ResourceExhausted)?;
        if self.enqueued.release().is_err() {
            // The count can only exceed the pool capacity if the bookkeeping is broken
            requests.push_free(index);
            return Err(EnqueueError::Internal);
        }
        requests
            .slot_mut(index)
            .populate(version, name, args, channel);
        requests.push_back(index);

        Ok(())
    }

    fn wait_ready(&self) -> Result<(), EnqueueError> {
        let mut attempts = 0;
        while !self.is_ready() {
            if attempts == self.config.readiness_attempts {
                return Err(EnqueueError::Disabled);
            }
            thread::sleep(self.config.readiness_poll_interval());
            attempts += 1;
        }
        Ok(())
    }

    /// Waits for the next request and returns it as an operation.
    ///
    /// Requests which cannot be served are dropped and the wait goes on, so this only returns
    /// `None` after [`shutdown`](Self::shutdown), once the queue is empty.
    pub fn dequeue(&self) -> Option<Operation<T::Channel>> {
        loop {
            if !self.enqueued.acquire() {
                return None;
            }

            let Some(request) = self.take_pending() else {
                log::error!(target: "attach", "semaphore signaled with an empty queue");
                continue;
            };

            if let Some(op) = async_io::block_on(self.open_operation(request)) {
                log::debug!(target: "attach", "dequeue, return op: {}", op.name());
                return Some(op);
            }
        }
    }

    /// Pops the head of the queue and gives its slot back to the pool.
    fn take_pending(&self) -> Option<PendingRequest> {
        // The arena is only mutated through panic-free O(1) operations.
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let index = requests.pop_front()?;

        let slot = requests.slot(index);
        log::debug!(
            target: "attach",
            "dequeue, got request, ver = {}, cmd = {}",
            slot.version(),
            slot.name()
        );
        let request = match ApiVersion::try_from(slot.version()) {
            Ok(ApiVersion::V1) => PendingRequest::V1 {
                name: slot.name().to_owned(),
                args: (0..ARG_COUNT_MAX)
                    .map(|i| slot.arg(i).to_owned())
                    .collect(),
                channel: slot.channel().to_owned(),
            },
            Ok(ApiVersion::V2) => PendingRequest::V2 {
                channel: slot.channel().to_owned(),
            },
            Err(version) => PendingRequest::Unsupported {
                version,
                name: slot.name().to_owned(),
            },
        };

        requests.push_free(index);
        Some(request)
    }

    async fn open_operation(&self, request: PendingRequest) -> Option<Operation<T::Channel>> {
        match request {
            PendingRequest::V1 {
                name,
                args,
                channel,
            } => {
                let pipe = self.open_channel(&channel, OpenMode::WriteOnly).await?;
                Some(Operation::new(name, args, pipe))
            }
            PendingRequest::V2 { channel } => {
                let mut pipe = self.open_channel(&channel, OpenMode::ReadWrite).await?;
                let timeout = self.config.request_read_timeout();
                let read = with_timeout(read_request(&mut pipe), timeout).await;
                match read {
                    Some(Ok(request)) if request.version == ApiVersion::V2 => {
                        Some(Operation::new(request.name, request.args, pipe))
                    }
                    Some(Ok(request)) => {
                        log::error!(
                            target: "attach",
                            "expected a V2 request from {channel}, got V{}",
                            request.version.as_u32()
                        );
                        None
                    }
                    Some(Err(e)) => {
                        log::error!(target: "attach", "unable to read request from {channel}: {e}");
                        None
                    }
                    None => {
                        log::error!(
                            target: "attach",
                            "no request received from {channel} within {timeout:?}"
                        );
                        None
                    }
                }
            }
            PendingRequest::Unsupported { version, name } => {
                log::error!(target: "attach", "dequeue, unsupported version: {version} ({name})");
                None
            }
        }
    }

    async fn open_channel(&self, name: &str, mode: OpenMode) -> Option<T::Channel> {
        match self.transport.open(name, mode).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                let mode = match mode {
                    OpenMode::WriteOnly => "write-only",
                    OpenMode::ReadWrite => "read-write",
                };
                log::error!(target: "attach", "could not open {mode} channel {name}: {e}");
                None
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        DispatcherStats {
            free: requests.free_len(),
            queued: requests.queued_len(),
        }
    }
}

/// Runs `future`, giving up after `timeout`.
async fn with_timeout<F>(future: F, timeout: Duration) -> Option<F::Output>
where
    F: Future,
{
    match future::select(pin!(future), Timer::after(timeout)).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
