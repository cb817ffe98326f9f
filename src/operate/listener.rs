//! The attach listener thread.
//!
//! [`AttachListener::start`] spawns the consumer thread: it declares the dispatcher ready, then
//! serves dequeued operations with a [`CommandRegistry`] until the listener is shut down.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

#[cfg(unix)]
use crate::attach::{
    trigger::{spawn_trigger, Trigger},
    Attacher,
};
use crate::{channel::Transport, dispatcher::Dispatcher, operate::registry::CommandRegistry};

/// Running attach listener.
///
/// Dropping it shuts it down, see [`shutdown`](Self::shutdown).
pub struct AttachListener<T>
where
    T: Transport + 'static,
{
    dispatcher: Arc<Dispatcher<T>>,
    consumer: Option<JoinHandle<()>>,
    #[cfg(unix)]
    trigger: Option<Trigger>,
}

impl<T> AttachListener<T>
where
    T: Transport + 'static,
{
    /// Starts the consumer thread of `dispatcher`.
    pub fn start(dispatcher: Arc<Dispatcher<T>>, registry: CommandRegistry) -> io::Result<Self> {
        let consumer = thread::Builder::new()
            .name(dispatcher.config().thread_name.clone())
            .spawn({
                let dispatcher = dispatcher.clone();
                move || {
                    // Producers must not be accepted once this thread is gone
                    let _shutdown = ShutdownOnExit(&dispatcher);
                    dispatcher.mark_ready();
                    log::debug!(target: "attach", "attach listener is ready");
                    while let Some(op) = dispatcher.dequeue() {
                        registry.serve(op);
                    }
                    log::debug!(target: "attach", "attach listener stopped");
                }
            })?;

        Ok(Self {
            dispatcher,
            consumer: Some(consumer),
            #[cfg(unix)]
            trigger: None,
        })
    }

    /// Also listens for out-of-band attach signals with `A`, each of them enqueuing a V2 request.
    #[cfg(unix)]
    pub fn with_trigger<A>(mut self) -> io::Result<Self>
    where
        A: Attacher + 'static,
    {
        self.trigger = Some(spawn_trigger::<A, T>(self.dispatcher.clone())?);
        Ok(self)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<T>> {
        &self.dispatcher
    }

    /// Stops accepting requests, serves the pending ones and waits for the listener threads.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        #[cfg(unix)]
        if let Some(trigger) = self.trigger.take() {
            trigger.stop();
        }
        self.dispatcher.shutdown();
        if let Some(consumer) = self.consumer.take() {
            if consumer.join().is_err() {
                log::error!(target: "attach", "attach listener thread panicked");
            }
        }
    }
}

struct ShutdownOnExit<'a, T: Transport>(&'a Dispatcher<T>);

impl<T: Transport> Drop for ShutdownOnExit<'_, T> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

impl<T> Drop for AttachListener<T>
where
    T: Transport + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
