//! Target side of the attach mechanism.
//!
//! The trigger thread listens for attach signals. Each request it receives is handed to a fresh
//! producer thread with a small stack, which only calls
//! [`Dispatcher::enqueue`](crate::dispatcher::Dispatcher::enqueue) and exits.

use std::{
    io,
    pin::pin,
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use futures::{channel::oneshot, FutureExt, StreamExt};

use crate::{
    attach::Attacher, channel::Transport, dispatcher::Dispatcher, request::ApiVersion,
};

/// Stack size of producer threads.
pub const PRODUCER_STACK_SIZE: usize = 64 * 1024;

/// Handle on a running trigger thread.
pub struct Trigger {
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Trigger {
    /// Stops listening for attach signals and waits for the trigger thread.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!(target: "attach", "attach trigger thread panicked");
            }
        }
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Spawns the thread listening for attach signals with `A`.
///
/// When this returns, the signal handler is installed.
pub fn spawn_trigger<A, T>(dispatcher: Arc<Dispatcher<T>>) -> io::Result<Trigger>
where
    A: Attacher + 'static,
    T: Transport + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    let thread = thread::Builder::new()
        .name("Attach Trigger".to_owned())
        .spawn(move || {
            async_io::block_on(async move {
                let mut requests = pin!(A::requests().fuse());
                let _ = started_tx.send(());
                let mut stop = stop_rx.fuse();
                loop {
                    futures::select! {
                        request = requests.next() => match request {
                            Some(Ok(channel)) => spawn_producer(&dispatcher, channel),
                            Some(Err(e)) => {
                                log::error!(target: "attach", "attach signal error: {e}");
                            }
                            None => break,
                        },
                        _ = stop => break,
                    }
                }
                log::debug!(target: "attach", "attach trigger stopped");
            })
        })?;

    if started_rx.recv().is_err() {
        // The thread died before installing the handler
        return match thread.join() {
            Ok(()) => Err(io::Error::other("attach trigger exited early")),
            Err(_) => Err(io::Error::other("attach trigger panicked")),
        };
    }

    Ok(Trigger {
        stop: Some(stop_tx),
        thread: Some(thread),
    })
}

fn spawn_producer<T>(dispatcher: &Arc<Dispatcher<T>>, channel: String)
where
    T: Transport + 'static,
{
    let dispatcher = dispatcher.clone();
    let spawned = thread::Builder::new()
        .name("Attach Producer".to_owned())
        .stack_size(PRODUCER_STACK_SIZE)
        .spawn(move || {
            if let Err(e) = dispatcher.enqueue(ApiVersion::V2, "", &["", "", ""], &channel) {
                log::warn!(target: "attach", "attach request on {channel} refused: {e}");
            }
        });
    if let Err(e) = spawned {
        log::error!(target: "attach", "unable to start attach producer thread: {e}");
    }
}
