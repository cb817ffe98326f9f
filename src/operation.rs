//! In-flight attach operations.

use futures::{AsyncWrite, AsyncWriteExt};

use crate::protocol::write_reply;

/// One dequeued request, bound to the open channel its reply goes to.
///
/// An operation is created by [`Dispatcher::dequeue`](crate::dispatcher::Dispatcher::dequeue) and
/// consumed by [`complete`](Self::complete). Dropping it without completing closes the channel
/// without a reply.
#[derive(Debug)]
pub struct Operation<C> {
    name: String,
    args: Vec<String>,
    channel: C,
}

impl<C> Operation<C>
where
    C: AsyncWrite + Unpin,
{
    pub(crate) fn new(name: String, args: Vec<String>, channel: C) -> Self {
        Self {
            name,
            args,
            channel,
        }
    }

    /// The command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All the arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Argument `i`, or empty text if the request did not carry it.
    pub fn arg(&self, i: usize) -> &str {
        self.args.get(i).map(String::as_str).unwrap_or_default()
    }

    /// Sends the result code and the output, then releases the channel.
    ///
    /// This blocks until the client has accepted the reply. Failures are logged, there is nobody
    /// left to report them to.
    pub fn complete(self, result: i32, output: &str) {
        async_io::block_on(self.complete_async(result, output))
    }

    /// Asynchronous flavour of [`complete`](Self::complete).
    pub async fn complete_async(mut self, result: i32, output: &str) {
        let written = async {
            write_reply(&mut self.channel, result, output).await?;
            self.channel.flush().await?;
            Ok::<_, crate::error::ProtocolError>(())
        }
        .await;
        if let Err(e) = written {
            log::error!(target: "attach", "unable to write reply of {}: {e}", self.name);
        }
        if let Err(e) = self.channel.close().await {
            log::error!(target: "attach", "unable to close channel of {}: {e}", self.name);
        }
    }
}
