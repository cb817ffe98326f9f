//! Client side of the attach mechanism.
//!
//! [`execute`] is the function to call in the client to run a command in a target process.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use async_io::Timer;
use async_net::unix::UnixListener;
use futures::FutureExt;

use crate::{
    attach::{Attacher, AttacherSignal},
    config::ListenerConfig,
    internal::AutoDropFile,
    protocol::{read_reply, write_request, Reply},
    request::ApiVersion,
    CHANNEL_NAME_MAX,
};

const CONNECT_ATTEMPTS: u32 = 100;

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

static CHANNEL_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Runs `command` in process `pid` and returns its reply.
///
/// `config` has to agree with the target's configuration on the channel prefix.
pub async fn execute<A>(
    pid: u32,
    config: &ListenerConfig,
    command: &str,
    args: &[&str],
) -> Result<Reply, Box<dyn std::error::Error>>
where
    A: Attacher,
{
    let channel = format!(
        "{}{pid}_{}_{}",
        config.channel_prefix,
        std::process::id(),
        CHANNEL_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    if channel.len() > CHANNEL_NAME_MAX {
        return Err(format!("Channel name {channel} exceeds {CHANNEL_NAME_MAX} bytes").into());
    }

    let listener = UnixListener::bind(&channel)?;
    let _socket_file = AutoDropFile::adopt(PathBuf::from(&channel));

    let mut signal = A::signal(pid, &channel)?;
    signal.send().await?;

    let mut attempts = 1;

    let mut stream = loop {
        let accepted = futures::select! {
            conn = listener.accept().fuse() => Some(conn?),
            _ = Timer::after(CONNECT_RETRY_DELAY).fuse() => None,
        };
        if let Some((stream, _addr)) = accepted {
            break stream;
        }

        if attempts >= CONNECT_ATTEMPTS {
            return Err(format!(
                "Unable to attach to process {pid} through {channel}: target process doesn't respond"
            )
            .into());
        }

        signal.send().await?;

        attempts += 1;
    };

    write_request(&mut stream, ApiVersion::V2, command, args).await?;
    Ok(read_reply(&mut stream).await?)
}
