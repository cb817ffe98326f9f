//! Unix attacher which drops an attach file in the target's working directory and sends a `QUIT`
//! signal to the target.
//!
//! Every client uses its own attach file, `.attach_pid<pid>_<nonce>`, holding the name of the
//! channel to connect to. On `QUIT` the target claims all of them: it reads then deletes each
//! file and yields the channel names.

use std::{
    path::Path,
    sync::atomic::{AtomicU32, Ordering},
};

use async_signal::{Signal, Signals};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use nix::{
    sys::signal::{kill, Signal::SIGQUIT},
    unistd::Pid,
};

use crate::{
    attach::{Attacher, AttacherSignal},
    internal::{process_cwd, AutoDropFile},
};

static NONCE: AtomicU32 = AtomicU32::new(0);

/// UNIX attacher.
pub struct UnixAttacher;

impl Attacher for UnixAttacher {
    type Signal = UnixAttacherSignal;

    fn signal(pid: u32, channel: &str) -> Result<Self::Signal, Box<dyn std::error::Error>> {
        Ok(UnixAttacherSignal {
            pid,
            channel: channel.to_owned(),
            file: None,
        })
    }

    fn requests() -> impl Stream<Item = Result<String, Box<dyn std::error::Error>>> {
        // It is important to keep this in the synchronous part in order to ensure the listening
        // process is ready to accept attachment requests even if the stream is not polled.
        //
        // Nevertheless, the error will only be raised if the stream is polled.
        let signals = Signals::new([Signal::Quit]);

        try_stream! {
            let mut signals = signals?;
            let pid = std::process::id();

            while let Some(signal) = signals.next().await {
                if signal? != Signal::Quit {
                    continue;
                }
                let cwd = std::env::current_dir()?;
                for channel in claim_attach_files(&cwd, pid)? {
                    yield channel;
                }
            }
        }
    }
}

/// UNIX attacher signal.
///
/// The first [`send`](AttacherSignal::send) creates the attach file, every send delivers `QUIT`
/// to the target until the file is claimed.
pub struct UnixAttacherSignal {
    pid: u32,
    channel: String,
    file: Option<AutoDropFile>,
}

impl AttacherSignal for UnixAttacherSignal {
    async fn send(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match &self.file {
            None => {
                let nonce = format!(
                    "{}_{}",
                    std::process::id(),
                    NONCE.fetch_add(1, Ordering::Relaxed)
                );
                let path = process_cwd(self.pid)?.join(attach_file_name(self.pid, &nonce));
                self.file = Some(AutoDropFile::create_with(path, self.channel.as_bytes())?);
            }
            Some(file) => {
                if !file.exists()? {
                    // Claimed
                    return Ok(());
                }
            }
        }
        kill(Pid::from_raw(self.pid as _), SIGQUIT)?;
        Ok(())
    }
}

fn attach_file_prefix(pid: u32) -> String {
    format!(".attach_pid{pid}_")
}

fn attach_file_name(pid: u32, nonce: &str) -> String {
    format!("{}{nonce}", attach_file_prefix(pid))
}

/// Reads and deletes the attach files of process `pid` found in `dir`.
fn claim_attach_files(dir: &Path, pid: u32) -> std::io::Result<Vec<String>> {
    let prefix = attach_file_prefix(pid);
    let mut channels = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(&prefix) || file_name.ends_with(".tmp") {
            continue;
        }
        let path = entry.path();
        let channel = match std::fs::read_to_string(&path) {
            Ok(channel) => channel,
            Err(e) => {
                // Most likely claimed by a concurrent signal or abandoned by its client
                log::warn!(target: "attach", "unable to read attach file {}: {e}", path.display());
                continue;
            }
        };
        if let Err(e) = std::fs::remove_file(&path) {
            log::warn!(target: "attach", "unable to remove attach file {}: {e}", path.display());
            continue;
        }
        let channel = channel.trim();
        if channel.is_empty() {
            log::warn!(target: "attach", "empty attach file {}", path.display());
            continue;
        }
        channels.push(channel.to_owned());
    }
    Ok(channels)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{
        pin::pin,
        time::{Duration, Instant},
    };

    use async_io::Timer;
    use futures::{select, FutureExt};

    use super::*;
    use crate::tests::ATTACH_PROCESS_TEST_MUTEX;

    #[test]
    fn test_claim_attach_files() {
        let dir = tempfile::tempdir().unwrap();
        let pid = 4242;
        std::fs::write(dir.path().join(attach_file_name(pid, "a")), "/tmp/chan-a\n").unwrap();
        std::fs::write(dir.path().join(attach_file_name(pid, "b")), "/tmp/chan-b").unwrap();
        std::fs::write(dir.path().join(attach_file_name(pid, "c.tmp")), "/tmp/chan-c").unwrap();
        std::fs::write(dir.path().join(attach_file_name(pid, "d")), "").unwrap();
        std::fs::write(dir.path().join(attach_file_name(pid + 1, "e")), "/tmp/chan-e").unwrap();

        let mut channels = claim_attach_files(dir.path(), pid).unwrap();
        channels.sort();
        assert_eq!(channels, vec!["/tmp/chan-a", "/tmp/chan-b"]);

        // Claimed files are gone, others are left alone
        assert!(claim_attach_files(dir.path(), pid).unwrap().is_empty());
        assert!(dir.path().join(attach_file_name(pid, "c.tmp")).exists());
        assert!(dir.path().join(attach_file_name(pid + 1, "e")).exists());
    }

    #[test]
    fn test_unix_attacher() {
        let _attacher_test = ATTACH_PROCESS_TEST_MUTEX.lock();

        let mut exec = futures::executor::LocalPool::new();

        let res = exec.run_until(async {
            let job = async {
                let mut requests = pin!(UnixAttacher::requests().fuse());

                let mut signal = UnixAttacher::signal(std::process::id(), "/tmp/unix-attacher")?;
                signal.send().await?;
                let channel = requests.next().await.ok_or("No request")??;
                assert_eq!(channel, "/tmp/unix-attacher");

                // Claimed: sending again does nothing
                signal.send().await?;
                let mut full_timer =
                    FutureExt::fuse(Timer::at(Instant::now() + Duration::from_millis(500)));
                select! {
                    res = requests.next() => {
                        panic!("Should not be requested again, got {res:?}");
                    }
                    _ = full_timer => {}
                };
                drop(signal);

                Ok::<_, Box<dyn std::error::Error>>(())
            };

            let timeout = FutureExt::then(Timer::after(Duration::from_secs(5)), async |_| {
                Err("Test timeout".into())
            });

            select! {
                a = job.fuse() => a,
                b = timeout.fuse() => b,
            }
        });

        exec.run();

        res.unwrap();
    }
}
