//! A background thread that runs a task on a fixed interval until stopped.
//!
//! Used for the periodic spec sync and the periodic exposure flush.
use std::{
    sync::mpsc::{RecvTimeoutError, SyncSender, TrySendError},
    time::Duration,
};

use rand::{thread_rng, Rng};

use crate::{Error, Result};

/// Configuration for [`PollerThread`].
#[derive(Debug, Clone)]
pub(crate) struct PollerThreadConfig {
    /// Thread name, visible in debuggers and panic messages.
    pub name: String,
    /// Interval to wait between task runs.
    pub interval: Duration,
    /// Randomized duration subtracted from each interval.
    pub jitter: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the task now instead of waiting for the interval to elapse.
    Wake,
    Stop,
}

/// A periodic background task.
///
/// The task runs on its own thread after every `interval` (and whenever [`PollerThread::wake`] is
/// called) until [`PollerThread::stop`] is called. The stop command is observed between runs, so
/// an in-flight run always completes.
pub(crate) struct PollerThread {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send commands to the poller thread.
    command_sender: SyncSender<Command>,
}

impl PollerThread {
    /// Spawn a thread that calls `task` every `config.interval`.
    ///
    /// The first run happens after the first interval elapses, not immediately.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the thread failed to start.
    pub fn start(
        config: PollerThreadConfig,
        mut task: impl FnMut() + Send + 'static,
    ) -> std::io::Result<PollerThread> {
        // Buffer size of 1 is enough: a pending Wake already guarantees a run, and a pending Stop
        // will be observed at the next iteration. A second Stop after a pending Wake is handled by
        // the disconnect when the sender is dropped in `shutdown()`.
        let (command_sender, command_receiver) = std::sync::mpsc::sync_channel::<Command>(1);

        let thread_name = config.name.clone();
        let join_handle = std::thread::Builder::new()
            .name(config.name)
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| loop {
                    let timeout = jitter(config.interval, config.jitter);
                    match command_receiver.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) | Ok(Command::Wake) => {
                            task();
                        }
                        Ok(Command::Stop) => {
                            log::debug!(target: "featuregate", thread = thread_name.as_str(); "poller thread received stop command");
                            return;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            // When the other end of channel disconnects, calls to
                            // .recv_timeout() return immediately. Stop the thread.
                            log::debug!(target: "featuregate", thread = thread_name.as_str(); "poller thread disconnected");
                            return;
                        }
                    }
                }));

                if result.is_err() {
                    log::error!(target: "featuregate", thread = thread_name.as_str(); "poller thread panicked");
                }
            })?;

        Ok(PollerThread {
            join_handle,
            command_sender,
        })
    }

    /// Ask the thread to run the task as soon as possible. Never blocks.
    pub fn wake(&self) {
        // Full buffer means a command is already pending, which is either a Wake that will run the
        // task or a Stop that makes running it moot.
        let _ = self.command_sender.try_send(Command::Wake);
    }

    /// Stop the poller thread.
    ///
    /// This function does not wait for the thread to actually stop.
    pub fn stop(&self) {
        match self.command_sender.try_send(Command::Stop) {
            // Receiver dropped means the thread already exited.
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            // A Wake is pending. The thread will pick up the disconnect once `shutdown()` drops
            // the sender.
            Err(TrySendError::Full(_)) => {}
        }
    }

    /// Stop the poller thread and block waiting for it to exit.
    ///
    /// If the thread is in the middle of a task run, waits for the run to finish.
    pub fn shutdown(self) -> Result<()> {
        // Send stop signal in case it wasn't sent before.
        self.stop();
        drop(self.command_sender);

        self.join_handle
            .join()
            .map_err(|_| Error::PollerThreadPanicked)?;

        Ok(())
    }
}

/// Apply randomized `jitter` to `interval`.
fn jitter(interval: Duration, jitter: Duration) -> Duration {
    Duration::saturating_sub(interval, thread_rng().gen_range(Duration::ZERO..=jitter))
}
