use std::io;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{trace, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("unexpected output from `{program}`: {output:?}")]
    InvalidOutput { program: String, output: String },
}

impl CommandError {
    /// `pgrep` and `xdotool search` both exit with status 1 when nothing
    /// matched, which is an answer rather than a malfunction.
    pub fn is_no_match(&self) -> bool {
        matches!(self, CommandError::Failed { status, .. } if status.code() == Some(1))
    }
}

/// Runs an external program and returns its trimmed stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CommandError>;
}

/// Runs commands as child processes, killing any that outlive `timeout`.
#[derive(Debug, Clone)]
pub struct Shell {
    timeout: Duration,
}

impl Default for Shell {
    fn default() -> Self { Self::new(DEFAULT_TIMEOUT) }
}

impl Shell {
    pub fn new(timeout: Duration) -> Self { Self { timeout } }

    pub fn timeout(&self) -> Duration { self.timeout }
}

impl CommandRunner for Shell {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CommandError> {
        trace!(program, ?args, "running command");

        let (child_tx, rx) = spawn_waiter(program)?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let pid = Pid::from_raw(child.id() as i32);
        if let Err(SendError(mut child)) = child_tx.send(child) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Wait {
                program: program.to_string(),
                source: io::Error::other("waiter thread exited before the command started"),
            });
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(Ok(output)) => Err(CommandError::Failed {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Ok(Err(source)) => Err(CommandError::Wait {
                program: program.to_string(),
                source,
            }),
            Err(RecvTimeoutError::Timeout) => {
                if let Err(e) = kill(pid, Signal::SIGKILL) {
                    warn!(program, %pid, "failed to kill timed out command: {e}");
                }
                Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CommandError::Wait {
                program: program.to_string(),
                source: io::Error::other("waiter thread exited without reporting"),
            }),
        }
    }
}

/// Starts the thread that reaps a child before the child exists, so a child
/// is never left without a waiter.
fn spawn_waiter(
    program: &str,
) -> Result<(Sender<Child>, Receiver<io::Result<Output>>), CommandError> {
    let (child_tx, child_rx) = crossbeam_channel::bounded::<Child>(1);
    let (tx, rx) = crossbeam_channel::bounded::<io::Result<Output>>(1);
    thread::Builder::new()
        .name(format!("wait-{program}"))
        .spawn(move || {
            if let Ok(child) = child_rx.recv() {
                // The receiver is gone if we already gave up on this child.
                let _ = tx.send(child.wait_with_output());
            }
        })
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;
    Ok((child_tx, rx))
}

/// Convenience for building argument lists from mixed literals and numbers.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($arg.to_string()),*]
    };
}
