//! Process spawning against the remote store binary.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::trace;

use super::builder::RemoteCommand;
use super::stream::QueryStream;

/// Errors from running a remote command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The store process could not be started at all.
    #[error("failed to start remote store process: {0}")]
    Spawn(io::Error),

    /// The store process terminated with a non-zero status.
    #[error("remote store command exited with status {0}")]
    Exit(i32),

    /// Pipe trouble while exchanging data with the process.
    #[error("I/O error talking to remote store process: {0}")]
    Io(io::Error),
}

/// Session-level invocation settings, supplied once at mount time.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Store binary to invoke (e.g. "ipfs").
    pub binary: String,
    /// Store state directory, exported as `IPFS_PATH` when set.
    pub state_dir: Option<PathBuf>,
}

/// Interface for invoking the remote store.
///
/// The dispatcher and the pin coordinator depend on this trait rather than
/// on [`CommandRunner`] directly, so tests can substitute a fake runner
/// backed by [`QueryStream::from_bytes`].
pub trait RemoteRunner: Send + Sync {
    /// Run a query-style command and return its output stream.
    fn query(&self, command: RemoteCommand) -> Result<QueryStream, CommandError>;

    /// Run a mutation-style command to completion.
    fn mutate(&self, command: RemoteCommand) -> Result<(), CommandError>;

    /// Run a mutation-style command, feeding `input` to its stdin.
    fn mutate_with_input(&self, command: RemoteCommand, input: &[u8]) -> Result<(), CommandError>;
}

/// Spawns one store process per call, argv-vector style.
///
/// Every argument of the [`RemoteCommand`] becomes one discrete argv entry
/// of the spawned process; no shell is involved at any point.
pub struct CommandRunner {
    config: RunnerConfig,
}

impl CommandRunner {
    /// Create a runner with the given session configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn spawn(&self, command: &RemoteCommand, stdin: Stdio, stdout: Stdio) -> Result<Child, CommandError> {
        let argv = command.to_argv();
        trace!(binary = %self.config.binary, ?argv, "spawning remote store command");

        let mut process = Command::new(&self.config.binary);
        process
            .args(&argv)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::null());

        if let Some(dir) = &self.config.state_dir {
            process.env("IPFS_PATH", dir);
        }

        process.spawn().map_err(CommandError::Spawn)
    }

    fn wait(mut child: Child) -> Result<(), CommandError> {
        let status = child.wait().map_err(CommandError::Io)?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Exit(status.code().unwrap_or(-1)))
        }
    }
}

impl RemoteRunner for CommandRunner {
    fn query(&self, command: RemoteCommand) -> Result<QueryStream, CommandError> {
        let child = self.spawn(&command, Stdio::null(), Stdio::piped())?;
        QueryStream::from_child(child)
    }

    fn mutate(&self, command: RemoteCommand) -> Result<(), CommandError> {
        let child = self.spawn(&command, Stdio::null(), Stdio::null())?;
        Self::wait(child)
    }

    fn mutate_with_input(&self, command: RemoteCommand, input: &[u8]) -> Result<(), CommandError> {
        let mut child = self.spawn(&command, Stdio::piped(), Stdio::null())?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CommandError::Io(io::Error::other("child stdin was not piped")))?;
        if let Err(e) = stdin.write_all(input) {
            drop(stdin);
            // A broken pipe here usually means the child rejected the
            // request and exited without draining its stdin; its exit
            // status is the better signal than the pipe error.
            return match child.wait() {
                Ok(status) if !status.success() => {
                    Err(CommandError::Exit(status.code().unwrap_or(-1)))
                }
                _ => Err(CommandError::Io(e)),
            };
        }

        // Dropping stdin closes the pipe so the child sees EOF.
        drop(stdin);
        Self::wait(child)
    }
}
