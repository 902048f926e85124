//! Operation error taxonomy and errno mapping.

use std::io;

use thiserror::Error;

use crate::command::CommandError;
use crate::pin::PinError;

/// Failure of one filesystem operation.
///
/// Every dispatcher entry point returns exactly one of these per call; the
/// fuser adapter turns it into a single errno reply. The remote store's own
/// exit-code granularity is coarse, so distinct remote causes collapse into
/// [`FsError::RemoteRejected`].
#[derive(Debug, Error)]
pub enum FsError {
    /// The node does not exist (or its descriptor would not parse).
    #[error("no such entry")]
    NotFound,

    /// The store process could not be started.
    #[error("failed to start remote store process: {0}")]
    SpawnFailure(io::Error),

    /// The store rejected the request with a non-zero exit status.
    #[error("remote store rejected the request (exit status {0})")]
    RemoteRejected(i32),

    /// Pipe trouble while exchanging data with the store process.
    #[error("I/O failure talking to the remote store: {0}")]
    RemoteIo(io::Error),

    /// Pin coordination hit a precondition violation.
    #[error("root consistency violation: {0}")]
    ConsistencyViolation(PinError),

    /// The supplied path is not a recognized store address.
    #[error("not a recognized store address")]
    InvalidAddress,
}

impl FsError {
    /// POSIX error code for this failure, without the sign.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::SpawnFailure(_) => libc::EAGAIN,
            FsError::RemoteRejected(_) => libc::EIO,
            FsError::RemoteIo(_) => libc::EIO,
            FsError::ConsistencyViolation(_) => libc::EIO,
            FsError::InvalidAddress => libc::EINVAL,
        }
    }
}

impl From<CommandError> for FsError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Spawn(io) => FsError::SpawnFailure(io),
            CommandError::Exit(code) => FsError::RemoteRejected(code),
            CommandError::Io(io) => FsError::RemoteIo(io),
        }
    }
}

impl From<PinError> for FsError {
    fn from(e: PinError) -> Self {
        match e {
            PinError::NotInitialized => FsError::ConsistencyViolation(e),
            PinError::UnresolvedRoot => FsError::NotFound,
            PinError::Command(cmd) => cmd.into(),
        }
    }
}
