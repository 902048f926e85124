//! Remote store command invocation.
//!
//! Every interaction with the IPFS node goes through this module: a
//! [`RemoteCommand`] names a logical action plus its ordered arguments, and
//! a [`RemoteRunner`] spawns the store binary with those arguments passed as
//! discrete argv entries. Path components are never interpolated into a
//! shell string, so quotes and metacharacters in user paths cannot alter
//! the invoked command.
//!
//! Query-style actions return a [`QueryStream`] that the caller must drain
//! and [`QueryStream::finish`] to observe the exit status; mutation-style
//! actions return only a completion status.

mod action;
mod builder;
mod runner;
mod stream;

pub use action::RemoteAction;
pub use builder::RemoteCommand;
pub use runner::{CommandError, CommandRunner, RemoteRunner, RunnerConfig};
pub use stream::QueryStream;
