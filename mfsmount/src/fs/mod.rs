//! Filesystem operation layer.
//!
//! Two halves, kept separate so the operation bodies stay testable without
//! a kernel in the loop:
//!
//! - [`MfsDispatcher`] - path-based operation bodies. Each entry point maps
//!   one filesystem call to a short sequence of remote commands, descriptor
//!   parses, and pin coordination.
//! - [`MfsFilesystem`] - the `fuser` adapter. Keeps the inode ↔ path table
//!   and translates kernel callbacks into dispatcher calls and errno
//!   replies.

mod dispatcher;
mod error;
mod filesystem;

pub use dispatcher::{MfsDispatcher, NodeAttr};
pub use error::FsError;
pub use filesystem::MfsFilesystem;
