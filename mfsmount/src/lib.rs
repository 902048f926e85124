//! mfsmount - Mount the IPFS Mutable File System as a local filesystem
//!
//! This library translates ordinary filesystem calls into commands against
//! a local IPFS node's Mutable File System (MFS), and keeps the published
//! root pointer (pin + IPNS name record) consistent with every mutation.
//!
//! # High-Level API
//!
//! For most use cases, the [`session`] module provides a simplified facade:
//!
//! ```ignore
//! use mfsmount::config::Settings;
//! use mfsmount::session::{MountOptions, MountSession};
//!
//! let session = MountSession::new(Settings::default());
//! session.mount("/mnt/mfs", &MountOptions::default())?;
//! ```

pub mod address;
pub mod command;
pub mod config;
pub mod fs;
pub mod logging;
pub mod pin;
pub mod session;
pub mod stat;

/// Version of the mfsmount library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
