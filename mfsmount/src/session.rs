//! Mount session facade.
//!
//! Wires configuration into the command runner, dispatcher, and FUSE
//! adapter, and hands the result to `fuser`. The CLI only talks to this
//! module.

use std::io;
use std::path::Path;
use std::sync::Arc;

use fuser::MountOption;
use thiserror::Error;
use tracing::info;

use crate::command::CommandRunner;
use crate::config::Settings;
use crate::fs::{MfsDispatcher, MfsFilesystem};

/// Session-level mount errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The mountpoint path does not exist.
    #[error("mountpoint does not exist: {0}")]
    MissingMountpoint(String),

    /// The FUSE mount itself failed.
    #[error("FUSE mount failed: {0}")]
    Mount(#[from] io::Error),
}

/// Kernel-facing mount options the caller can toggle.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    /// Allow the root user to access the filesystem.
    pub allow_root: bool,
    /// Unmount automatically when the process exits.
    pub auto_unmount: bool,
}

/// One mounted view of the store's mutable tree.
pub struct MountSession {
    settings: Settings,
}

impl MountSession {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Build the filesystem without mounting it. Exposed for tests and
    /// embedders that drive `fuser` themselves.
    pub fn filesystem(&self) -> MfsFilesystem {
        let runner = Arc::new(CommandRunner::new(self.settings.runner_config()));
        let dispatcher = Arc::new(MfsDispatcher::new(runner, self.settings.cid_version));
        MfsFilesystem::new(dispatcher)
    }

    /// Mount at `mountpoint` and block until unmounted.
    pub fn mount(&self, mountpoint: &str, options: &MountOptions) -> Result<(), SessionError> {
        if !Path::new(mountpoint).exists() {
            return Err(SessionError::MissingMountpoint(mountpoint.to_string()));
        }

        let mut mount_options = vec![
            MountOption::RW,
            MountOption::Exec,
            MountOption::NoAtime,
            MountOption::FSName(String::from("mfsmount")),
        ];
        if options.allow_root {
            mount_options.push(MountOption::AllowRoot);
        }
        if options.auto_unmount {
            mount_options.push(MountOption::AutoUnmount);
        }

        info!(
            mountpoint,
            binary = %self.settings.store_binary,
            cid_version = self.settings.cid_version,
            "mounting store tree"
        );

        fuser::mount2(self.filesystem(), mountpoint, &mount_options)?;
        Ok(())
    }
}
