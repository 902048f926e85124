//! Settings structs and defaults.

use std::path::PathBuf;

use crate::command::RunnerConfig;

/// Default store binary name, resolved via `PATH`.
pub const DEFAULT_STORE_BINARY: &str = "ipfs";

/// Default content-addressing version for newly created nodes.
pub const DEFAULT_CID_VERSION: u8 = 1;

/// Mount session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Store binary to invoke.
    pub store_binary: String,
    /// Store state directory, exported as `IPFS_PATH` when set. When
    /// absent the store uses its own default.
    pub state_dir: Option<PathBuf>,
    /// Content-addressing version for newly created nodes.
    pub cid_version: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_binary: DEFAULT_STORE_BINARY.to_string(),
            state_dir: None,
            cid_version: DEFAULT_CID_VERSION,
        }
    }
}

impl Settings {
    /// Invocation settings for the command runner.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            binary: self.store_binary.clone(),
            state_dir: self.state_dir.clone(),
        }
    }
}
