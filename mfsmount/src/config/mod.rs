//! Session configuration for the mount.
//!
//! Settings come from `~/.mfsmount/config.ini` with sensible defaults, and
//! the CLI may override individual values. The core consumes these once at
//! mount time; nothing re-reads configuration mid-session.

mod file;
mod settings;

pub use file::{config_directory, config_file_path, ConfigError};
pub use settings::Settings;
