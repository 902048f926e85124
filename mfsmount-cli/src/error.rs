//! CLI error handling with user-friendly messages.
//!
//! Centralizes error reporting for the CLI, providing consistent
//! formatting and appropriate exit codes.

use std::fmt;
use std::process;

use mfsmount::config::ConfigError;
use mfsmount::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigError),
    /// Mount failed
    Mount(SessionError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Mount(SessionError::Mount(_)) = self {
            eprintln!();
            eprintln!("Common issues:");
            eprintln!("  1. FUSE not installed: sudo apt install fuse (Linux)");
            eprintln!("  2. Permissions: you may need to be in the 'fuse' group");
            eprintln!("  3. Mountpoint in use: try: fusermount -u <mountpoint>");
            eprintln!("  4. No store daemon: make sure 'ipfs daemon' is reachable");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Mount(e) => write!(f, "Mount error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Mount(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Mount(e)
    }
}
