//! mfsmount CLI - mount the IPFS Mutable File System over FUSE.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use mfsmount::config::Settings;
use mfsmount::logging;
use mfsmount::session::{MountOptions, MountSession};

mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "mfsmount")]
#[command(version = mfsmount::VERSION)]
#[command(about = "Mount the IPFS Mutable File System at a local path", long_about = None)]
struct Args {
    /// Mount the filesystem at this path
    mountpoint: String,

    /// Store binary to invoke (overrides the config file)
    #[arg(long)]
    ipfs_bin: Option<String>,

    /// Store state directory, exported as IPFS_PATH
    #[arg(long)]
    ipfs_path: Option<PathBuf>,

    /// Content-addressing version for newly created nodes
    #[arg(long)]
    cid_version: Option<u8>,

    /// Config file path (default: ~/.mfsmount/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allow the root user to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Automatically unmount on process exit
    #[arg(long)]
    auto_unmount: bool,
}

fn load_settings(args: &Args) -> Result<Settings, CliError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    if let Some(binary) = &args.ipfs_bin {
        settings.store_binary = binary.clone();
    }
    if let Some(dir) = &args.ipfs_path {
        settings.state_dir = Some(dir.clone());
    }
    if let Some(version) = args.cid_version {
        settings.cid_version = version;
    }

    Ok(settings)
}

fn main() {
    let args = Args::parse();

    let _guard =
        match logging::init_logging(logging::default_log_dir(), logging::default_log_file()) {
            Ok(guard) => guard,
            Err(e) => CliError::LoggingInit(e.to_string()).exit(),
        };

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => e.exit(),
    };

    info!(
        version = mfsmount::VERSION,
        mountpoint = %args.mountpoint,
        "starting mfsmount"
    );

    let session = MountSession::new(settings);
    let options = MountOptions {
        allow_root: args.allow_root,
        auto_unmount: args.auto_unmount,
    };

    if let Err(e) = session.mount(&args.mountpoint, &options) {
        CliError::from(e).exit();
    }
}
