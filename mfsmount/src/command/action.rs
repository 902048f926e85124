//! Logical remote actions and their subcommand spellings.
//!
//! The exact textual syntax of the store's CLI is a configuration detail of
//! this table; the rest of the crate only names actions.

/// One logical action against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    /// Describe a node (key:value line response).
    FilesStat,
    /// List immediate children of a directory (one name per line).
    FilesLs,
    /// Create a directory node.
    FilesMkdir,
    /// Copy a node (used to link external addresses into the tree).
    FilesCp,
    /// Remove a node.
    FilesRm,
    /// Move or rename a node.
    FilesMv,
    /// Stream node content.
    FilesRead,
    /// Write bytes into a node.
    FilesWrite,
    /// Pin a content address.
    PinAdd,
    /// Remove a pin.
    PinRm,
    /// Atomically swap a pin from one address to another.
    PinUpdate,
    /// Resolve a tree path to its content address (single address line).
    ResolveAddress,
    /// Publish a content address under the node's name record.
    NamePublish,
}

impl RemoteAction {
    /// Argv prefix for this action, before per-call arguments.
    pub fn argv(self) -> &'static [&'static str] {
        match self {
            RemoteAction::FilesStat => &["files", "stat"],
            RemoteAction::FilesLs => &["files", "ls"],
            RemoteAction::FilesMkdir => &["files", "mkdir"],
            RemoteAction::FilesCp => &["files", "cp"],
            RemoteAction::FilesRm => &["files", "rm"],
            RemoteAction::FilesMv => &["files", "mv"],
            RemoteAction::FilesRead => &["files", "read"],
            RemoteAction::FilesWrite => &["files", "write"],
            RemoteAction::PinAdd => &["pin", "add"],
            RemoteAction::PinRm => &["pin", "rm"],
            RemoteAction::PinUpdate => &["pin", "update"],
            // `files stat --hash` prints only the content address.
            RemoteAction::ResolveAddress => &["files", "stat", "--hash"],
            RemoteAction::NamePublish => &["name", "publish", "--allow-offline"],
        }
    }
}
