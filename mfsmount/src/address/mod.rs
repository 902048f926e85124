//! Classification of filesystem paths that embed IPFS content addresses.
//!
//! Paths handed to the mount can either be plain MFS paths
//! (`/documents/notes.txt`) or carry an embedded immutable address
//! (`/inbox/ipfs/Qm.../readme`). [`classify`] finds the leftmost `/ipfs/` or
//! `/ipns/` marker and splits the path into the local parent directory, the
//! embedded address, and its leaf name. Plain MFS paths are not addresses
//! and are rejected; the dispatcher uses them directly.

mod classifier;

pub use classifier::{classify, AddressError, AddressKind, MfsAddress};
