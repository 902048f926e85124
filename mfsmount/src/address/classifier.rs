//! Path scanner for embedded `/ipfs/` and `/ipns/` addresses.

use thiserror::Error;

/// Address markers recognized in a path, leftmost match wins.
const MARKERS: [(&str, AddressKind); 2] = [
    ("/ipfs/", AddressKind::ImmutableContent),
    ("/ipns/", AddressKind::MutableName),
];

/// Errors from path classification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The path contains no recognized store address.
    #[error("path contains no /ipfs/ or /ipns/ address")]
    NotAStoreAddress,
}

/// Which naming scheme the embedded address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `/ipfs/<CID>` - immutable content address.
    ImmutableContent,
    /// `/ipns/<name>` - mutable name record, resolved by the store.
    MutableName,
}

/// A filesystem path split around an embedded store address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfsAddress {
    /// MFS directory the address appears under ("/" when the path is the
    /// address itself).
    pub parent_dir: String,
    /// The embedded address, from its marker to the end of the path.
    pub content_addr: String,
    /// Final segment of `content_addr`; the name the node takes in the MFS.
    pub leaf_name: String,
    /// Naming scheme of the address.
    pub kind: AddressKind,
}

/// Split `path` around the leftmost embedded `/ipfs/` or `/ipns/` address.
///
/// A marker only starts an address when the segment after it leads with an
/// alphabetic character; `/ipfs/9abc` is not an address and scanning
/// continues past it. Paths without any marker are not store addresses.
///
/// # Example
///
/// ```
/// use mfsmount::address::{classify, AddressKind};
///
/// let addr = classify("/inbox/ipfs/QmHash/readme").unwrap();
/// assert_eq!(addr.parent_dir, "/inbox");
/// assert_eq!(addr.content_addr, "/ipfs/QmHash/readme");
/// assert_eq!(addr.leaf_name, "readme");
/// assert_eq!(addr.kind, AddressKind::ImmutableContent);
/// ```
pub fn classify(path: &str) -> Result<MfsAddress, AddressError> {
    for (offset, byte) in path.bytes().enumerate() {
        if byte != b'/' {
            continue;
        }

        let rest = &path[offset..];
        for (marker, kind) in MARKERS {
            let Some(token) = rest.strip_prefix(marker) else {
                continue;
            };

            // The address token must lead with a letter; anything else is
            // an ordinary path segment that happens to be named "ipfs".
            if !token.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                continue;
            }

            let parent_dir = if offset == 0 {
                String::from("/")
            } else {
                path[..offset].to_string()
            };
            let content_addr = rest.to_string();
            let leaf_name = content_addr
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();

            return Ok(MfsAddress {
                parent_dir,
                content_addr,
                leaf_name,
                kind,
            });
        }
    }

    Err(AddressError::NotAStoreAddress)
}
