//! Line parser for node descriptors.

use std::io::{BufRead, BufReader, Read};

use thiserror::Error;

const SIZE_PREFIX: &str = "Size:";
const CUMULATIVE_SIZE_PREFIX: &str = "CumulativeSize:";
const CHILD_BLOCKS_PREFIX: &str = "ChildBlocks:";
const TYPE_PREFIX: &str = "Type:";
const DIRECTORY_TYPE: &str = "directory";

/// Errors from descriptor parsing.
#[derive(Debug, Error)]
pub enum StatError {
    /// The output contained no recognized field at all. The dominant real
    /// cause is that the node does not exist.
    #[error("describe-node output contained no recognized fields")]
    NoFields,

    /// A recognized field carried a value that would not parse.
    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    /// The stream failed mid-read.
    #[error("failed to read describe-node output: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a node is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Parsed attribute summary of one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Node size in bytes (zero for directories).
    pub size: u64,
    /// Size of the node plus everything it references.
    pub cumulative_size: u64,
    /// Number of immediate child blocks.
    pub child_count: u32,
    /// Directory or file.
    pub kind: NodeKind,
}

/// Parse describe-node output into a [`NodeDescriptor`].
///
/// Reads `reader` line by line; lines matching no recognized prefix are
/// ignored. The `Type:` value is compared case-sensitively against
/// `directory`; anything else is a file.
pub fn parse(reader: impl Read) -> Result<NodeDescriptor, StatError> {
    let mut size = None;
    let mut cumulative_size = None;
    let mut child_count = None;
    let mut kind = None;

    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(value) = line.strip_prefix(SIZE_PREFIX) {
            size = Some(parse_number(SIZE_PREFIX, value)?);
        } else if let Some(value) = line.strip_prefix(CUMULATIVE_SIZE_PREFIX) {
            cumulative_size = Some(parse_number(CUMULATIVE_SIZE_PREFIX, value)?);
        } else if let Some(value) = line.strip_prefix(CHILD_BLOCKS_PREFIX) {
            let count: u64 = parse_number(CHILD_BLOCKS_PREFIX, value)?;
            child_count = Some(count as u32);
        } else if let Some(value) = line.strip_prefix(TYPE_PREFIX) {
            kind = Some(if value.trim() == DIRECTORY_TYPE {
                NodeKind::Directory
            } else {
                NodeKind::File
            });
        }
    }

    // An empty or wholly unrecognized response never describes a node.
    if size.is_none() && cumulative_size.is_none() && child_count.is_none() && kind.is_none() {
        return Err(StatError::NoFields);
    }

    Ok(NodeDescriptor {
        size: size.unwrap_or(0),
        cumulative_size: cumulative_size.unwrap_or(0),
        child_count: child_count.unwrap_or(0),
        kind: kind.unwrap_or(NodeKind::File),
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<u64, StatError> {
    value
        .trim()
        .parse()
        .map_err(|_| StatError::InvalidValue {
            field,
            value: value.trim().to_string(),
        })
}
