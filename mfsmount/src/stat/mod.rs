//! Parsing of the store's "describe node" output.
//!
//! `files stat` answers with key:value lines (`Size:`, `CumulativeSize:`,
//! `ChildBlocks:`, `Type:`); [`parse`] folds them into a [`NodeDescriptor`].
//! Unrecognized lines are skipped so newer store versions with extra fields
//! keep working.

mod parser;

pub use parser::{parse, NodeDescriptor, NodeKind, StatError};
