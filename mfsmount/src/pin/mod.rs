//! Root pin and name-record coordination.
//!
//! The store recomputes the root's content address after every tree
//! mutation. [`PinCoordinator`] tracks the last pinned root, and after each
//! mutation swaps the pin to the new root with a single pin-update (never
//! remove+add, which would open a window with zero pins) and republishes
//! the name record. The coordinator is owned by the mount session; there is
//! no process-wide state.

mod coordinator;

pub use coordinator::{PinCoordinator, PinError, RootUpdate};
