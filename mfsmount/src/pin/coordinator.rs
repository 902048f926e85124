//! Pin/publish state machine for the mutable root.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info};

use crate::command::{CommandError, RemoteAction, RemoteCommand, RemoteRunner};

/// Tree path of the mutable root.
const ROOT_PATH: &str = "/";

/// Errors from pin/publish coordination.
#[derive(Debug, Error)]
pub enum PinError {
    /// `after_mutation` was called before `init`. A programming
    /// precondition violation, not a user-facing filesystem error.
    #[error("pin coordinator used before initialization")]
    NotInitialized,

    /// The resolve command succeeded but produced no address line.
    #[error("root address resolution produced no address")]
    UnresolvedRoot,

    /// A remote command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Outcome of a successful coordination call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootUpdate {
    /// The root changed; pin and name record now reference the new address.
    Updated(String),
    /// The mutation did not change the root's content address (e.g. a file
    /// overwritten with identical bytes). Success with no work.
    Unchanged,
}

/// Tracks the pinned root address across tree mutations.
///
/// All state lives behind one mutex so concurrent mutations cannot
/// interleave their resolve/compare/update steps and lose a pin swap.
pub struct PinCoordinator {
    runner: Arc<dyn RemoteRunner>,
    last_root: Mutex<Option<String>>,
}

impl PinCoordinator {
    pub fn new(runner: Arc<dyn RemoteRunner>) -> Self {
        Self {
            runner,
            last_root: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<String>> {
        self.last_root.lock().unwrap()
    }

    /// Resolve the content address of a tree path.
    fn resolve(&self, path: &str) -> Result<String, PinError> {
        let command = RemoteCommand::new(RemoteAction::ResolveAddress).arg(path);
        let lines = self.runner.query(command)?.lines()?;
        lines.into_iter().next().ok_or(PinError::UnresolvedRoot)
    }

    /// Resolve the current root content address.
    pub fn resolve_root(&self) -> Result<String, PinError> {
        self.resolve(ROOT_PATH)
    }

    /// Resolve the root once and start tracking it. Called at mount time;
    /// a failure here fails the mount.
    pub fn init(&self) -> Result<(), PinError> {
        let mut state = self.state();
        let root = self.resolve(ROOT_PATH)?;
        info!(root = %root, "tracking initial root address");
        *state = Some(root);
        Ok(())
    }

    /// Stop tracking. No remote calls; the pin and name record stay as
    /// they were last coordinated.
    pub fn destroy(&self) {
        *self.state() = None;
    }

    /// Re-resolve the root after a tree mutation and bring the pin and
    /// name record up to date.
    ///
    /// An unchanged root is success with no work. On pin-update failure the
    /// tracked address is left untouched and the error propagates, so the
    /// triggering mutation is reported failed even though the tree itself
    /// already changed.
    pub fn after_mutation(&self) -> Result<RootUpdate, PinError> {
        let mut state = self.state();

        let current = self.resolve(ROOT_PATH)?;
        let Some(previous) = state.clone() else {
            return Err(PinError::NotInitialized);
        };

        if previous == current {
            debug!(root = %current, "root unchanged after mutation, nothing to do");
            return Ok(RootUpdate::Unchanged);
        }

        self.runner.mutate(
            RemoteCommand::new(RemoteAction::PinUpdate)
                .arg(&previous)
                .arg(&current),
        )?;
        self.publish(&current)?;

        debug!(old = %previous, new = %current, "root pin updated and published");
        *state = Some(current.clone());
        Ok(RootUpdate::Updated(current))
    }

    /// Pin one address directly, outside root coordination. Used when a
    /// copied-in node must survive regardless of later root swaps.
    pub fn pin_path(&self, path: &str) -> Result<String, PinError> {
        let addr = self.resolve(path)?;
        self.runner
            .mutate(RemoteCommand::new(RemoteAction::PinAdd).arg(&addr))?;
        debug!(path = %path, addr = %addr, "pinned node address");
        Ok(addr)
    }

    /// Publish the current root under the name record without touching the
    /// root pin. The next `after_mutation` call catches the pin up.
    pub fn publish_current_root(&self) -> Result<String, PinError> {
        // Take the lock so publishes serialize with coordination calls.
        let _state = self.state();
        let root = self.resolve(ROOT_PATH)?;
        self.publish(&root)?;
        Ok(root)
    }

    fn publish(&self, addr: &str) -> Result<(), PinError> {
        self.runner
            .mutate(RemoteCommand::new(RemoteAction::NamePublish).arg(addr))?;
        Ok(())
    }

    /// The root address recorded by the last successful coordination.
    pub fn last_root(&self) -> Option<String> {
        self.state().clone()
    }
}
