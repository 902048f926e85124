//! Path-based operation bodies.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::address;
use crate::command::{RemoteAction, RemoteCommand, RemoteRunner};
use crate::pin::PinCoordinator;
use crate::stat::{self, NodeDescriptor, NodeKind};

use super::error::FsError;

/// Attribute fields one operation reports for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub kind: NodeKind,
    pub size: u64,
    pub nlink: u32,
    pub perm: u16,
}

impl From<NodeDescriptor> for NodeAttr {
    fn from(descriptor: NodeDescriptor) -> Self {
        match descriptor.kind {
            NodeKind::Directory => NodeAttr {
                kind: NodeKind::Directory,
                size: 0,
                // Directories report themselves, their dot entry, and one
                // link per child.
                nlink: descriptor.child_count + 2,
                perm: 0o755,
            },
            NodeKind::File => NodeAttr {
                kind: NodeKind::File,
                size: descriptor.size,
                nlink: 1,
                perm: 0o644,
            },
        }
    }
}

/// Maps each filesystem call onto remote store commands.
///
/// Mutating operations coordinate the root pin and name record before
/// reporting success, so a success reply always means the published root
/// reflects the mutation.
pub struct MfsDispatcher {
    runner: Arc<dyn RemoteRunner>,
    coordinator: PinCoordinator,
    cid_version: u8,
}

impl MfsDispatcher {
    /// Build a dispatcher over the given runner.
    ///
    /// `cid_version` is the content-addressing version newly created nodes
    /// are written with, supplied by session configuration.
    pub fn new(runner: Arc<dyn RemoteRunner>, cid_version: u8) -> Self {
        let coordinator = PinCoordinator::new(runner.clone());
        Self {
            runner,
            coordinator,
            cid_version,
        }
    }

    /// Resolve and record the initial root address. Fails the mount when
    /// the root cannot be resolved.
    pub fn init(&self) -> Result<(), FsError> {
        self.coordinator.init().map_err(FsError::from)
    }

    /// Release pin tracking. No remote calls.
    pub fn destroy(&self) {
        self.coordinator.destroy();
    }

    /// Describe the node at `path`.
    pub fn getattr(&self, path: &str) -> Result<NodeAttr, FsError> {
        let mut stream = self
            .runner
            .query(RemoteCommand::new(RemoteAction::FilesStat).arg(path))
            .map_err(FsError::from)?;

        let parsed = stat::parse(&mut stream);
        let finished = stream.finish();

        // A non-zero exit or unparsable output both mean the node is not
        // there; the store exits 1 for missing paths.
        match (parsed, finished) {
            (Ok(descriptor), Ok(())) => Ok(NodeAttr::from(descriptor)),
            _ => Err(FsError::NotFound),
        }
    }

    /// Create a directory node at `path`.
    pub fn mkdir(&self, path: &str) -> Result<(), FsError> {
        debug!(path, "mkdir");
        self.runner.mutate(
            RemoteCommand::new(RemoteAction::FilesMkdir)
                .arg("--cid-ver")
                .arg(self.cid_version.to_string())
                .arg(path),
        )?;
        self.coordinate()
    }

    /// Remove the file node at `path`.
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        debug!(path, "unlink");
        self.runner
            .mutate(RemoteCommand::new(RemoteAction::FilesRm).arg(path))?;
        self.coordinate()
    }

    /// Remove the directory node at `path` and everything under it.
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        debug!(path, "rmdir");
        self.runner
            .mutate(RemoteCommand::new(RemoteAction::FilesRm).arg("-r").arg(path))?;
        self.coordinate()
    }

    /// Move the node at `src` to `dst`.
    pub fn rename(&self, src: &str, dst: &str) -> Result<(), FsError> {
        debug!(src, dst, "rename");
        self.runner
            .mutate(RemoteCommand::new(RemoteAction::FilesMv).arg(src).arg(dst))?;
        self.coordinate()
    }

    /// Link external content into the tree.
    ///
    /// `target` must carry an embedded store address; the addressed node is
    /// copied to `linkpath`, its own content address pinned directly, and
    /// the current root republished. The root pin itself is caught up by
    /// the next regular mutation.
    pub fn symlink(&self, target: &str, linkpath: &str) -> Result<(), FsError> {
        let addr = address::classify(target).map_err(|_| FsError::InvalidAddress)?;
        debug!(content_addr = %addr.content_addr, linkpath, "linking external address");

        self.runner.mutate(
            RemoteCommand::new(RemoteAction::FilesCp)
                .arg(&addr.content_addr)
                .arg(linkpath),
        )?;

        self.coordinator.pin_path(linkpath)?;
        self.coordinator.publish_current_root()?;
        Ok(())
    }

    /// Read up to `size` bytes of `path` starting at `offset`.
    ///
    /// The store handles range clamping; the returned buffer holds the
    /// bytes actually available.
    pub fn read(&self, path: &str, offset: i64, size: u32) -> Result<Vec<u8>, FsError> {
        let stream = self.runner.query(
            RemoteCommand::new(RemoteAction::FilesRead)
                .arg("--offset")
                .arg(offset.to_string())
                .arg("--count")
                .arg(size.to_string())
                .arg(path),
        )?;
        stream.read_all().map_err(FsError::from)
    }

    /// Write `data` into `path` at `offset`, creating the node if needed.
    ///
    /// Returns the number of bytes written (standard short-write
    /// semantics).
    pub fn write(&self, path: &str, offset: i64, data: &[u8]) -> Result<usize, FsError> {
        self.runner.mutate_with_input(
            RemoteCommand::new(RemoteAction::FilesWrite)
                .arg("--create")
                .arg("--offset")
                .arg(offset.to_string())
                .arg("--count")
                .arg(data.len().to_string())
                .arg("--cid-ver")
                .arg(self.cid_version.to_string())
                .arg(path),
            data,
        )?;
        self.coordinate()?;
        Ok(data.len())
    }

    /// List the names of the immediate children of `path`.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let stream = self
            .runner
            .query(RemoteCommand::new(RemoteAction::FilesLs).arg(path))?;
        stream.lines().map_err(FsError::from)
    }

    /// Report a link target.
    ///
    /// Degenerate by design: the only symlinks this filesystem ever
    /// reports are the markers left by [`MfsDispatcher::symlink`], and
    /// their target is defined to be the original input path.
    pub fn readlink(&self, path: &str) -> String {
        path.to_string()
    }

    /// Root address recorded by the last successful coordination.
    pub fn last_root(&self) -> Option<String> {
        self.coordinator.last_root()
    }

    fn coordinate(&self) -> Result<(), FsError> {
        match self.coordinator.after_mutation() {
            Ok(update) => {
                debug!(?update, "pin coordination complete");
                Ok(())
            }
            Err(e) => {
                // The tree write already landed; only the pin/publish side
                // failed. Reported as overall failure per contract.
                warn!(error = %e, "pin coordination failed after mutation");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandError, QueryStream};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRemote {
        /// Scripted responses for query-style commands, consumed in order.
        query_responses: Mutex<VecDeque<Result<Vec<u8>, CommandError>>>,
        /// Recorded argv of every command, queries and mutations alike.
        calls: Mutex<Vec<Vec<String>>>,
        fail_mutations: bool,
        fail_spawn: AtomicBool,
    }

    impl FakeRemote {
        fn push_query(&self, bytes: &[u8]) {
            self.query_responses
                .lock()
                .unwrap()
                .push_back(Ok(bytes.to_vec()));
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteRunner for FakeRemote {
        fn query(&self, command: RemoteCommand) -> Result<QueryStream, CommandError> {
            if self.fail_spawn.load(Ordering::SeqCst) {
                return Err(CommandError::Spawn(std::io::Error::other("no slots")));
            }
            self.calls.lock().unwrap().push(command.to_argv());
            match self.query_responses.lock().unwrap().pop_front() {
                Some(Ok(bytes)) => Ok(QueryStream::from_bytes(bytes)),
                Some(Err(e)) => Err(e),
                None => Ok(QueryStream::from_bytes("")),
            }
        }

        fn mutate(&self, command: RemoteCommand) -> Result<(), CommandError> {
            if self.fail_spawn.load(Ordering::SeqCst) {
                return Err(CommandError::Spawn(std::io::Error::other("no slots")));
            }
            self.calls.lock().unwrap().push(command.to_argv());
            if self.fail_mutations {
                Err(CommandError::Exit(1))
            } else {
                Ok(())
            }
        }

        fn mutate_with_input(
            &self,
            command: RemoteCommand,
            _input: &[u8],
        ) -> Result<(), CommandError> {
            self.mutate(command)
        }
    }

    fn dispatcher(remote: FakeRemote) -> (Arc<FakeRemote>, MfsDispatcher) {
        let remote = Arc::new(remote);
        let dispatcher = MfsDispatcher::new(remote.clone(), 1);
        (remote, dispatcher)
    }

    /// Initialized dispatcher whose root resolves to `QmRoot1`, then
    /// `QmRoot2` on the post-mutation resolve.
    fn initialized_dispatcher(remote: FakeRemote) -> (Arc<FakeRemote>, MfsDispatcher) {
        remote.push_query(b"QmRoot1\n");
        remote.push_query(b"QmRoot2\n");
        let (remote, dispatcher) = dispatcher(remote);
        dispatcher.init().unwrap();
        (remote, dispatcher)
    }

    #[test]
    fn test_getattr_maps_directory_link_count() {
        let remote = FakeRemote::default();
        remote.push_query(b"Size: 0\nCumulativeSize: 96\nChildBlocks: 3\nType: directory\n");
        let (_, dispatcher) = dispatcher(remote);

        let attr = dispatcher.getattr("/photos").unwrap();
        assert_eq!(attr.kind, NodeKind::Directory);
        assert_eq!(attr.nlink, 5);
        assert_eq!(attr.size, 0);
        assert_eq!(attr.perm, 0o755);
    }

    #[test]
    fn test_getattr_maps_file_fields() {
        let remote = FakeRemote::default();
        remote.push_query(b"Size: 42\nCumulativeSize: 42\nChildBlocks: 0\nType: file\n");
        let (_, dispatcher) = dispatcher(remote);

        let attr = dispatcher.getattr("/notes.txt").unwrap();
        assert_eq!(attr.kind, NodeKind::File);
        assert_eq!(attr.size, 42);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.perm, 0o644);
    }

    #[test]
    fn test_getattr_missing_node_is_not_found() {
        let remote = FakeRemote::default();
        remote.push_query(b"");
        let (_, dispatcher) = dispatcher(remote);

        assert!(matches!(
            dispatcher.getattr("/missing"),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn test_mkdir_coordinates_pin_and_publish() {
        let (remote, dispatcher) = initialized_dispatcher(FakeRemote::default());

        dispatcher.mkdir("/photos").unwrap();

        let calls = remote.calls();
        assert_eq!(
            calls[1],
            vec!["files", "mkdir", "--cid-ver", "1", "/photos"]
        );
        assert!(calls.contains(&vec![
            "pin".into(),
            "update".into(),
            "QmRoot1".into(),
            "QmRoot2".into()
        ]));
        assert!(calls.contains(&vec![
            "name".into(),
            "publish".into(),
            "--allow-offline".into(),
            "QmRoot2".into()
        ]));
        assert_eq!(dispatcher.last_root(), Some("QmRoot2".to_string()));
    }

    #[test]
    fn test_unlink_is_non_recursive_rmdir_is_recursive() {
        let (remote, dispatcher) = initialized_dispatcher(FakeRemote::default());
        dispatcher.unlink("/notes.txt").unwrap();

        let remote2 = FakeRemote::default();
        let (remote2, dispatcher2) = initialized_dispatcher(remote2);
        dispatcher2.rmdir("/photos").unwrap();

        assert_eq!(remote.calls()[1], vec!["files", "rm", "/notes.txt"]);
        assert_eq!(remote2.calls()[1], vec!["files", "rm", "-r", "/photos"]);
    }

    #[test]
    fn test_failed_mutation_skips_coordination() {
        let remote = FakeRemote {
            fail_mutations: true,
            ..FakeRemote::default()
        };
        let (remote, dispatcher) = initialized_dispatcher(remote);

        assert!(matches!(
            dispatcher.mkdir("/photos"),
            Err(FsError::RemoteRejected(1))
        ));
        // Only the init resolve and the failed mkdir reached the remote;
        // no pin or publish command was attempted.
        let calls = remote.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(dispatcher.last_root(), Some("QmRoot1".to_string()));
    }

    #[test]
    fn test_failed_spawn_leaves_root_untouched() {
        let remote = FakeRemote::default();
        remote.push_query(b"QmRoot1\n");
        let (remote, dispatcher) = dispatcher(remote);
        dispatcher.init().unwrap();

        remote.fail_spawn.store(true, Ordering::SeqCst);

        assert!(matches!(
            dispatcher.mkdir("/photos"),
            Err(FsError::SpawnFailure(_))
        ));
        // The mutation never reached the remote, so no coordination ran.
        assert_eq!(dispatcher.last_root(), Some("QmRoot1".to_string()));
    }

    #[test]
    fn test_write_passes_offset_length_and_cid_version() {
        let (remote, dispatcher) = initialized_dispatcher(FakeRemote::default());

        let written = dispatcher.write("/notes.txt", 128, b"hello").unwrap();
        assert_eq!(written, 5);
        assert_eq!(
            remote.calls()[1],
            vec![
                "files",
                "write",
                "--create",
                "--offset",
                "128",
                "--count",
                "5",
                "--cid-ver",
                "1",
                "/notes.txt"
            ]
        );
    }

    #[test]
    fn test_read_requests_range() {
        let remote = FakeRemote::default();
        remote.push_query(b"hello");
        let (remote, dispatcher) = dispatcher(remote);

        let data = dispatcher.read("/notes.txt", 10, 5).unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(
            remote.calls()[0],
            vec![
                "files",
                "read",
                "--offset",
                "10",
                "--count",
                "5",
                "/notes.txt"
            ]
        );
    }

    #[test]
    fn test_readdir_yields_one_name_per_line() {
        let remote = FakeRemote::default();
        remote.push_query(b"a.txt\nphotos\nnotes.md\n");
        let (_, dispatcher) = dispatcher(remote);

        assert_eq!(
            dispatcher.readdir("/").unwrap(),
            vec!["a.txt", "photos", "notes.md"]
        );
    }

    #[test]
    fn test_symlink_copies_pins_and_publishes() {
        let remote = FakeRemote::default();
        // Resolves: copied node's address, then current root for publish.
        remote.push_query(b"QmCopied\n");
        remote.push_query(b"QmRoot2\n");
        let (remote, dispatcher) = dispatcher(remote);

        dispatcher
            .symlink("/ipfs/QmCopied", "/inbox/QmCopied")
            .unwrap();

        let calls = remote.calls();
        assert_eq!(
            calls[0],
            vec!["files", "cp", "/ipfs/QmCopied", "/inbox/QmCopied"]
        );
        assert!(calls.contains(&vec!["pin".into(), "add".into(), "QmCopied".into()]));
        assert!(calls.contains(&vec![
            "name".into(),
            "publish".into(),
            "--allow-offline".into(),
            "QmRoot2".into()
        ]));
    }

    #[test]
    fn test_symlink_rejects_plain_path_target() {
        let (_, dispatcher) = dispatcher(FakeRemote::default());
        assert!(matches!(
            dispatcher.symlink("/documents/notes.txt", "/inbox/copy"),
            Err(FsError::InvalidAddress)
        ));
    }

    #[test]
    fn test_readlink_echoes_path() {
        let (_, dispatcher) = dispatcher(FakeRemote::default());
        assert_eq!(dispatcher.readlink("/inbox/QmCopied"), "/inbox/QmCopied");
    }
}
