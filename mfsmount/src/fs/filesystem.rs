//! `fuser` adapter over the path-based dispatcher.
//!
//! The kernel speaks inodes; the dispatcher speaks paths. This adapter
//! keeps the inode ↔ path table for the mount session, reconstructs a path
//! for every callback, and maps [`FsError`] values onto errno replies.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyWrite, Request, TimeOrNow,
};
use libc::{EINVAL, EIO, ENOENT};
use tracing::{debug, error, warn};

use crate::stat::NodeKind;

use super::dispatcher::{MfsDispatcher, NodeAttr};
use super::error::FsError;

const ROOT_INODE: u64 = 1;
const BLOCK_SIZE: u32 = 512;

// Short TTL: the tree is mutated remotely, so the kernel must not hold on
// to attributes for long.
const TTL: Duration = Duration::new(0, 50);

struct InodeEntry {
    name: String,
    parent: Option<u64>,
    children: BTreeMap<String, u64>,
    /// Original input path for nodes created through symlink emulation.
    /// `readlink` reports this verbatim.
    link_target: Option<String>,
}

impl InodeEntry {
    fn new(name: &str, parent: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: BTreeMap::new(),
            link_target: None,
        }
    }
}

/// FUSE filesystem backed by the remote store's mutable tree.
pub struct MfsFilesystem {
    dispatcher: Arc<MfsDispatcher>,
    inodes: HashMap<u64, InodeEntry>,
    next_inode: u64,
}

impl MfsFilesystem {
    pub fn new(dispatcher: Arc<MfsDispatcher>) -> Self {
        let mut inodes = HashMap::new();
        inodes.insert(ROOT_INODE, InodeEntry::new("", None));
        Self {
            dispatcher,
            inodes,
            next_inode: ROOT_INODE + 1,
        }
    }

    /// Reconstruct the tree path of an inode by walking its parents.
    fn path_of(&self, ino: u64) -> Option<String> {
        if ino == ROOT_INODE {
            return Some(String::from("/"));
        }

        let mut segments = Vec::new();
        let mut current = ino;
        while current != ROOT_INODE {
            let entry = self.inodes.get(&current)?;
            segments.push(entry.name.clone());
            current = entry.parent?;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    /// Path of `name` under the directory inode `parent`.
    fn child_path(&self, parent: u64, name: &str) -> Option<String> {
        let parent_path = self.path_of(parent)?;
        if parent_path == "/" {
            Some(format!("/{name}"))
        } else {
            Some(format!("{parent_path}/{name}"))
        }
    }

    /// Inode of `name` under `parent`, allocating one on first sight.
    fn get_or_insert_child(&mut self, parent: u64, name: &str) -> Option<u64> {
        if let Some(&ino) = self.inodes.get(&parent)?.children.get(name) {
            return Some(ino);
        }

        let ino = self.next_inode;
        self.next_inode += 1;
        self.inodes
            .get_mut(&parent)?
            .children
            .insert(name.to_string(), ino);
        self.inodes.insert(ino, InodeEntry::new(name, Some(parent)));
        Some(ino)
    }

    /// Drop an inode and its whole subtree, detaching it from its parent.
    fn remove_entry(&mut self, parent: u64, name: &str) {
        let Some(ino) = self
            .inodes
            .get_mut(&parent)
            .and_then(|entry| entry.children.remove(name))
        else {
            return;
        };
        self.remove_subtree(ino);
    }

    fn remove_subtree(&mut self, ino: u64) {
        let Some(entry) = self.inodes.remove(&ino) else {
            return;
        };
        for child in entry.children.into_values() {
            self.remove_subtree(child);
        }
    }

    /// Full listing of a directory in reply order: the dot entries, then
    /// the remote children with their kinds.
    fn directory_entries(
        &mut self,
        ino: u64,
        path: &str,
    ) -> Result<Vec<(u64, FileType, String)>, FsError> {
        let names = self.dispatcher.readdir(path)?;
        let parent = self.inodes.get(&ino).and_then(|e| e.parent).unwrap_or(ino);

        let mut entries = vec![
            (ino, FileType::Directory, String::from(".")),
            (parent, FileType::Directory, String::from("..")),
        ];
        for name in names {
            let Some(child_ino) = self.get_or_insert_child(ino, &name) else {
                continue;
            };
            // The listing carries names only; describe each child to report
            // its kind.
            let kind = match self
                .child_path(ino, &name)
                .map(|p| self.dispatcher.getattr(&p))
            {
                Some(Ok(attr)) if attr.kind == NodeKind::Directory => FileType::Directory,
                _ => FileType::RegularFile,
            };
            entries.push((child_ino, kind, name));
        }
        Ok(entries)
    }

    /// Attribute block echoed by `setattr`.
    ///
    /// Describes the node so directories keep their kind; a node the store
    /// cannot describe yet is echoed as a plain file when the call is a
    /// truncation, so creating opens proceed.
    fn described_attr(&self, path: &str, size: Option<u64>) -> Result<NodeAttr, FsError> {
        match (self.dispatcher.getattr(path), size) {
            (Ok(mut attr), maybe_size) => {
                if let Some(size) = maybe_size {
                    attr.size = size;
                }
                Ok(attr)
            }
            (Err(_), Some(size)) => Ok(NodeAttr {
                kind: NodeKind::File,
                size,
                nlink: 1,
                perm: 0o644,
            }),
            (Err(e), None) => Err(e),
        }
    }

    fn file_attr(&self, ino: u64, attr: &NodeAttr, req: &Request<'_>) -> FileAttr {
        let now = SystemTime::now();
        let is_link = self
            .inodes
            .get(&ino)
            .is_some_and(|entry| entry.link_target.is_some());

        let kind = if is_link {
            FileType::Symlink
        } else {
            match attr.kind {
                NodeKind::Directory => FileType::Directory,
                NodeKind::File => FileType::RegularFile,
            }
        };

        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind,
            perm: attr.perm,
            nlink: attr.nlink,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE,
        }
    }
}

/// Directory entries paired with the offset the kernel hands back to
/// resume the listing after each one.
///
/// The offset of an entry is its one-based position in the full listing,
/// so a continuation call at the last delivered offset picks up exactly
/// where the previous reply buffer filled up.
fn entry_page<T>(entries: Vec<T>, offset: i64) -> impl Iterator<Item = (i64, T)> {
    entries
        .into_iter()
        .enumerate()
        .skip(offset as usize)
        .map(|(index, entry)| ((index + 1) as i64, entry))
}

impl Filesystem for MfsFilesystem {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        self.dispatcher.init().map_err(|e| {
            error!(error = %e, "failed to resolve initial root, refusing mount");
            e.errno()
        })
    }

    fn destroy(&mut self) {
        self.dispatcher.destroy();
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        let Some(path) = self.child_path(parent, name) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.getattr(&path) {
            Ok(attr) => {
                let Some(ino) = self.get_or_insert_child(parent, name) else {
                    reply.error(ENOENT);
                    return;
                };
                reply.entry(&TTL, &self.file_attr(ino, &attr, req), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Only size changes carry meaning here; the store recomputes
        // everything else itself. Echo an attribute block so truncating
        // opens succeed.
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        match self.described_attr(&path, size) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        let Some(path) = self.child_path(parent, name) else {
            reply.error(ENOENT);
            return;
        };

        // A zero-length write creates an empty node.
        if let Err(e) = self.dispatcher.write(&path, 0, &[]) {
            reply.error(e.errno());
            return;
        }

        let Some(ino) = self.get_or_insert_child(parent, name) else {
            reply.error(EIO);
            return;
        };
        let attr = NodeAttr {
            kind: NodeKind::File,
            size: 0,
            nlink: 1,
            perm: 0o644,
        };
        reply.entry(&TTL, &self.file_attr(ino, &attr, req), 0);
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        let Some(path) = self.child_path(parent, name) else {
            reply.error(ENOENT);
            return;
        };

        if let Err(e) = self.dispatcher.mkdir(&path) {
            reply.error(e.errno());
            return;
        }

        let Some(ino) = self.get_or_insert_child(parent, name) else {
            reply.error(EIO);
            return;
        };
        let attr = NodeAttr {
            kind: NodeKind::Directory,
            size: 0,
            nlink: 2,
            perm: 0o755,
        };
        reply.entry(&TTL, &self.file_attr(ino, &attr, req), 0);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        let Some(path) = self.child_path(parent, name) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.unlink(&path) {
            Ok(()) => {
                self.remove_entry(parent, name);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(EINVAL);
            return;
        };
        let Some(path) = self.child_path(parent, name) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.rmdir(&path) {
            Ok(()) => {
                self.remove_entry(parent, name);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(name), Some(newname)) = (name.to_str(), newname.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        let (Some(src), Some(dst)) = (
            self.child_path(parent, name),
            self.child_path(newparent, newname),
        ) else {
            reply.error(ENOENT);
            return;
        };

        if let Err(e) = self.dispatcher.rename(&src, &dst) {
            reply.error(e.errno());
            return;
        }

        // Move the inode under its new parent. The destination entry, if
        // any, was overwritten remotely.
        self.remove_entry(newparent, newname);
        let moved = self
            .inodes
            .get_mut(&parent)
            .and_then(|entry| entry.children.remove(name));
        if let Some(ino) = moved {
            if let Some(entry) = self.inodes.get_mut(&ino) {
                entry.name = newname.to_string();
                entry.parent = Some(newparent);
            }
            if let Some(new_parent) = self.inodes.get_mut(&newparent) {
                new_parent.children.insert(newname.to_string(), ino);
            }
        }

        reply.ok();
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let (Some(link_name), Some(target)) = (link_name.to_str(), target.to_str()) else {
            reply.error(EINVAL);
            return;
        };
        let Some(linkpath) = self.child_path(parent, link_name) else {
            reply.error(ENOENT);
            return;
        };

        if let Err(e) = self.dispatcher.symlink(target, &linkpath) {
            warn!(address = %target, link = %linkpath, error = %e, "linking external address failed");
            reply.error(e.errno());
            return;
        }

        let Some(ino) = self.get_or_insert_child(parent, link_name) else {
            reply.error(EIO);
            return;
        };
        if let Some(entry) = self.inodes.get_mut(&ino) {
            entry.link_target = Some(target.to_string());
        }

        let attr = NodeAttr {
            kind: NodeKind::File,
            size: target.len() as u64,
            nlink: 1,
            perm: 0o777,
        };
        reply.entry(&TTL, &self.file_attr(ino, &attr, req), 0);
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(entry) = self.inodes.get(&ino) else {
            reply.error(ENOENT);
            return;
        };

        // Link targets are the original input path string; for anything
        // else the node's own path stands in.
        match &entry.link_target {
            Some(target) => reply.data(self.dispatcher.readlink(target).as_bytes()),
            None => match self.path_of(ino) {
                Some(path) => reply.data(self.dispatcher.readlink(&path).as_bytes()),
                None => reply.error(ENOENT),
            },
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.read(&path, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.dispatcher.write(&path, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        let entries = match self.directory_entries(ino, &path) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        // A full reply buffer stops the loop; the kernel resumes with the
        // offset of the last delivered entry and the page skips up to it.
        let total = entries.len();
        for (entry_offset, (child_ino, kind, name)) in entry_page(entries, offset) {
            if reply.add(child_ino, entry_offset, kind, &name) {
                break;
            }
        }

        debug!(%path, entries = total, "readdir complete");
        reply.ok();
    }
}
