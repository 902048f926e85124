//! End-to-end dispatcher tests against a scripted store stub.
//!
//! The stub keeps a generation counter in its state directory; mutations
//! bump it, and the root address resolves to `QmRoot<generation>`. That
//! reproduces the store's behavior of recomputing the root content address
//! after every tree change, so the pin/publish coordination can be
//! observed from the command log the stub writes.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use mfsmount::command::{CommandRunner, RunnerConfig};
use mfsmount::fs::{FsError, MfsDispatcher};
use mfsmount::stat::NodeKind;

const STUB_SCRIPT: &str = r#"#!/bin/sh
state="$IPFS_PATH"
gen() { cat "$state/gen"; }
bump() { echo $(( $(cat "$state/gen") + 1 )) > "$state/gen"; }
log() { printf '%s\n' "$*" >> "$state/log"; }

case "$1 $2" in
"files stat")
    if [ "$3" = "--hash" ]; then
        echo "QmRoot$(gen)"
        exit 0
    fi
    case "$3" in
    /photos)
        echo "Size: 0"
        echo "CumulativeSize: 96"
        echo "ChildBlocks: 3"
        echo "Type: directory"
        ;;
    /notes.txt)
        echo "Size: 42"
        echo "CumulativeSize: 42"
        echo "ChildBlocks: 0"
        echo "Type: file"
        ;;
    *)
        exit 1
        ;;
    esac
    ;;
"files mkdir")
    log "mkdir $5"
    if [ "$5" != "/noop" ]; then bump; fi
    ;;
"files rm")
    log "rm $3 $4"
    bump
    ;;
"files ls")
    printf 'notes.txt\nphotos\n'
    ;;
"files read")
    printf 'hello world'
    ;;
"files write")
    cat > "$state/written"
    bump
    ;;
"files cp")
    log "cp $3 $4"
    bump
    ;;
"pin update")
    log "pin update $3 $4"
    ;;
"pin add")
    log "pin add $3"
    ;;
"name publish")
    log "publish $4"
    ;;
*)
    exit 1
    ;;
esac
exit 0
"#;

struct Harness {
    _stub_dir: tempfile::TempDir,
    state_dir: tempfile::TempDir,
    dispatcher: MfsDispatcher,
}

impl Harness {
    fn new() -> Self {
        let stub_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();

        let binary = stub_dir.path().join("ipfs-stub");
        fs::write(&binary, STUB_SCRIPT).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(state_dir.path().join("gen"), "0\n").unwrap();

        let runner = CommandRunner::new(RunnerConfig {
            binary: binary.to_str().unwrap().to_string(),
            state_dir: Some(state_dir.path().to_path_buf()),
        });
        let dispatcher = MfsDispatcher::new(Arc::new(runner), 1);

        Self {
            _stub_dir: stub_dir,
            state_dir,
            dispatcher,
        }
    }

    fn log(&self) -> Vec<String> {
        read_lines(&self.state_dir.path().join("log"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn mkdir_swaps_pin_and_publishes_new_root() {
    let harness = Harness::new();
    harness.dispatcher.init().unwrap();

    harness.dispatcher.mkdir("/photos").unwrap();

    let log = harness.log();
    assert_eq!(
        log,
        vec![
            "mkdir /photos",
            "pin update QmRoot0 QmRoot1",
            "publish QmRoot1"
        ]
    );
    assert_eq!(harness.dispatcher.last_root(), Some("QmRoot1".to_string()));
}

#[test]
fn sequential_mutations_track_each_new_root() {
    let harness = Harness::new();
    harness.dispatcher.init().unwrap();

    harness.dispatcher.mkdir("/photos").unwrap();
    harness.dispatcher.rmdir("/photos").unwrap();

    let log = harness.log();
    assert!(log.contains(&"pin update QmRoot0 QmRoot1".to_string()));
    assert!(log.contains(&"pin update QmRoot1 QmRoot2".to_string()));
    assert_eq!(harness.dispatcher.last_root(), Some("QmRoot2".to_string()));
}

#[test]
fn unchanged_root_after_mutation_is_success() {
    let harness = Harness::new();
    harness.dispatcher.init().unwrap();

    // The stub does not bump the generation for /noop, modeling a
    // mutation that leaves the root's content address untouched.
    harness.dispatcher.mkdir("/noop").unwrap();

    let log = harness.log();
    assert_eq!(log, vec!["mkdir /noop"]);
    assert_eq!(harness.dispatcher.last_root(), Some("QmRoot0".to_string()));
}

#[test]
fn mutation_without_init_is_a_consistency_violation() {
    let harness = Harness::new();
    assert!(matches!(
        harness.dispatcher.mkdir("/photos"),
        Err(FsError::ConsistencyViolation(_))
    ));
}

#[test]
fn getattr_describes_directories_and_files() {
    let harness = Harness::new();

    let dir_attr = harness.dispatcher.getattr("/photos").unwrap();
    assert_eq!(dir_attr.kind, NodeKind::Directory);
    assert_eq!(dir_attr.nlink, 5);

    let file_attr = harness.dispatcher.getattr("/notes.txt").unwrap();
    assert_eq!(file_attr.kind, NodeKind::File);
    assert_eq!(file_attr.size, 42);

    assert!(matches!(
        harness.dispatcher.getattr("/absent"),
        Err(FsError::NotFound)
    ));
}

#[test]
fn write_streams_data_and_coordinates() {
    let harness = Harness::new();
    harness.dispatcher.init().unwrap();

    let written = harness
        .dispatcher
        .write("/notes.txt", 0, b"fresh content")
        .unwrap();

    assert_eq!(written, 13);
    assert_eq!(
        fs::read(harness.state_dir.path().join("written")).unwrap(),
        b"fresh content"
    );
    assert_eq!(harness.dispatcher.last_root(), Some("QmRoot1".to_string()));
}

#[test]
fn read_returns_available_bytes() {
    let harness = Harness::new();
    let data = harness.dispatcher.read("/notes.txt", 0, 4096).unwrap();
    assert_eq!(data, b"hello world");
}

#[test]
fn readdir_lists_child_names() {
    let harness = Harness::new();
    assert_eq!(
        harness.dispatcher.readdir("/").unwrap(),
        vec!["notes.txt", "photos"]
    );
}

#[test]
fn symlink_copies_pins_directly_and_publishes() {
    let harness = Harness::new();
    harness.dispatcher.init().unwrap();

    harness
        .dispatcher
        .symlink("/ipfs/QmShared", "/photos/QmShared")
        .unwrap();

    let log = harness.log();
    assert_eq!(log[0], "cp /ipfs/QmShared /photos/QmShared");
    // The copied node's own address gets a direct pin, not a root swap.
    assert_eq!(log[1], "pin add QmRoot1");
    assert_eq!(log[2], "publish QmRoot1");
    assert!(!log.iter().any(|line| line.starts_with("pin update")));
    // The root pin is caught up by the next regular mutation.
    assert_eq!(harness.dispatcher.last_root(), Some("QmRoot0".to_string()));
}
