//! Random pointer and namespace operations checked against the trie
//! invariants after every step.

use proptest::prelude::*;

use crate::pointer::{FilePointer, ListenerId};
use crate::test_support::{Fixture, RecordingListener};
use crate::vfs::url::split_url;

const DIRS: &[&str] = &["/a", "/b", "/a/c"];
const PATHS: &[&str] = &["/a", "/b", "/a/c", "/a/x", "/b/x", "/a/c/y", "/b/y"];
const NAMES: &[&str] = &["x", "y", "z", "c"];

#[derive(Debug, Clone)]
enum Op {
    Create {
        path: usize,
        recursive: bool,
        with_listener: bool,
    },
    Dispose(usize),
    MakeDirs(usize),
    MakeFile(usize),
    Delete(usize),
    Move { path: usize, dir: usize },
    Rename { path: usize, name: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..PATHS.len(), any::<bool>(), any::<bool>()).prop_map(|(path, recursive, with_listener)| Op::Create {
            path,
            recursive,
            with_listener,
        }),
        2 => any::<usize>().prop_map(Op::Dispose),
        1 => (0..DIRS.len()).prop_map(Op::MakeDirs),
        2 => (0..PATHS.len()).prop_map(Op::MakeFile),
        1 => (0..PATHS.len()).prop_map(Op::Delete),
        1 => (0..PATHS.len(), 0..DIRS.len()).prop_map(|(path, dir)| Op::Move { path, dir }),
        1 => (0..PATHS.len(), 0..NAMES.len()).prop_map(|(path, name)| Op::Rename { path, name }),
    ]
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn apply(fx: &Fixture, listener: ListenerId, live: &mut Vec<FilePointer>, op: &Op) {
    // Namespace operations may be rejected (missing parent, name taken);
    // rejected batches never reach the registry.
    match *op {
        Op::Create {
            path,
            recursive,
            with_listener,
        } => {
            let listener = with_listener.then_some(listener);
            let url = format!("file://{}", PATHS[path]);
            live.push(fx.registry.create_pointer(url, None, listener, recursive).unwrap());
        }
        Op::Dispose(index) => {
            if !live.is_empty() {
                let pointer = live.swap_remove(index % live.len());
                pointer.dispose().unwrap();
            }
        }
        Op::MakeDirs(dir) => {
            let _ = fx.local.create_dirs(DIRS[dir]);
        }
        Op::MakeFile(path) => {
            let path = PATHS[path];
            if fx.local.create_dirs(parent_of(path)).is_ok() {
                let _ = fx.local.create_file(path);
            }
        }
        Op::Delete(path) => {
            if let Some(file) = fx.local.find(PATHS[path]) {
                let _ = fx.local.delete(&file);
            }
        }
        Op::Move { path, dir } => {
            if let (Some(file), Some(dir)) = (fx.local.find(PATHS[path]), fx.local.find(DIRS[dir])) {
                let _ = fx.local.move_to(&file, &dir);
            }
        }
        Op::Rename { path, name } => {
            if let Some(file) = fx.local.find(PATHS[path]) {
                let _ = fx.local.rename(&file, NAMES[name]);
            }
        }
    }
}

fn check(fx: &Fixture) {
    fx.registry.assert_consistency().unwrap();
    let infos = fx.registry.dump_all_pointers();
    let mut locations: Vec<(&str, Option<ListenerId>)> =
        infos.iter().map(|info| (info.url.as_str(), info.listener)).collect();
    locations.sort();
    for pair in locations.windows(2) {
        assert_ne!(pair[0], pair[1], "two pointers for one location and listener");
    }
    for info in infos {
        let (_, path) = split_url(&info.url);
        assert_eq!(
            info.valid,
            fx.local.find(path).is_some(),
            "validity of {}",
            info.url
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_operations_keep_the_trie_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let fx = Fixture::new();
        let listener = fx.registry.register_listener(RecordingListener::new());
        let mut live = Vec::new();

        for op in &ops {
            apply(&fx, listener, &mut live, op);
            check(&fx);
        }

        for pointer in live.drain(..) {
            pointer.dispose().unwrap();
        }
        prop_assert_eq!(fx.registry.pointer_count(), 0);
        prop_assert_eq!(fx.registry.node_count(), 0);
    }
}
