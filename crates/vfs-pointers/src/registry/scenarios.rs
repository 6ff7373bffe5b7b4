use std::sync::Arc;

use crate::error::PointerError;
use crate::test_support::{Fixture, Phase, RecordingListener};
use crate::vfs::{BulkFileListener, FileEvent, MemoryFs, NamespaceKind, TrieFamily};

#[test]
fn created_file_validates_waiting_pointer() {
    let fx = Fixture::new();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let pointer = fx
        .registry
        .create_pointer("file:///a/b/c.txt", None, Some(listener), false)
        .unwrap();
    assert!(!pointer.is_valid());

    fx.local.create_dirs("/a/b").unwrap();
    assert!(!pointer.is_valid());
    recorder.clear();

    fx.local.create_file("/a/b/c.txt").unwrap();
    assert!(pointer.is_valid());
    assert_eq!(recorder.afters(), vec![vec!["file:///a/b/c.txt".to_string()]]);
    assert_eq!(recorder.befores().len(), 1);
    assert_eq!(pointer.file().unwrap().name(), "c.txt");
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn same_path_and_listener_share_one_pointer() {
    let fx = Fixture::new();
    let listener = fx.registry.register_listener(RecordingListener::new());
    let first = fx
        .registry
        .create_pointer("file:///a/b.txt", None, Some(listener), false)
        .unwrap();
    let second = fx
        .registry
        .create_pointer("file:///a//./b.txt", None, Some(listener), false)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.registry.pointer_count(), 1);
    assert_eq!(fx.registry.dump_all_pointers()[0].refcount, 2);

    first.dispose().unwrap();
    assert!(!second.is_disposed());
    assert_eq!(second.url(), "file:///a/b.txt");

    second.dispose().unwrap();
    assert!(second.is_disposed());
    assert_eq!(fx.registry.pointer_count(), 0);
}

#[test]
fn different_listeners_get_different_pointers() {
    let fx = Fixture::new();
    let one = fx.registry.register_listener(RecordingListener::new());
    let two = fx.registry.register_listener(RecordingListener::new());
    let a = fx.registry.create_pointer("file:///x", None, Some(one), false).unwrap();
    let b = fx.registry.create_pointer("file:///x", None, Some(two), false).unwrap();
    let c = fx.registry.create_pointer("file:///x", None, None, false).unwrap();
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_eq!(fx.registry.pointer_count(), 3);
    // namespace root and x
    assert_eq!(fx.registry.node_count(), 2);
}

#[test]
fn recursive_flag_is_or_ed_into_existing_pointer() {
    let fx = Fixture::new();
    let plain = fx.registry.create_pointer("file:///lib", None, None, false).unwrap();
    assert!(!plain.is_recursive());
    let recursive = fx.registry.create_pointer("file:///lib", None, None, true).unwrap();
    assert_eq!(plain, recursive);
    assert!(plain.is_recursive());
}

#[test]
fn recursive_directory_pointer_hears_about_deep_creation() {
    let fx = Fixture::new();
    fx.local.create_dirs("/lib").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let lib = fx
        .registry
        .create_pointer("file:///lib", None, Some(listener), true)
        .unwrap();

    fx.local.create_dirs("/lib/sub").unwrap();
    recorder.clear();
    fx.local.create_file("/lib/sub/new.jar").unwrap();

    assert!(lib.is_valid());
    assert_eq!(
        recorder.calls(),
        vec![
            (Phase::Before, vec!["file:///lib".to_string()]),
            (Phase::After, vec!["file:///lib".to_string()]),
        ]
    );
    assert_eq!(fx.registry.pointer_count(), 1);
}

#[test]
fn plain_directory_pointer_ignores_deep_creation() {
    let fx = Fixture::new();
    fx.local.create_dirs("/lib/sub").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let _lib = fx
        .registry
        .create_pointer("file:///lib", None, Some(listener), false)
        .unwrap();

    fx.local.create_file("/lib/sub/new.jar").unwrap();
    assert!(recorder.calls().is_empty());
}

#[test]
fn moved_file_pointer_follows_the_file() {
    let fx = Fixture::new();
    fx.local.create_dirs("/old").unwrap();
    let target = fx.local.create_dirs("/new").unwrap();
    let file = fx.local.create_file("/old/name.txt").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let pointer = fx
        .registry
        .create_pointer(&file, None, Some(listener), false)
        .unwrap();

    fx.local.move_to(&file, &target).unwrap();

    assert!(pointer.is_valid());
    assert_eq!(pointer.url(), "file:///new/name.txt");
    assert_eq!(
        recorder.calls(),
        vec![
            (Phase::Before, vec!["file:///old/name.txt".to_string()]),
            (Phase::After, vec!["file:///new/name.txt".to_string()]),
        ]
    );
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn renamed_directory_rebases_descendant_urls() {
    let fx = Fixture::new();
    fx.local.create_dirs("/src/pkg").unwrap();
    let file = fx.local.create_file("/src/pkg/A.txt").unwrap();
    let pointer = fx.registry.create_pointer(&file, None, None, false).unwrap();
    let waiting = fx
        .registry
        .create_pointer("file:///src/pkg/B.txt", None, None, false)
        .unwrap();

    let pkg = fx.local.find("/src/pkg").unwrap();
    fx.local.rename(&pkg, "lib").unwrap();

    assert_eq!(pointer.url(), "file:///src/lib/A.txt");
    assert!(pointer.is_valid());
    assert_eq!(waiting.url(), "file:///src/lib/B.txt");
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn disposing_last_pointer_prunes_empty_chain() {
    let fx = Fixture::new();
    let keep = fx.registry.create_pointer("file:///x/keep", None, None, false).unwrap();
    let pointer = fx.registry.create_pointer("file:///a/b/c.txt", None, None, false).unwrap();
    // namespace root, x, keep, a, b, c.txt
    assert_eq!(fx.registry.node_count(), 6);

    pointer.dispose().unwrap();
    assert_eq!(fx.registry.node_count(), 3);
    fx.registry.assert_consistency().unwrap();

    keep.dispose().unwrap();
    assert_eq!(fx.registry.node_count(), 0);
}

#[test]
fn double_dispose_is_an_error() {
    let fx = Fixture::new();
    let pointer = fx.registry.create_pointer("file:///a", None, None, false).unwrap();
    pointer.dispose().unwrap();
    assert!(!pointer.is_valid());
    assert!(matches!(pointer.dispose(), Err(PointerError::AlreadyDisposed(_))));
    assert!(matches!(pointer.try_url(), Err(PointerError::Disposed(_))));
    assert_eq!(pointer.url(), "");
    assert!(pointer.file().is_none());
}

#[test]
fn url_round_trips_to_the_same_pointer() {
    let fx = Fixture::new();
    fx.local.create_dirs("/a/b").unwrap();
    let entry = fx.jar_entry("/a/b/lib.jar", "pkg/C.class");
    let urls = [
        "file:///a/b".to_string(),
        "file:///a/b/missing/x.txt".to_string(),
        "jar:///a/b/lib.jar!/pkg/C.class".to_string(),
        "temp:///scratch/t.txt".to_string(),
    ];
    for url in &urls {
        let pointer = fx.registry.create_pointer(url.as_str(), None, None, false).unwrap();
        let again = fx.registry.create_pointer(pointer.url(), None, None, false).unwrap();
        assert_eq!(pointer, again, "{url}");
        assert_eq!(&pointer.url(), url);
    }
    let by_file = fx.registry.create_pointer(&entry, None, None, false).unwrap();
    assert_eq!(by_file.url(), "jar:///a/b/lib.jar!/pkg/C.class");
    assert!(by_file.is_valid());
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn archive_pointer_resolves_once_archive_is_mounted() {
    let fx = Fixture::new();
    let pointer = fx
        .registry
        .create_pointer("jar:///libs/x.jar!/META-INF/MANIFEST.MF", None, None, false)
        .unwrap();
    assert!(!pointer.is_valid());

    let entry = fx.jar_entry("/libs/x.jar", "META-INF/MANIFEST.MF");
    assert!(pointer.is_valid());
    assert!(crate::vfs::same_file(
        pointer.file().unwrap().as_ref(),
        entry.as_ref()
    ));
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn deleting_archive_host_invalidates_entries() {
    let fx = Fixture::new();
    let entry = fx.jar_entry("/libs/x.jar", "a/B.class");
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let pointer = fx
        .registry
        .create_pointer(&entry, None, Some(listener), false)
        .unwrap();
    assert!(pointer.is_valid());

    fx.local.delete(&fx.local.find("/libs/x.jar").unwrap()).unwrap();
    assert!(!pointer.is_valid());
    assert_eq!(pointer.url(), "jar:///libs/x.jar!/a/B.class");
    assert_eq!(recorder.afters(), vec![vec!["jar:///libs/x.jar!/a/B.class".to_string()]]);
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn temp_pointers_live_in_the_ephemeral_trie() {
    let fx = Fixture::new();
    let temp = fx.registry.create_pointer("temp:///t/a.txt", None, None, false).unwrap();
    let local = fx.registry.create_pointer("file:///t/a.txt", None, None, false).unwrap();
    assert_ne!(temp, local);
    let families: Vec<_> = fx
        .registry
        .dump_all_pointers()
        .into_iter()
        .map(|info| info.family)
        .collect();
    assert_eq!(
        families,
        vec![Some(TrieFamily::Ephemeral), Some(TrieFamily::Persistent)]
    );

    fx.temp.create_dirs("/t").unwrap();
    fx.temp.create_file("/t/a.txt").unwrap();
    assert!(temp.is_valid());
    assert!(!local.is_valid());
}

#[test]
fn unsupported_protocol_gets_identity_pointer() {
    let fx = Fixture::new();
    let recorder = RecordingListener::new();
    let _subscription = fx.registry.subscribe(recorder.clone());
    let a = fx
        .registry
        .create_pointer("http://example.com/x", None, None, false)
        .unwrap();
    let b = fx
        .registry
        .create_pointer("http://example.com/x", None, None, false)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.url(), "http://example.com/x");
    assert!(!a.is_valid());
    assert_eq!(fx.registry.node_count(), 0);
    assert_eq!(fx.registry.dump_all_pointers()[0].family, None);

    fx.local.create_file("/x").unwrap();
    assert!(recorder.calls().is_empty());

    a.dispose().unwrap();
    b.dispose().unwrap();
    assert!(a.dispose().is_err());
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn malformed_urls_are_rejected() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.registry.create_pointer("file://relative/x", None, None, false),
        Err(PointerError::MalformedUrl(_))
    ));
    assert!(matches!(
        fx.registry.create_pointer("jar:///libs/x.jar", None, None, false),
        Err(PointerError::MalformedUrl(_))
    ));
    assert_eq!(fx.registry.pointer_count(), 0);
    assert_eq!(fx.registry.node_count(), 0);
}

#[test]
fn one_notification_pair_per_batch() {
    let fx = Fixture::new();
    let dir = fx.local.create_dirs("/d").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let _dir = fx
        .registry
        .create_pointer("file:///d", None, Some(listener), true)
        .unwrap();
    let _file = fx
        .registry
        .create_pointer("file:///d/f.txt", None, Some(listener), false)
        .unwrap();

    fx.local
        .apply(vec![
            FileEvent::Create {
                parent: dir.clone(),
                name: "f.txt".to_string(),
                is_directory: false,
            },
            FileEvent::Create {
                parent: dir,
                name: "g.txt".to_string(),
                is_directory: false,
            },
        ])
        .unwrap();

    let expected = vec!["file:///d".to_string(), "file:///d/f.txt".to_string()];
    assert_eq!(
        recorder.calls(),
        vec![(Phase::Before, expected.clone()), (Phase::After, expected)]
    );
}

#[test]
fn subscribers_see_every_change_until_dropped() {
    let fx = Fixture::new();
    let recorder = RecordingListener::new();
    let subscription = fx.registry.subscribe(recorder.clone());
    let _a = fx.registry.create_pointer("file:///a", None, None, false).unwrap();
    let _b = fx.registry.create_pointer("temp:///b", None, None, false).unwrap();

    fx.local.create_dir("/a").unwrap();
    fx.temp.create_dir("/b").unwrap();
    assert_eq!(
        recorder.afters(),
        vec![vec!["file:///a".to_string()], vec!["temp:///b".to_string()]]
    );

    drop(subscription);
    recorder.clear();
    fx.local.delete(&fx.local.find("/a").unwrap()).unwrap();
    assert!(recorder.calls().is_empty());
}

#[test]
fn unregistered_listener_is_not_called() {
    let fx = Fixture::new();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let pointer = fx
        .registry
        .create_pointer("file:///a", None, Some(listener), false)
        .unwrap();
    assert!(fx.registry.unregister_listener(listener));
    assert!(!fx.registry.unregister_listener(listener));

    fx.local.create_dir("/a").unwrap();
    assert!(pointer.is_valid());
    assert!(recorder.calls().is_empty());
}

#[test]
fn modification_count_moves_once_per_round() {
    let fx = Fixture::new();
    let _pointer = fx.registry.create_pointer("file:///a/b", None, None, false).unwrap();
    let before = fx.registry.modification_count();

    fx.local.create_dir("/unrelated").unwrap();
    assert_eq!(fx.registry.modification_count(), before);

    fx.local.create_dir("/a").unwrap();
    assert_eq!(fx.registry.modification_count(), before + 1);
}

#[test]
fn pointers_created_mid_batch_are_recollected() {
    let fx = Fixture::new();
    let dir = fx.local.create_dirs("/d").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let events = [FileEvent::Create {
        parent: dir,
        name: "late.txt".to_string(),
        is_directory: false,
    }];

    let late = fx.registry.process_batch(&events, || {
        fx.registry
            .create_pointer("file:///d/late.txt", None, Some(listener), false)
            .unwrap()
    });

    assert_eq!(
        recorder.calls(),
        vec![
            (Phase::Before, vec!["file:///d/late.txt".to_string()]),
            (Phase::After, vec!["file:///d/late.txt".to_string()]),
        ]
    );
    assert!(!late.is_valid());
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn nested_batches_keep_their_own_plans() {
    let fx = Fixture::new();
    let dir = fx.local.create_dirs("/d").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let outer = fx
        .registry
        .create_pointer("file:///d/outer", None, Some(listener), false)
        .unwrap();
    let inner = fx
        .registry
        .create_pointer("file:///d/inner", None, Some(listener), false)
        .unwrap();
    let events = [FileEvent::Create {
        parent: dir,
        name: "outer".to_string(),
        is_directory: true,
    }];

    fx.registry.process_batch(&events, || {
        fx.local.create_dir("/d/inner").unwrap();
        assert!(inner.is_valid());
    });

    assert!(!outer.is_valid());
    assert_eq!(
        recorder.calls(),
        vec![
            (Phase::Before, vec!["file:///d/outer".to_string()]),
            (Phase::Before, vec!["file:///d/inner".to_string()]),
            (Phase::After, vec!["file:///d/inner".to_string()]),
            (Phase::After, vec!["file:///d/outer".to_string()]),
        ]
    );
}

#[test]
fn after_without_before_still_notifies() {
    let fx = Fixture::new();
    let dir = fx.local.create_dirs("/d").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let _pointer = fx
        .registry
        .create_pointer("file:///d/x", None, Some(listener), false)
        .unwrap();

    let events = [FileEvent::Create {
        parent: dir,
        name: "x".to_string(),
        is_directory: false,
    }];
    fx.registry.event_listener().after(&events);
    assert_eq!(
        recorder.calls(),
        vec![
            (Phase::Before, vec!["file:///d/x".to_string()]),
            (Phase::After, vec!["file:///d/x".to_string()]),
        ]
    );
}

#[test]
fn scope_release_keeps_shared_pointers_alive() {
    let fx = Fixture::new();
    let scope = fx.registry.scope();
    let scoped = fx
        .registry
        .create_pointer("file:///a", Some(&scope), None, false)
        .unwrap();
    let again = fx
        .registry
        .create_pointer("file:///a", Some(&scope), None, false)
        .unwrap();
    let outside = fx.registry.create_pointer("file:///a", None, None, false).unwrap();
    let only_scoped = fx
        .registry
        .create_pointer("file:///b", Some(&scope), None, false)
        .unwrap();
    assert_eq!(scoped, again);
    assert_eq!(scope.len(), 2);
    assert!(scope.holds(&outside));

    scope.release().unwrap();
    assert!(!outside.is_disposed());
    assert!(only_scoped.is_disposed());
    assert_eq!(fx.registry.dump_all_pointers()[0].refcount, 1);
}

#[test]
fn dropping_scope_releases_its_references() {
    let fx = Fixture::new();
    let pointer = {
        let scope = fx.registry.scope();
        fx.registry
            .create_pointer("file:///gone", Some(&scope), None, false)
            .unwrap()
    };
    assert!(pointer.is_disposed());
    assert_eq!(fx.registry.node_count(), 0);
}

#[test]
fn scope_of_another_registry_is_rejected() {
    let fx = Fixture::new();
    let other = Fixture::new();
    let scope = other.registry.scope();
    assert!(matches!(
        fx.registry.create_pointer("file:///a", Some(&scope), None, false),
        Err(PointerError::Internal(_))
    ));
}

#[test]
fn duplicate_pointer_adds_listener_reference() {
    let fx = Fixture::new();
    let listener = fx.registry.register_listener(RecordingListener::new());
    let source = fx.registry.create_pointer("file:///a", None, None, true).unwrap();
    let copy = fx.registry.duplicate_pointer(&source, None, Some(listener)).unwrap();
    assert_ne!(source, copy);
    assert_eq!(copy.listener(), Some(listener));
    assert!(copy.is_recursive());
    assert_eq!(copy.url(), source.url());

    source.dispose().unwrap();
    assert!(matches!(
        fx.registry.duplicate_pointer(&source, None, None),
        Err(PointerError::Disposed(_))
    ));
    assert!(!copy.is_disposed());
}

#[test]
fn replacing_a_namespace_demotes_then_resolves() {
    let fx = Fixture::new();
    fx.local.create_dirs("/a").unwrap();
    let pointer = fx.registry.create_pointer("file:///a", None, None, false).unwrap();
    assert!(pointer.is_valid());

    let replacement = crate::vfs::MemoryFs::local();
    fx.registry
        .register_namespace(Arc::new(replacement.clone()))
        .unwrap();
    assert!(!pointer.is_valid());

    replacement.add_listener(fx.registry.event_listener());
    replacement.create_dir("/a").unwrap();
    assert!(pointer.is_valid());
    assert!(crate::vfs::same_file(
        pointer.file().unwrap().as_ref(),
        replacement.find("/a").unwrap().as_ref()
    ));
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn demote_namespace_keeps_urls() {
    let fx = Fixture::new();
    fx.local.create_dirs("/a/b").unwrap();
    let pointer = fx.registry.create_pointer("file:///a/b", None, None, false).unwrap();
    let count = fx.registry.modification_count();

    assert!(fx.registry.demote_namespace("file") > 0);
    assert!(!pointer.is_valid());
    assert_eq!(pointer.url(), "file:///a/b");
    assert_eq!(fx.registry.modification_count(), count + 1);

    assert!(fx.registry.resolve_all() > 0);
    assert!(pointer.is_valid());
    fx.registry.assert_consistency().unwrap();
}

#[test]
fn presentable_url_and_file_name() {
    let fx = Fixture::new();
    let pointer = fx
        .registry
        .create_pointer("file:///a/b/c.txt", None, None, false)
        .unwrap();
    assert_eq!(pointer.file_name(), "c.txt");
    assert_eq!(pointer.presentable_url(), "/a/b/c.txt");
}

#[test]
fn cancelled_consistency_walk_reports_unfinished() {
    let fx = Fixture::new();
    let _pointer = fx.registry.create_pointer("file:///a", None, None, false).unwrap();
    let tracker = crate::cancel::WalkVersionTracker::new();
    let token = tracker.token_for_version(tracker.next_version());
    assert_eq!(fx.registry.check_consistency(&token), Ok(true));
    tracker.next_version();
    assert_eq!(fx.registry.check_consistency(&token), Ok(false));
}

#[test]
fn moving_onto_waiting_pointer_leaves_one_pointer() {
    let fx = Fixture::new();
    fx.local.create_dirs("/old").unwrap();
    let target = fx.local.create_dirs("/new").unwrap();
    let file = fx.local.create_file("/old/name.txt").unwrap();
    let moved = fx.registry.create_pointer(&file, None, None, false).unwrap();
    let waiting = fx
        .registry
        .create_pointer("file:///new/name.txt", None, None, true)
        .unwrap();

    fx.local.move_to(&file, &target).unwrap();
    let third = fx
        .registry
        .create_pointer("file:///new/name.txt", None, None, false)
        .unwrap();
    fx.registry.assert_consistency().unwrap();

    let infos = fx.registry.dump_all_pointers();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].url, "file:///new/name.txt");
    assert_eq!(infos[0].refcount, 3);
    assert!(infos[0].recursive);
    assert!(moved.is_valid());
    assert!(waiting.is_recursive());
    assert_eq!(third.url(), moved.url());

    moved.dispose().unwrap();
    waiting.dispose().unwrap();
    assert!(!third.is_disposed());
    third.dispose().unwrap();
    assert!(matches!(moved.dispose(), Err(PointerError::AlreadyDisposed(_))));
    assert_eq!(fx.registry.pointer_count(), 0);
    assert_eq!(fx.registry.node_count(), 0);
}

#[test]
fn overlapping_batches_of_two_namespaces_keep_their_plans() {
    let fx = Fixture::new();
    let local_dir = fx.local.create_dirs("/d").unwrap();
    let temp_dir = fx.temp.create_dirs("/t").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let _local = fx
        .registry
        .create_pointer("file:///d/a", None, Some(listener), false)
        .unwrap();
    let _temp = fx
        .registry
        .create_pointer("temp:///t/b", None, Some(listener), false)
        .unwrap();
    let local_events = [FileEvent::Create {
        parent: local_dir,
        name: "a".to_string(),
        is_directory: false,
    }];
    let temp_events = [FileEvent::Create {
        parent: temp_dir,
        name: "b".to_string(),
        is_directory: false,
    }];
    let events = fx.registry.event_listener();

    events.before(&local_events);
    events.before(&temp_events);
    assert_eq!(
        recorder.befores(),
        vec![vec!["file:///d/a".to_string()], vec!["temp:///t/b".to_string()]]
    );

    events.after(&local_events);
    assert_eq!(recorder.afters(), vec![vec!["file:///d/a".to_string()]]);
    events.after(&temp_events);
    assert_eq!(
        recorder.afters(),
        vec![vec!["file:///d/a".to_string()], vec!["temp:///t/b".to_string()]]
    );
}

#[test]
fn case_only_rename_updates_url() {
    let fx = Fixture::with_local(MemoryFs::new_case_insensitive("file", NamespaceKind::Persistent));
    fx.local.create_dirs("/dir").unwrap();
    let file = fx.local.create_file("/dir/x.txt").unwrap();
    let recorder = RecordingListener::new();
    let listener = fx.registry.register_listener(recorder.clone());
    let pointer = fx.registry.create_pointer(&file, None, Some(listener), false).unwrap();

    fx.local.rename(&file, "X.txt").unwrap();
    assert_eq!(pointer.url(), "file:///dir/X.txt");
    assert!(pointer.is_valid());
    assert_eq!(recorder.afters(), vec![vec!["file:///dir/X.txt".to_string()]]);
    fx.registry.assert_consistency().unwrap();
}
