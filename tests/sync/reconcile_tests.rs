// Tests for the tree reconciler
// Each test builds real trees in a temp directory and runs one or more cycles

use super::common::Fixture;
use foldsync::sync::{MutationKind, Reconciler, SyncError, SyncOp};
use foldsync::{Journal, MemorySink};
use std::fs;

#[test]
fn test_copies_new_tree_into_empty_replica() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    fx.write_source("sub/b.txt", "world");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(fx.read_replica("a.txt"), "hello");
    assert_eq!(fx.read_replica("sub/b.txt"), "world");
    assert_eq!(report.count(MutationKind::CreatedDirectory), 1);
    assert_eq!(report.count(MutationKind::Copied), 2);

    // The directory exists before anything inside it is copied
    let messages = sink.messages();
    assert!(messages[0].starts_with("Created directory: "));
    assert!(messages[0].ends_with("sub"));
    assert_eq!(sink.count_prefix("Copied: "), 2);
    fx.assert_converged();
}

#[test]
fn test_stale_file_deleted_and_identical_file_untouched() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    fx.write_replica("a.txt", "hello");
    fx.write_replica("stale.txt", "x");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert!(report.is_clean());
    assert_eq!(report.mutations.len(), 1);
    assert_eq!(report.count(MutationKind::DeletedFile), 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(sink.count_prefix("Copied: "), 0);
    assert_eq!(sink.count_prefix("Deleted: "), 1);
    assert!(!fx.replica.join("stale.txt").exists());
    assert_eq!(fx.read_replica("a.txt"), "hello");
}

#[test]
fn test_changed_file_is_overwritten() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "v2");
    fx.write_replica("a.txt", "v1");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert_eq!(report.mutations.len(), 1);
    assert_eq!(report.count(MutationKind::Copied), 1);
    assert_eq!(sink.count_prefix("Copied: "), 1);
    assert_eq!(fx.read_replica("a.txt"), "v2");
}

#[test]
fn test_same_size_different_content_is_copied() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "abcd");
    fx.write_replica("a.txt", "abce");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert_eq!(report.count(MutationKind::Copied), 1);
    assert_eq!(fx.read_replica("a.txt"), "abcd");
}

#[test]
fn test_second_cycle_is_a_noop() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    fx.write_source("sub/deeper/b.txt", "world");
    fs::create_dir_all(fx.source.join("empty")).unwrap();
    fx.write_replica("junk/old.txt", "x");

    let sink = MemorySink::new();
    let reconciler = Reconciler::new(&sink);
    let first = reconciler.reconcile(&fx.source, &fx.replica);
    assert!(!first.is_noop());

    let logged_after_first = sink.messages().len();
    let second = reconciler.reconcile(&fx.source, &fx.replica);

    assert!(second.is_noop(), "{:?}", second.mutations);
    assert!(second.is_clean());
    assert_eq!(second.unchanged, 2);
    assert_eq!(sink.messages().len(), logged_after_first);
}

#[test]
fn test_converges_on_mixed_tree() {
    let fx = Fixture::new();
    fx.write_source("keep.txt", "same");
    fx.write_source("changed.txt", "new");
    fx.write_source("nested/a/b/c.txt", "deep");
    fx.write_source(".hidden/config", "dot");
    fs::create_dir_all(fx.source.join("empty/dir")).unwrap();

    fx.write_replica("keep.txt", "same");
    fx.write_replica("changed.txt", "old");
    fx.write_replica("gone.txt", "bye");
    fx.write_replica("orphan/inner/file.bin", "zzz");
    fs::create_dir_all(fx.replica.join("orphan/empty")).unwrap();

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert!(report.is_clean(), "{:?}", report.failures);
    fx.assert_converged();
    assert!(!fx.replica.join("orphan").exists());
    assert_eq!(report.count(MutationKind::DeletedDirectory), 1);
}

#[test]
fn test_mutations_logged_in_pass_order() {
    let fx = Fixture::new();
    fx.write_source("dir/new.txt", "n");
    fx.write_replica("old/old.txt", "o");

    let sink = MemorySink::new();
    Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    let kinds: Vec<_> = sink
        .messages()
        .iter()
        .map(|m| m.split(':').next().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["Created directory", "Copied", "Deleted", "Deleted directory"]);
}

#[test]
fn test_replica_only_empty_directory_is_removed() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "a");
    fs::create_dir_all(fx.replica.join("extra")).unwrap();

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert_eq!(report.count(MutationKind::DeletedDirectory), 1);
    assert!(!fx.replica.join("extra").exists());
    fx.assert_converged();
}

#[test]
fn test_roots_may_be_named_arbitrarily() {
    let fx = Fixture::new();
    fx.write_source("x/y.txt", "y");
    let other_replica = fx.replica.with_file_name("a completely different name");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &other_replica);

    assert!(report.is_clean());
    assert_eq!(fs::read_to_string(other_replica.join("x").join("y.txt")).unwrap(), "y");
}

#[test]
fn test_kind_conflict_settles_over_two_cycles() {
    let fx = Fixture::new();
    // Source has a directory where the replica has a file
    fx.write_source("thing/inner.txt", "inner");
    fx.write_replica("thing", "i am a file");

    let sink = MemorySink::new();
    let reconciler = Reconciler::new(&sink);
    let first = reconciler.reconcile(&fx.source, &fx.replica);

    // The conflicting file is removed, but the directory could not be created
    assert!(!first.is_clean());
    assert_eq!(first.count(MutationKind::DeletedFile), 1);

    let second = reconciler.reconcile(&fx.source, &fx.replica);
    assert!(second.is_clean(), "{:?}", second.failures);
    fx.assert_converged();
}

#[test]
fn test_events_reach_the_log_file() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    fx.write_source("sub/b.txt", "world");

    let journal = Journal::new(&fx.log_file, "tester").quiet();
    Reconciler::new(&journal).reconcile(&fx.source, &fx.replica);

    let log = fs::read_to_string(&fx.log_file).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.contains("] [to tester]: ")));
    assert!(lines[0].contains("Created directory: "));
    assert!(log.contains("a.txt"));
    assert!(log.contains("b.txt"));
}

#[test]
fn test_unwritable_replica_root_is_reported() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "a");
    // A regular file where the replica root should be
    fs::write(&fx.replica, b"not a directory").unwrap();

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].op, SyncOp::CreateRoot);
    assert!(report.is_noop());
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_file_does_not_block_others() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    fx.write_source("good1.txt", "one");
    fx.write_source("locked.txt", "secret");
    fx.write_source("sub/good2.txt", "two");

    let locked = fx.source.join("locked.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&locked).is_ok() {
        // Permission bits are not enforced (running as root)
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(fx.read_replica("good1.txt"), "one");
    assert_eq!(fx.read_replica("sub/good2.txt"), "two");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "locked.txt");
    assert_eq!(report.failures[0].op, SyncOp::Copy);
    assert_eq!(sink.count_prefix("Error: "), 1);

    // Readable again: the next cycle picks it up
    let next = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    assert!(next.is_clean());
    fx.assert_converged();
}

#[test]
fn test_directory_in_place_of_file_does_not_block_others() {
    let fx = Fixture::new();
    fx.write_source("blocked.txt", "wanted");
    fx.write_source("good.txt", "one");
    fx.write_source("sub/other.txt", "two");
    fx.write_replica("blocked.txt/inner.txt", "in the way");

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);

    assert_eq!(fx.read_replica("good.txt"), "one");
    assert_eq!(fx.read_replica("sub/other.txt"), "two");
    assert_eq!(report.failures.len(), 1, "{:?}", report.failures);

    let failure = &report.failures[0];
    assert_eq!(failure.path, "blocked.txt");
    assert_eq!(failure.op, SyncOp::Copy);
    assert!(matches!(failure.error, SyncError::Copy { .. }));
    assert_eq!(failure.error.path(), Some(fx.replica.join("blocked.txt").as_path()));
    assert_eq!(sink.count_prefix("Error: "), 1);

    // The directory pass clears the way in the same cycle
    assert_eq!(report.count(MutationKind::DeletedDirectory), 1);
    assert!(!fx.replica.join("blocked.txt").exists());

    let next = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    assert!(next.is_clean(), "{:?}", next.failures);
    assert_eq!(fx.read_replica("blocked.txt"), "wanted");
    fx.assert_converged();
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_subtree_keeps_replica_content() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    fx.write_source("open.txt", "o");
    fx.write_source("private/precious.txt", "keep me");

    let sink = MemorySink::new();
    assert!(Reconciler::new(&sink).reconcile(&fx.source, &fx.replica).is_clean());

    let private = fx.source.join("private");
    fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&private).is_ok() {
        // Permission bits are not enforced (running as root)
        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(fx.read_replica("private/precious.txt"), "keep me");
    assert_eq!(fx.read_replica("open.txt"), "o");
    assert_eq!(report.count(MutationKind::DeletedFile), 0);
    assert_eq!(report.count(MutationKind::DeletedDirectory), 0);
    assert!(report
        .failures
        .iter()
        .any(|f| f.path == "private" && f.op == SyncOp::Enumerate));
    assert!(sink.count_prefix("Error: ") >= 1);

    let next = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    assert!(next.is_clean(), "{:?}", next.failures);
    fx.assert_converged();
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_root_keeps_replica() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    fx.write_source("a.txt", "a");
    fx.write_source("sub/b.txt", "b");

    let sink = MemorySink::new();
    assert!(Reconciler::new(&sink).reconcile(&fx.source, &fx.replica).is_clean());

    fs::set_permissions(&fx.source, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&fx.source).is_ok() {
        fs::set_permissions(&fx.source, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let sink = MemorySink::new();
    let report = Reconciler::new(&sink).reconcile(&fx.source, &fx.replica);
    fs::set_permissions(&fx.source, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(report.is_noop(), "{:?}", report.mutations);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].op, SyncOp::Enumerate);
    assert_eq!(sink.count_prefix("Error: "), 1);
    assert_eq!(fx.read_replica("a.txt"), "a");
    assert_eq!(fx.read_replica("sub/b.txt"), "b");
}
