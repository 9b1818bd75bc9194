//! Tree reconciler for one-way mirroring.
//!
//! One call to [`Reconciler::reconcile`] is one cycle: both trees are
//! enumerated from scratch, then the replica is brought in line with the
//! source in four passes (create directories, copy changed files, delete
//! extra files, delete extra directories). Every applied mutation is
//! reported to the [`EventSink`] in the order it happened. A failing path
//! is recorded and skipped; nothing is rolled back and the next cycle
//! retries whatever is still out of date.

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::fs::path_utils::{ancestors, join_relative};
use crate::fs::{LocalFs, TreeSnapshot};
use crate::journal::EventSink;
use crate::sync::error::{SyncError, SyncOp};
use crate::sync::hash::digest_file;

/// Kind of change applied to the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreatedDirectory,
    Copied,
    DeletedFile,
    DeletedDirectory,
}

/// A change applied to the replica, keyed by relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreatedDirectory { path: String },
    Copied { path: String, bytes: u64 },
    DeletedFile { path: String },
    DeletedDirectory { path: String },
}

impl Mutation {
    pub fn path(&self) -> &str {
        match self {
            Self::CreatedDirectory { path } => path,
            Self::Copied { path, .. } => path,
            Self::DeletedFile { path } => path,
            Self::DeletedDirectory { path } => path,
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Self::CreatedDirectory { .. } => MutationKind::CreatedDirectory,
            Self::Copied { .. } => MutationKind::Copied,
            Self::DeletedFile { .. } => MutationKind::DeletedFile,
            Self::DeletedDirectory { .. } => MutationKind::DeletedDirectory,
        }
    }
}

/// A path that could not be reconciled this cycle.
#[derive(Debug)]
pub struct Failure {
    /// Relative path, empty when the failure concerns a root.
    pub path: String,
    pub op: SyncOp,
    pub error: SyncError,
}

/// Outcome of one cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    pub mutations: Vec<Mutation>,
    pub failures: Vec<Failure>,
    /// Source files whose replica copy already had identical content.
    pub unchanged: usize,
    pub duration: Duration,
}

impl CycleReport {
    fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            mutations: Vec::new(),
            failures: Vec::new(),
            unchanged: 0,
            duration: Duration::ZERO,
        }
    }

    /// No failures were recorded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// No mutation was needed.
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn count(&self, kind: MutationKind) -> usize {
        self.mutations.iter().filter(|m| m.kind() == kind).count()
    }

    pub fn bytes_copied(&self) -> u64 {
        self.mutations
            .iter()
            .map(|m| match m {
                Mutation::Copied { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} dirs created, {} copied ({}), {} deleted, {} dirs deleted, {} unchanged, {} failed in {} ms",
            self.count(MutationKind::CreatedDirectory),
            self.count(MutationKind::Copied),
            humansize::format_size(self.bytes_copied(), humansize::DECIMAL),
            self.count(MutationKind::DeletedFile),
            self.count(MutationKind::DeletedDirectory),
            self.unchanged,
            self.failures.len(),
            self.duration.as_millis()
        )
    }
}

/// Applies one-way reconciliation and reports every change to a sink.
pub struct Reconciler<'a> {
    sink: &'a dyn EventSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self { sink }
    }

    /// Run one cycle. Never fails as a whole; per-path failures are in the report.
    pub fn reconcile(&self, source: &Path, replica: &Path) -> CycleReport {
        let timer = Instant::now();
        let mut report = CycleReport::new(Local::now());

        self.run(source, replica, &mut report);

        report.duration = timer.elapsed();
        tracing::info!("Cycle finished: {}", report.summary());
        report
    }

    fn run(&self, source: &Path, replica: &Path, report: &mut CycleReport) {
        if !replica.is_dir() {
            if let Err(e) = LocalFs::create_dir(replica) {
                self.fail(report, "", SyncOp::CreateRoot, e);
                return;
            }
        }

        // An unreadable source must never be mistaken for an empty one
        let source_tree = match LocalFs::snapshot(source) {
            Ok(tree) => tree,
            Err(e) => {
                self.fail(report, "", SyncOp::Enumerate, e);
                return;
            }
        };
        let replica_tree = match LocalFs::snapshot(replica) {
            Ok(tree) => tree,
            Err(e) => {
                self.fail(report, "", SyncOp::Enumerate, e);
                return;
            }
        };

        self.report_unreadable(report, source, &source_tree);
        self.report_unreadable(report, replica, &replica_tree);

        for dir in &source_tree.directories {
            let target = join_relative(replica, dir);
            if target.is_dir() {
                continue;
            }
            match LocalFs::create_dir(&target) {
                Ok(()) => self.applied(
                    report,
                    Mutation::CreatedDirectory { path: dir.clone() },
                    format!("Created directory: {}", target.display()),
                ),
                Err(e) => self.fail(report, dir, SyncOp::CreateDirectory, e),
            }
        }

        for file in &source_tree.files {
            let source_file = join_relative(source, file);
            let target_file = join_relative(replica, file);

            let source_digest = digest_file(&source_file);
            if target_file.is_file() && source_digest.same_content(&digest_file(&target_file)) {
                report.unchanged += 1;
                continue;
            }

            match LocalFs::copy_file(&source_file, &target_file) {
                Ok(bytes) => self.applied(
                    report,
                    Mutation::Copied { path: file.clone(), bytes },
                    format!("Copied: {} -> {}", source_file.display(), target_file.display()),
                ),
                Err(e) => self.fail(report, file, SyncOp::Copy, e),
            }
        }

        // Whatever sits under an unreadable source entry is unknown, so it is kept
        for file in replica_tree.files.difference(&source_tree.files) {
            if source_tree.is_hidden_by_unreadable(file) {
                continue;
            }
            let target_file = join_relative(replica, file);
            match LocalFs::remove_file(&target_file) {
                Ok(()) => self.applied(
                    report,
                    Mutation::DeletedFile { path: file.clone() },
                    format!("Deleted: {}", target_file.display()),
                ),
                Err(e) => self.fail(report, file, SyncOp::DeleteFile, e),
            }
        }

        // Parents sort before children, so a removed parent is always seen first
        let mut removed: HashSet<&str> = HashSet::new();
        for dir in replica_tree.directories.difference(&source_tree.directories) {
            if ancestors(dir).any(|ancestor| removed.contains(ancestor))
                || source_tree.is_hidden_by_unreadable(dir)
            {
                continue;
            }
            let target = join_relative(replica, dir);
            match LocalFs::remove_dir_all(&target) {
                Ok(()) => {
                    removed.insert(dir.as_str());
                    self.applied(
                        report,
                        Mutation::DeletedDirectory { path: dir.clone() },
                        format!("Deleted directory: {}", target.display()),
                    );
                }
                Err(e) => self.fail(report, dir, SyncOp::DeleteDirectory, e),
            }
        }
    }

    fn report_unreadable(&self, report: &mut CycleReport, root: &Path, tree: &TreeSnapshot) {
        for (path, reason) in &tree.unreadable {
            let error = SyncError::Walk {
                path: join_relative(root, path),
                reason: reason.clone(),
            };
            self.fail(report, path, SyncOp::Enumerate, error);
        }
    }

    fn applied(&self, report: &mut CycleReport, mutation: Mutation, message: String) {
        self.sink.record(&message);
        report.mutations.push(mutation);
    }

    fn fail(&self, report: &mut CycleReport, path: &str, op: SyncOp, error: SyncError) {
        tracing::warn!(path, %op, "{}", error);
        self.sink.record(&format!("Error: {}", error));
        report.failures.push(Failure {
            path: path.to_string(),
            op,
            error,
        });
    }
}
