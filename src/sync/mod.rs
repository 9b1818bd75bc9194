//! One-way synchronization.
//!
//! This module provides content hashing, the tree reconciler that mirrors
//! a source directory onto a replica, and the periodic scheduler that
//! drives it.

pub mod engine;
pub mod error;
pub mod hash;
pub mod scheduler;

pub use engine::{CycleReport, Failure, Mutation, MutationKind, Reconciler};
pub use error::{SyncError, SyncOp};
pub use hash::{digest_bytes, digest_file, try_digest_file, Digest};
pub use scheduler::{CycleGuard, Scheduler};
