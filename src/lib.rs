// Library module for foldsync
// Re-exports modules for use in integration tests and the binary

pub mod config;
pub mod fs;
pub mod journal;
pub mod logging;
pub mod sync;

pub use config::{Cli, Config};
pub use journal::{EventSink, Journal, LogEvent, MemorySink};
pub use sync::{CycleReport, Reconciler, Scheduler};
