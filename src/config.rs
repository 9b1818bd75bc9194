//! Startup configuration.
//!
//! Built once from the command line and handed to the scheduler by `Arc`.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::error::SyncError;

/// Periodic one-way folder mirroring.
#[derive(Parser, Debug, Clone)]
#[command(name = "foldsync", version, about)]
pub struct Cli {
    /// Directory to mirror from
    pub source: PathBuf,

    /// Directory kept identical to the source
    pub replica: PathBuf,

    /// Append-only log file
    pub log_file: PathBuf,

    /// Seconds between synchronization cycles
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
}

impl Config {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        interval: Duration,
    ) -> Result<Self, SyncError> {
        let config = Self {
            source: source.into(),
            replica: replica.into(),
            log_file: log_file.into(),
            interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_cli(cli: Cli) -> Result<Self, SyncError> {
        Self::new(cli.source, cli.replica, cli.log_file, Duration::from_secs(cli.interval))
    }

    fn validate(&self) -> Result<(), SyncError> {
        if self.interval.is_zero() {
            return Err(SyncError::InvalidConfig {
                message: "interval must be at least one second".to_string(),
            });
        }
        if same_location(&self.source, &self.replica) {
            return Err(SyncError::InvalidConfig {
                message: format!(
                    "source and replica are the same directory: {}",
                    self.source.display()
                ),
            });
        }
        Ok(())
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
