//! Periodic trigger for reconciliation cycles.
//!
//! A tick starts a cycle on the blocking pool unless the previous cycle is
//! still running, in which case the tick is skipped. Cycles are never
//! cancelled: shutdown waits for the one in flight.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::journal::Journal;
use crate::sync::engine::{CycleReport, Reconciler};

/// Holds the in-flight flag for the lifetime of one cycle.
#[derive(Debug)]
pub struct CycleGuard {
    busy: Arc<AtomicBool>,
}

impl CycleGuard {
    /// Claim the flag. Returns None if a cycle is already running.
    pub fn try_acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy: Arc::clone(busy) })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    config: Arc<Config>,
    journal: Arc<Journal>,
    busy: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: Arc<Config>, journal: Arc<Journal>) -> Self {
        Self {
            config,
            journal,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a cycle is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a cycle now unless one is already running.
    pub fn trigger(&self) -> Option<JoinHandle<CycleReport>> {
        let Some(guard) = CycleGuard::try_acquire(&self.busy) else {
            tracing::info!("Previous cycle still running, skipping this tick");
            return None;
        };

        let config = Arc::clone(&self.config);
        let journal = Arc::clone(&self.journal);

        Some(tokio::task::spawn_blocking(move || {
            let _guard = guard;
            println!(
                "{} {}",
                "Synchronization is up to date at".green(),
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            Reconciler::new(journal.as_ref()).reconcile(&config.source, &config.replica)
        }))
    }

    /// Tick until `shutdown` turns true (or its sender is dropped).
    /// The first cycle starts one interval after this is called.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<CycleReport>> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(handle) = self.trigger() {
                        if let Some(previous) = in_flight.replace(handle) {
                            // Guard was free, so the previous cycle has already finished
                            finish_cycle(previous).await;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            handle.await.context("synchronization cycle panicked")?;
        }
        Ok(())
    }
}

/// Collect a finished cycle, logging it if the cycle panicked.
async fn finish_cycle(handle: JoinHandle<CycleReport>) -> Option<CycleReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!("Synchronization cycle panicked: {}", e);
            None
        }
    }
}
