//! Append-only event log.
//!
//! Every mutation applied by a cycle becomes one [`LogEvent`]. The
//! [`Journal`] appends it to the log file as
//! `[<timestamp>] [to <user>]: <message>`, echoes it to the console and
//! publishes it to any live subscribers.

use chrono::{DateTime, Local};
use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;

const STATUS_CHANNEL_CAPACITY: usize = 256;

/// Receives the log messages produced by a cycle, in the order the
/// corresponding mutations were applied.
pub trait EventSink: Send + Sync {
    fn record(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub user: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            user: user.into(),
            message: message.into(),
        }
    }

    /// Line written to the log file, without trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] [to {}]: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.user,
            self.message
        )
    }
}

/// Name of the user running the process.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Log file writer plus console echo and live status stream.
pub struct Journal {
    path: PathBuf,
    user: String,
    echo: bool,
    status: broadcast::Sender<LogEvent>,
    // Serializes appends so concurrent writers never interleave within a line
    write_lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        let (status, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            user: user.into(),
            echo: true,
            status,
            write_lock: Mutex::new(()),
        }
    }

    /// Disable the console echo (the file and the status stream still receive events).
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Subscribe to the live status stream.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.status.subscribe()
    }

    /// Record one event. Log-file failures are reported on the console only.
    pub fn log(&self, message: &str) -> LogEvent {
        let event = LogEvent::new(self.user.as_str(), message);

        if self.echo {
            println!("{}", message);
        }

        if let Err(e) = self.append(&event) {
            eprintln!("{} {}", "Error writing to log file:".red(), e);
        }

        // No subscribers is fine
        let _ = self.status.send(event.clone());
        event
    }

    fn append(&self, event: &LogEvent) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", event.to_line())
    }
}

impl EventSink for Journal {
    fn record(&self, message: &str) {
        self.log(message);
    }
}

/// Sink that keeps messages in memory, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.messages().iter().filter(|m| m.starts_with(prefix)).count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, message: &str) {
        let mut messages = self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        messages.push(message.to_string());
    }
}
