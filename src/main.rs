use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use foldsync::journal::current_user;
use foldsync::{logging, Cli, Config, Journal, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Exits with usage on a missing argument or a malformed interval
    let cli = Cli::parse();

    if let Err(err) = logging::init() {
        eprintln!("Warning: diagnostics logging unavailable: {}", err);
    }

    let config = Arc::new(Config::from_cli(cli).context("Invalid arguments")?);
    let journal = Arc::new(Journal::new(&config.log_file, current_user()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(Arc::clone(&config), journal);
    let worker = tokio::spawn(scheduler.run(shutdown_rx));

    println!(
        "{} Mirroring {} -> {} every {} seconds. Press [Enter] to exit.",
        "Synchronization started.".green().bold(),
        config.source.display(),
        config.replica.display(),
        config.interval.as_secs()
    );

    wait_for_enter().await?;

    let _ = shutdown_tx.send(true);
    worker.await.context("scheduler task panicked")??;
    Ok(())
}

/// Block until one line (or EOF) arrives on stdin.
async fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    Ok(())
}
