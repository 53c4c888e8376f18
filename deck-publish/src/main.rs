//! deck-publish - Publish queued content
//!
//! Publishes every eligible queued item for one destination (or a single
//! item by id), one at a time with pacing, printing live status to stderr.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use libpostdeck::confirm::{AssumeYes, ConfirmationGate};
use libpostdeck::logging::LoggingConfig;
use libpostdeck::service::PostdeckService;
use libpostdeck::status::{RunPhase, StatusKind, TimelineReceiver};
use libpostdeck::{BatchSummary, Config, Destination, PostdeckError, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "deck-publish")]
#[command(version)]
#[command(about = "Publish queued content in paced batches")]
#[command(long_about = "\
deck-publish - Publish queued content in paced batches

DESCRIPTION:
    deck-publish sends every queued item that has media and targets the
    chosen destination to the publish endpoint, strictly one at a time.
    A failed item never stops the batch. Between items it waits a short
    pacing delay (longer after a failure).

    Only one run can be active per process; progress is printed to stderr
    and the summary to stdout.

USAGE:
    # Publish the Instagram queue, asking for confirmation first
    deck-publish --destination instagram

    # Publish without asking (scripts, cron)
    deck-publish --yes

    # Publish one item by id
    deck-publish --item <ITEM_ID>

    # Machine-readable summary
    deck-publish --yes --format json

SIGNALS:
    SIGTERM, SIGINT - Stop before the next item and print a partial summary

CONFIGURATION:
    Configuration file: ~/.config/postdeck/config.toml

    [publish]
    endpoint = \"http://localhost:8080\"
    kind = \"post\"            # post | story | highlight

    [pacing]
    success_delay = \"2s\"
    failure_delay = \"3s\"

EXIT CODES:
    0 - Every item published
    1 - One or more items failed, or the run was cancelled
    2 - Configuration or store error
    3 - Invalid input
    4 - Run rejected (nothing eligible, already running, declined)
")]
struct Cli {
    /// Destination whose queue to publish (defaults to the configured one)
    #[arg(short, long)]
    destination: Option<String>,

    /// Publish a single item by id instead of the whole queue
    #[arg(long, value_name = "ITEM_ID", conflicts_with = "destination")]
    item: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    match run(cli).await {
        Ok(summary) if summary.all_succeeded() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<BatchSummary> {
    if cli.format != "text" && cli.format != "json" {
        return Err(PostdeckError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            cli.format
        )));
    }
    let destination = cli
        .destination
        .as_deref()
        .map(|d| d.parse::<Destination>().map_err(PostdeckError::InvalidInput))
        .transpose()?;

    let config = Config::load()?;
    let service = PostdeckService::from_config(config).await?;

    let cancel = CancellationToken::new();
    let prompting = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(cancel.clone(), Arc::clone(&prompting))?;

    let printer = tokio::spawn(print_progress(service.subscribe_timeline()));

    let result = match &cli.item {
        Some(item_id) => service.publish_one(item_id, &cancel).await,
        None => {
            let target = destination.unwrap_or(service.config().defaults.destination);
            let gate: Box<dyn ConfirmationGate> = if cli.yes {
                Box::new(AssumeYes)
            } else {
                Box::new(TerminalPrompt {
                    destination: target,
                    cancel: cancel.clone(),
                    prompting,
                })
            };
            service
                .publish_queue(Some(target), gate.as_ref(), &cancel)
                .await
        }
    };

    match result {
        Ok(summary) => {
            // The printer stops on its own at the terminal status
            let _ = printer.await;
            print_summary(&summary, &cli.format);
            Ok(summary)
        }
        Err(e) => {
            printer.abort();
            Err(e)
        }
    }
}

/// Asks on the terminal; declines when stdin is not a TTY or the run was
/// cancelled
struct TerminalPrompt {
    destination: Destination,
    cancel: CancellationToken,
    /// Set while blocked on the answer so a signal can end the prompt
    prompting: Arc<AtomicBool>,
}

impl ConfirmationGate for TerminalPrompt {
    fn confirm(&self, item_count: usize) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if !atty::is(atty::Stream::Stdin) {
            eprintln!("Refusing to publish {} items without a terminal; pass --yes", item_count);
            return false;
        }

        eprint!(
            "Publish {} items to {}? [y/N] ",
            item_count, self.destination
        );
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        self.prompting.store(true, Ordering::Release);
        let read = std::io::stdin().lock().read_line(&mut answer);
        self.prompting.store(false, Ordering::Release);
        if read.is_err() || self.cancel.is_cancelled() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Print each status as the runner emits it, until the run completes
async fn print_progress(mut timeline: TimelineReceiver) {
    loop {
        match timeline.recv().await {
            Ok(status) => {
                match status.kind {
                    StatusKind::Error => eprintln!("! {}", status.message),
                    _ => eprintln!("  {}", status.message),
                }
                if status.phase == RunPhase::Completed {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &BatchSummary, format: &str) {
    if format == "json" {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to encode summary: {}", e),
        }
        return;
    }

    for outcome in &summary.outcomes {
        match &outcome.error {
            None => println!("{}: ok", outcome.item_id),
            Some(error) => println!("{}: failed: {}", outcome.item_id, error),
        }
    }
    println!(
        "{} published, {} failed, {} total{}",
        summary.success_count,
        summary.fail_count,
        summary.total_count,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}

/// Cancel the run on SIGINT/SIGTERM
///
/// A signal while the confirmation prompt is waiting declines the batch and
/// exits, since the blocking read cannot observe the token.
#[cfg(unix)]
fn setup_signal_handlers(cancel: CancellationToken, prompting: Arc<AtomicBool>) -> Result<()> {
    use libpostdeck::error::BatchError;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| PostdeckError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            cancel.cancel();
            if prompting.load(Ordering::Acquire) {
                info!(signal = sig, "batch declined at prompt");
                eprintln!();
                let declined = PostdeckError::Batch(BatchError::Declined(0));
                eprintln!("Error: publish declined");
                std::process::exit(declined.exit_code());
            }
            info!(signal = sig, "stopping after the current item");
            eprintln!("Stopping after the current item...");
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_cancel: CancellationToken, _prompting: Arc<AtomicBool>) -> Result<()> {
    Ok(())
}
