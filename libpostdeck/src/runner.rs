//! Batch publishing runner
//!
//! `BatchRunner` walks a job's items strictly in order, one publish call at a
//! time. A failed item is recorded and counted and the run moves on; only
//! the two preconditions (empty job, another run in flight) reject a run.
//! Between attempts the runner waits for whatever its `Pacer` asks, skipping
//! the wait after the last item.
//!
//! Only one run may be in flight per runner. The lock is taken with a single
//! compare-and-swap, so two `run` calls racing on the same runner cannot
//! both see it free.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libpostdeck::job::BatchJob;
//! use libpostdeck::pacer::FixedPacer;
//! use libpostdeck::publish::mock::MockPublishClient;
//! use libpostdeck::runner::BatchRunner;
//! use libpostdeck::status::StatusReporter;
//! use libpostdeck::types::Destination;
//!
//! # async fn example(items: Vec<libpostdeck::ContentItem>) -> libpostdeck::Result<()> {
//! let runner = BatchRunner::new(
//!     Arc::new(MockPublishClient::success()),
//!     Arc::new(FixedPacer::default()),
//!     StatusReporter::default(),
//! );
//!
//! let mut job = BatchJob::eligible(items, Destination::Instagram);
//! let summary = runner.run(&mut job).await?;
//! println!("{} published, {} failed", summary.success_count, summary.fail_count);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StatusConfig;
use crate::confirm::ConfirmationGate;
use crate::error::{BatchError, PublishError, Result};
use crate::job::{BatchJob, BatchSummary};
use crate::pacer::Pacer;
use crate::publish::PublishClient;
use crate::status::{RunStatus, StatusKind, StatusReporter};
use crate::types::{ItemOutcome, OutcomeKind};

/// How long terminal statuses stay visible before the reporter clears them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearWindows {
    pub batch: Duration,
    pub single: Duration,
}

impl Default for ClearWindows {
    fn default() -> Self {
        Self {
            batch: Duration::from_secs(10),
            single: Duration::from_secs(3),
        }
    }
}

impl From<&StatusConfig> for ClearWindows {
    fn from(config: &StatusConfig) -> Self {
        Self {
            batch: config.batch_clear_after,
            single: config.single_clear_after,
        }
    }
}

/// Releases the single-flight lock on every exit path, including a dropped
/// run future
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct BatchRunner {
    client: Arc<dyn PublishClient>,
    pacer: Arc<dyn Pacer>,
    reporter: StatusReporter,
    clear: ClearWindows,
    in_flight: AtomicBool,
}

impl BatchRunner {
    pub fn new(
        client: Arc<dyn PublishClient>,
        pacer: Arc<dyn Pacer>,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            client,
            pacer,
            reporter,
            clear: ClearWindows::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_clear_windows(mut self, clear: ClearWindows) -> Self {
        self.clear = clear;
        self
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    /// Whether a run currently holds the lock
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Publish every item of `job` in order
    ///
    /// # Errors
    ///
    /// - `BatchError::EmptyBatch` if the job has no items (lock untouched)
    /// - `BatchError::BatchAlreadyRunning` if another run holds the lock
    /// - `BatchError::AlreadyAttempted` if the job already carries outcomes
    ///
    /// Item failures are never errors; they are counted in the summary.
    pub async fn run(&self, job: &mut BatchJob) -> Result<BatchSummary> {
        self.run_with_cancel(job, &CancellationToken::new()).await
    }

    /// Ask `gate` before publishing a multi-item job, then run it
    ///
    /// A declined gate returns `BatchError::Declined` without taking the
    /// lock. Cancellation before or during the gate counts as a decline.
    /// Single-item jobs are not gated. Rejections that would follow anyway
    /// are reported before the gate is asked.
    pub async fn run_confirmed(
        &self,
        job: &mut BatchJob,
        gate: &dyn ConfirmationGate,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        if job.is_empty() {
            return Err(BatchError::EmptyBatch.into());
        }
        if !job.outcomes().is_empty() {
            return Err(BatchError::AlreadyAttempted(job.outcomes().len()).into());
        }
        // Advisory only; the CAS in run_with_cancel decides
        if self.is_running() {
            return Err(BatchError::BatchAlreadyRunning.into());
        }

        if !cancel.is_cancelled() && !job.is_single() && !gate.confirm(job.len()) {
            info!(items = job.len(), "batch declined at confirmation");
            return Err(BatchError::Declined(job.len()).into());
        }
        if cancel.is_cancelled() {
            info!(items = job.len(), "batch cancelled at confirmation");
            return Err(BatchError::Declined(job.len()).into());
        }

        self.run_with_cancel(job, cancel).await
    }

    /// Publish every item of `job` in order, stopping before the next item
    /// once `cancel` fires
    ///
    /// A cancelled run still returns a summary of the items attempted so far
    /// with `cancelled` set.
    pub async fn run_with_cancel(
        &self,
        job: &mut BatchJob,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        if job.is_empty() {
            return Err(BatchError::EmptyBatch.into());
        }
        if !job.outcomes().is_empty() {
            return Err(BatchError::AlreadyAttempted(job.outcomes().len()).into());
        }

        let guard = FlightGuard::acquire(&self.in_flight).ok_or(BatchError::BatchAlreadyRunning)?;

        let total = job.len();
        let single = job.is_single();
        self.pacer.reset();

        info!(
            items = total,
            destination = %job.destination(),
            client = self.client.name(),
            "starting batch"
        );
        self.reporter.emit(RunStatus::running(
            StatusKind::Info,
            format!("Starting {} item{}", total, plural(total)),
            0,
            0,
            total,
        ));

        let mut success_count = 0;
        let mut fail_count = 0;
        let mut cancelled = false;

        for index in 0..total {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let item = &job.items()[index];
            let item_id = item.id.clone();
            let caption = item.publish_caption().to_string();
            let result = match item.media.clone() {
                Some(media) => self.client.publish(&media, &caption).await,
                None => Err(PublishError::InvalidMedia(format!("item {} has no media", item_id))),
            };

            let outcome = match result {
                Ok(()) => {
                    success_count += 1;
                    debug!(item = %item_id, position = index + 1, total, "item published");
                    job.record(ItemOutcome::success(item_id));
                    self.reporter.emit(RunStatus::running(
                        StatusKind::Info,
                        format!(
                            "[{}/{}] published. {} ok, {} failed",
                            index + 1,
                            total,
                            success_count,
                            fail_count
                        ),
                        success_count,
                        fail_count,
                        total,
                    ));
                    OutcomeKind::Success
                }
                Err(e) => {
                    fail_count += 1;
                    warn!(item = %item_id, position = index + 1, total, error = %e, "item failed");
                    let message = format!(
                        "[{}/{}] failed: {}. {} ok, {} failed",
                        index + 1,
                        total,
                        e,
                        success_count,
                        fail_count
                    );
                    job.record(ItemOutcome::failure(item_id, e.to_string()));
                    self.reporter.emit(RunStatus::running(
                        StatusKind::Error,
                        message,
                        success_count,
                        fail_count,
                        total,
                    ));
                    OutcomeKind::Failure
                }
            };

            if index + 1 < total {
                let delay = self.pacer.delay_after(outcome);
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        let summary = BatchSummary::from_job(job, cancelled);
        self.reporter.emit(terminal_status(&summary, single));

        // Scheduled while still holding the lock so the next run's first
        // status supersedes this clear
        let window = if single {
            self.clear.single
        } else {
            self.clear.batch
        };
        self.reporter.clear_after(window);
        drop(guard);

        info!(
            published = summary.success_count,
            failed = summary.fail_count,
            total = summary.total_count,
            cancelled = summary.cancelled,
            "batch finished"
        );
        Ok(summary)
    }
}

/// Final status for a finished run
fn terminal_status(summary: &BatchSummary, single: bool) -> RunStatus {
    let (kind, message) = if summary.cancelled {
        (
            StatusKind::Info,
            format!(
                "Cancelled after {} of {}: {} published, {} failed.",
                summary.attempted(),
                summary.total_count,
                summary.success_count,
                summary.fail_count
            ),
        )
    } else if single {
        match summary.outcomes.first() {
            Some(outcome) if outcome.is_success() => {
                (StatusKind::Success, "Published successfully.".to_string())
            }
            outcome => (
                StatusKind::Error,
                format!(
                    "Failed to publish: {}",
                    outcome
                        .and_then(|o| o.error.as_deref())
                        .unwrap_or("unknown error")
                ),
            ),
        }
    } else if summary.fail_count == 0 {
        (
            StatusKind::Success,
            format!("All {} published.", summary.total_count),
        )
    } else if summary.success_count == 0 {
        (
            StatusKind::Error,
            format!("All {} failed.", summary.total_count),
        )
    } else {
        (
            StatusKind::Info,
            format!(
                "{} published, {} failed.",
                summary.success_count, summary.fail_count
            ),
        )
    };

    RunStatus::completed(
        kind,
        message,
        summary.success_count,
        summary.fail_count,
        summary.total_count,
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
