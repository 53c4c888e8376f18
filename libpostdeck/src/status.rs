//! Run status reporting
//!
//! `StatusReporter` holds the one current `RunStatus` of an orchestrator.
//! Each `emit` overwrites it in place; observers that only care about the
//! latest value hold a `watch` receiver, while observers that need every
//! step (progress printers, tests) subscribe to the timeline, a broadcast
//! of each emitted status.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use libpostdeck::status::{RunStatus, StatusKind, StatusReporter};
//!
//! # async fn example() {
//! let reporter = StatusReporter::new(100);
//! let mut latest = reporter.subscribe();
//!
//! reporter.emit(RunStatus::running(StatusKind::Info, "starting 3 items", 0, 0, 3));
//! reporter.clear_after(Duration::from_secs(10));
//!
//! latest.changed().await.ok();
//! println!("{}", latest.borrow().message);
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tracing::trace;

/// Timeline receiver type alias
pub type TimelineReceiver = broadcast::Receiver<RunStatus>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Info,
    Success,
    Error,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a run as shown to observers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStatus {
    pub phase: RunPhase,
    pub kind: StatusKind,
    pub message: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub total_count: usize,
}

impl RunStatus {
    /// The empty status shown when no run is active
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(
        kind: StatusKind,
        message: impl Into<String>,
        success_count: usize,
        fail_count: usize,
        total_count: usize,
    ) -> Self {
        Self {
            phase: RunPhase::Running,
            kind,
            message: message.into(),
            success_count,
            fail_count,
            total_count,
        }
    }

    pub fn completed(
        kind: StatusKind,
        message: impl Into<String>,
        success_count: usize,
        fail_count: usize,
        total_count: usize,
    ) -> Self {
        Self {
            phase: RunPhase::Completed,
            ..Self::running(kind, message, success_count, fail_count, total_count)
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RunPhase::Idle
    }
}

struct Inner {
    current: watch::Sender<RunStatus>,
    timeline: broadcast::Sender<RunStatus>,
    /// Bumped on every emit; a pending clear only fires if it is unchanged
    generation: AtomicU64,
    pending_clear: Mutex<Option<(u64, Duration)>>,
}

/// Single current status plus its auto-clear timer
///
/// Cheap to clone; clones share the same status cell.
#[derive(Clone)]
pub struct StatusReporter {
    inner: Arc<Inner>,
}

impl StatusReporter {
    /// Create a reporter whose timeline buffers `capacity` statuses per
    /// lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (current, _) = watch::channel(RunStatus::idle());
        let (timeline, _) = broadcast::channel(capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                current,
                timeline,
                generation: AtomicU64::new(0),
                pending_clear: Mutex::new(None),
            }),
        }
    }

    /// Overwrite the current status and notify observers
    ///
    /// Supersedes any pending clear.
    pub fn emit(&self, status: RunStatus) {
        trace!(phase = ?status.phase, kind = %status.kind, message = %status.message, "status");

        self.inner.current.send_modify(|current| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *current = status.clone();
        });

        // No timeline subscribers is fine
        let _ = self.inner.timeline.send(status);
    }

    /// Reset to idle after `delay` unless a newer status is emitted first
    ///
    /// Must be called from within a tokio runtime.
    pub fn clear_after(&self, delay: Duration) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        if let Ok(mut pending) = self.inner.pending_clear.lock() {
            *pending = Some((generation, delay));
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            sleep(delay).await;

            let cleared = inner.current.send_if_modified(|current| {
                if inner.generation.load(Ordering::SeqCst) == generation {
                    *current = RunStatus::idle();
                    true
                } else {
                    false
                }
            });

            if cleared {
                let _ = inner.timeline.send(RunStatus::idle());
            }
        });
    }

    /// Window of the clear that is still pending for the current status
    pub fn scheduled_clear(&self) -> Option<Duration> {
        let pending = *self.inner.pending_clear.lock().ok()?;
        let (generation, delay) = pending?;

        let still_pending = generation == self.inner.generation.load(Ordering::SeqCst)
            && !self.inner.current.borrow().is_idle();
        still_pending.then_some(delay)
    }

    /// Latest status
    pub fn current(&self) -> RunStatus {
        self.inner.current.borrow().clone()
    }

    /// Latest-value observer
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.inner.current.subscribe()
    }

    /// Observer of every emitted status, in order
    pub fn subscribe_timeline(&self) -> TimelineReceiver {
        self.inner.timeline.subscribe()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(100)
    }
}
