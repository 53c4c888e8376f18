//! Service layer for Postdeck
//!
//! `PostdeckService` wires the content store, publish client, pacer, status
//! reporter and batch runner together from a `Config`, so every front end
//! (the CLIs today) drives publishing the same way.
//!
//! # Example
//!
//! ```no_run
//! use libpostdeck::confirm::AssumeYes;
//! use libpostdeck::service::PostdeckService;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> libpostdeck::Result<()> {
//! let service = PostdeckService::new().await?;
//! let mut statuses = service.subscribe_timeline();
//!
//! tokio::spawn(async move {
//!     while let Ok(status) = statuses.recv().await {
//!         println!("{}", status.message);
//!     }
//! });
//!
//! let summary = service
//!     .publish_queue(None, &AssumeYes, &CancellationToken::new())
//!     .await?;
//! println!("{} published, {} failed", summary.success_count, summary.fail_count);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::confirm::ConfirmationGate;
use crate::error::{ConfigError, PostdeckError, Result};
use crate::job::{BatchJob, BatchSummary};
use crate::pacer;
use crate::publish::http::HttpPublishClient;
use crate::publish::PublishClient;
use crate::runner::{BatchRunner, ClearWindows};
use crate::status::{RunStatus, StatusReporter, TimelineReceiver};
use crate::store::ContentStore;
use crate::types::Destination;
use crate::Config;

/// Main service facade
///
/// Holds the one `BatchRunner` of the process, so the single-flight lock
/// covers every batch and single-item publish started through it.
pub struct PostdeckService {
    config: Arc<Config>,
    store: ContentStore,
    runner: BatchRunner,
}

impl PostdeckService {
    /// Create a service from the default configuration file
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service with the HTTP publish client described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated, or the
    /// publish endpoint or token file is unusable.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store_path = crate::config::resolve_store_path(Some(&config.store.path))?;
        let store_path = store_path.to_str().ok_or_else(|| {
            PostdeckError::Config(ConfigError::InvalidValue {
                field: "store.path".to_string(),
                reason: "path is not valid UTF-8".to_string(),
            })
        })?;
        let store = ContentStore::new(store_path).await?;
        let client = HttpPublishClient::from_config(&config.publish)?;

        Ok(Self::with_client(config, store, Arc::new(client)))
    }

    /// Create a service around an already opened store and any client
    pub fn with_client(
        config: Config,
        store: ContentStore,
        client: Arc<dyn PublishClient>,
    ) -> Self {
        let pacer = Arc::from(pacer::from_config(&config.pacing));
        let runner = BatchRunner::new(client, pacer, StatusReporter::default())
            .with_clear_windows(ClearWindows::from(&config.status));

        Self {
            config: Arc::new(config),
            store,
            runner,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn runner(&self) -> &BatchRunner {
        &self.runner
    }

    pub fn reporter(&self) -> &StatusReporter {
        self.runner.reporter()
    }

    /// Latest-value status observer
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.runner.reporter().subscribe()
    }

    /// Observer of every status the runner emits
    pub fn subscribe_timeline(&self) -> TimelineReceiver {
        self.runner.reporter().subscribe_timeline()
    }

    /// Publish every eligible queued item for `destination` (the configured
    /// default when `None`)
    ///
    /// Multi-item batches are confirmed through `gate` first.
    pub async fn publish_queue(
        &self,
        destination: Option<Destination>,
        gate: &dyn ConfirmationGate,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let destination = destination.unwrap_or(self.config.defaults.destination);
        let items = self.store.eligible_items(destination).await?;
        debug!(%destination, eligible = items.len(), "assembled batch");

        let mut job = BatchJob::eligible(items, destination);
        self.runner.run_confirmed(&mut job, gate, cancel).await
    }

    /// Publish one stored item by id, without confirmation
    pub async fn publish_one(
        &self,
        item_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| PostdeckError::InvalidInput(format!("No item with id {}", item_id)))?;

        let mut job = BatchJob::single(item);
        self.runner.run_with_cancel(&mut job, cancel).await
    }
}
