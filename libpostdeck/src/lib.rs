//! Postdeck - batch publishing of queued social media content
//!
//! This library publishes queued content items to a publish endpoint one at
//! a time, isolating per-item failures, pacing between attempts, and
//! reporting live progress through a single status cell.

pub mod config;
pub mod confirm;
pub mod error;
pub mod job;
pub mod logging;
pub mod pacer;
pub mod publish;
pub mod runner;
pub mod service;
pub mod status;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{PostdeckError, Result};
pub use job::{BatchJob, BatchSummary};
pub use runner::BatchRunner;
pub use status::{RunStatus, StatusReporter};
pub use store::ContentStore;
pub use types::{ContentItem, Destination, MediaRef};
