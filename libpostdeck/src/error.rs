//! Error types for Postdeck

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PostdeckError>;

#[derive(Error, Debug)]
pub enum PostdeckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content store error: {0}")]
    Store(#[from] StoreError),

    #[error("Batch rejected: {0}")]
    Batch(#[from] BatchError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PostdeckError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PostdeckError::InvalidInput(_) => 3,
            PostdeckError::Batch(_) => 4,
            PostdeckError::Config(_) => 2,
            PostdeckError::Store(_) => 2,
            PostdeckError::Publish(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Preconditions checked before a run touches the lock or the status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("no eligible items to publish")]
    EmptyBatch,

    #[error("a batch is already running")]
    BatchAlreadyRunning,

    #[error("publishing {0} items was declined")]
    Declined(usize),

    #[error("job already carries {0} outcomes; build a new job to publish again")]
    AlreadyAttempted(usize),
}

/// Failure of a single publish call
///
/// Cloneable so it can be stored in an item outcome and forwarded to
/// status observers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Invalid media reference: {0}")]
    InvalidMedia(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Endpoint rejected the post (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = PostdeckError::InvalidInput("Unknown destination".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_batch_preconditions() {
        assert_eq!(PostdeckError::Batch(BatchError::EmptyBatch).exit_code(), 4);
        assert_eq!(
            PostdeckError::Batch(BatchError::BatchAlreadyRunning).exit_code(),
            4
        );
        assert_eq!(PostdeckError::Batch(BatchError::Declined(3)).exit_code(), 4);
    }

    #[test]
    fn test_exit_code_config_and_store() {
        let config = PostdeckError::Config(ConfigError::MissingField("publish.endpoint".into()));
        assert_eq!(config.exit_code(), 2);

        let store = PostdeckError::Store(StoreError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        )));
        assert_eq!(store.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_publish_error() {
        let error = PostdeckError::Publish(PublishError::Network("Connection refused".into()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_batch() {
        let error = PostdeckError::Batch(BatchError::BatchAlreadyRunning);
        assert_eq!(error.to_string(), "Batch rejected: a batch is already running");

        let error = PostdeckError::Batch(BatchError::Declined(5));
        assert_eq!(
            error.to_string(),
            "Batch rejected: publishing 5 items was declined"
        );
    }

    #[test]
    fn test_publish_error_variants() {
        let rejected = PublishError::Rejected {
            status: 400,
            message: "image too large".to_string(),
        };
        assert_eq!(
            rejected.to_string(),
            "Endpoint rejected the post (HTTP 400): image too large"
        );

        let malformed = PublishError::MalformedResponse("expected JSON".to_string());
        assert_eq!(malformed.to_string(), "Malformed response: expected JSON");

        let rate = PublishError::RateLimit("retry later".to_string());
        assert_eq!(rate.to_string(), "Rate limit exceeded: retry later");
    }

    #[test]
    fn test_error_conversion_from_publish_error() {
        let error: PostdeckError = PublishError::InvalidMedia(String::new()).into();
        assert!(matches!(error, PostdeckError::Publish(_)));
    }

    #[test]
    fn test_config_invalid_value_formatting() {
        let error = ConfigError::InvalidValue {
            field: "pacing.success_delay".to_string(),
            reason: "expected time unit".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for pacing.success_delay: expected time unit"
        );
    }

    #[test]
    fn test_publish_error_clone() {
        let original = PublishError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(original, cloned);
    }
}
