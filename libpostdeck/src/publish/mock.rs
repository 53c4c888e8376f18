//! Mock publish client for testing
//!
//! Configurable client that can fail on chosen calls and simulate latency.
//! Every call is recorded in order so tests can check what the runner sent
//! without network access.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use super::{PublishClient, PublishResult};
use crate::error::PublishError;
use crate::types::MediaRef;

/// A call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub media: String,
    pub caption: String,
}

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client name reported in logs
    pub name: String,

    /// Zero-based call indices that fail
    pub fail_on: HashSet<usize>,

    /// Fail every call regardless of `fail_on`
    pub fail_all: bool,

    /// Error returned on failing calls
    pub error: PublishError,

    /// Delay before completing each call (simulates network latency)
    pub delay: Duration,

    /// Calls received so far, in order
    pub calls: Arc<Mutex<Vec<PublishCall>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            fail_on: HashSet::new(),
            fail_all: false,
            error: PublishError::Rejected {
                status: 500,
                message: "Mock publish failed".to_string(),
            },
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock publish client
pub struct MockPublishClient {
    config: MockConfig,
}

impl MockPublishClient {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Client where every call succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Client where every call fails with a rejection carrying `message`
    pub fn failing(message: &str) -> Self {
        Self::new(MockConfig {
            fail_all: true,
            error: PublishError::Rejected {
                status: 500,
                message: message.to_string(),
            },
            ..Default::default()
        })
    }

    /// Client that fails only on the given zero-based call indices
    pub fn fail_on(indices: &[usize]) -> Self {
        Self::new(MockConfig {
            fail_on: indices.iter().copied().collect(),
            ..Default::default()
        })
    }

    /// Client where every call succeeds after `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..Default::default()
        })
    }

    /// Number of publish calls received
    pub fn call_count(&self) -> usize {
        self.config.calls.lock().unwrap().len()
    }

    /// All calls received, in order
    pub fn calls(&self) -> Vec<PublishCall> {
        self.config.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PublishClient for MockPublishClient {
    async fn publish(&self, media: &MediaRef, caption: &str) -> PublishResult {
        let index = {
            let mut calls = self.config.calls.lock().unwrap();
            calls.push(PublishCall {
                media: media.to_string(),
                caption: caption.to_string(),
            });
            calls.len() - 1
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if media.is_empty() {
            return Err(PublishError::InvalidMedia("media reference is empty".to_string()));
        }

        if self.config.fail_all || self.config.fail_on.contains(&index) {
            Err(self.config.error.clone())
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success_records_calls() {
        let client = MockPublishClient::success();

        client.publish(&MediaRef::new("a.jpg"), "first").await.unwrap();
        client.publish(&MediaRef::new("b.jpg"), "").await.unwrap();

        assert_eq!(client.call_count(), 2);
        assert_eq!(
            client.calls(),
            vec![
                PublishCall {
                    media: "a.jpg".to_string(),
                    caption: "first".to_string()
                },
                PublishCall {
                    media: "b.jpg".to_string(),
                    caption: String::new()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_fail_on_index() {
        let client = MockPublishClient::fail_on(&[1]);
        let media = MediaRef::new("a.jpg");

        assert!(client.publish(&media, "").await.is_ok());
        assert!(client.publish(&media, "").await.is_err());
        assert!(client.publish(&media, "").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_failing_message() {
        let client = MockPublishClient::failing("Token expired");

        let err = client.publish(&MediaRef::new("a.jpg"), "").await.unwrap_err();
        assert!(err.to_string().contains("Token expired"));
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let client = MockPublishClient::with_delay(Duration::from_millis(50));

        let start = std::time::Instant::now();
        client.publish(&MediaRef::new("a.jpg"), "").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_media() {
        let client = MockPublishClient::success();

        let result = client.publish(&MediaRef::new(""), "").await;
        assert!(matches!(result, Err(PublishError::InvalidMedia(_))));
    }
}
