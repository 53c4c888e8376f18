//! Publish client abstraction
//!
//! A `PublishClient` performs exactly one call to the external publish
//! endpoint per invocation. Retries, pacing and batching belong to the
//! runner, and eligibility (destination, media present) is checked before a
//! client is ever called.
//!
//! # Examples
//!
//! ```no_run
//! use libpostdeck::publish::{http::HttpPublishClient, PublishClient, PublishKind};
//! use libpostdeck::types::MediaRef;
//!
//! # async fn example() -> libpostdeck::error::Result<()> {
//! let client = HttpPublishClient::new("http://localhost:8080", PublishKind::Post)?;
//!
//! let media = MediaRef::new("https://cdn.example.com/launch.jpg");
//! client.publish(&media, "We are live!").await?;
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::types::MediaRef;

pub mod http;

// Also used by the integration tests
pub mod mock;

pub type PublishResult = std::result::Result<(), PublishError>;

/// Single call to the external publish endpoint
#[async_trait]
pub trait PublishClient: Send + Sync {
    /// Publish one media item with its caption
    ///
    /// `media` must be a non-empty handle; `caption` may be empty.
    ///
    /// # Errors
    ///
    /// Network failures, non-success responses and malformed responses are
    /// all reported as `PublishError`. Implementations never retry.
    async fn publish(&self, media: &MediaRef, caption: &str) -> PublishResult;

    /// Short identifier used in logs (e.g. "http:post", "mock")
    fn name(&self) -> &str;
}

/// Variant of publish operation the endpoint exposes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishKind {
    /// Regular feed post
    #[default]
    Post,
    /// Ephemeral story
    Story,
    /// Story pinned to a highlight
    Highlight,
}

impl PublishKind {
    /// Endpoint route for this kind, relative to the base URL
    pub fn route(&self) -> &'static str {
        match self {
            Self::Post => "publish",
            Self::Story => "publish/story",
            Self::Highlight => "publish/highlight",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Story => "story",
            Self::Highlight => "highlight",
        }
    }
}

impl FromStr for PublishKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "story" => Ok(Self::Story),
            "highlight" => Ok(Self::Highlight),
            _ => Err(format!(
                "Invalid publish kind: '{}'. Valid options: post, story, highlight",
                s
            )),
        }
    }
}

impl std::fmt::Display for PublishKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
