//! HTTP publish client
//!
//! Posts `{media_url, media_type, caption}` as JSON to
//! `<endpoint>/<kind route>` and maps the response onto `PublishError`.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PublishClient, PublishKind, PublishResult};
use crate::config::PublishConfig;
use crate::error::{ConfigError, PublishError, Result};
use crate::types::MediaRef;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    media_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<&'static str>,
    caption: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl PublishResponse {
    fn error_text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// Publish client backed by the external HTTP endpoint
pub struct HttpPublishClient {
    client: reqwest::Client,
    url: String,
    name: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl HttpPublishClient {
    /// Create a client for `endpoint` publishing the given kind
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the endpoint is not an
    /// http(s) URL.
    pub fn new(endpoint: &str, kind: PublishKind) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "publish.endpoint".to_string(),
                reason: format!("'{}' is not an http(s) URL", endpoint),
            }
            .into());
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url: format!("{}/{}", endpoint, kind.route()),
            name: format!("http:{}", kind),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a client from configuration, reading the bearer token file if
    /// one is configured
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the token file cannot
    /// be read or is empty.
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        let mut client = Self::new(&config.endpoint, config.kind)?.with_timeout(config.timeout);

        if let Some(token_file) = &config.token_file {
            let token_path = shellexpand::tilde(token_file).to_string();
            let token = std::fs::read_to_string(&token_path)
                .map_err(ConfigError::ReadError)?
                .trim()
                .to_string();

            if token.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "publish.token_file".to_string(),
                    reason: format!("token file {} is empty", token_path),
                }
                .into());
            }
            client = client.with_token(token);
        }

        Ok(client)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PublishClient for HttpPublishClient {
    async fn publish(&self, media: &MediaRef, caption: &str) -> PublishResult {
        if media.is_empty() {
            return Err(PublishError::InvalidMedia(
                "media reference is empty".to_string(),
            ));
        }

        let body = PublishRequest {
            media_url: media.as_str(),
            media_type: media.kind().map(|k| k.as_str()),
            caption,
        };

        let mut request = self.client.post(&self.url).json(&body).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(map_request_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PublishError::Network(format!("failed to read response: {}", e)))?;

        if status.as_u16() == 429 {
            return Err(PublishError::RateLimit(error_message(&text, status)));
        }

        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message: error_message(&text, status),
            });
        }

        let parsed: PublishResponse = serde_json::from_str(&text).map_err(|e| {
            PublishError::MalformedResponse(format!("expected a JSON object: {}", e))
        })?;

        if parsed.success == Some(false) {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message: parsed
                    .error_text()
                    .unwrap_or("endpoint reported failure")
                    .to_string(),
            });
        }

        debug!(
            client = %self.name,
            post_id = parsed.id.as_deref().unwrap_or("-"),
            "publish accepted"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn map_request_error(error: reqwest::Error) -> PublishError {
    if error.is_timeout() {
        PublishError::Network(format!("request timed out: {}", error))
    } else if error.is_connect() {
        PublishError::Network(format!("connection failed: {}", error))
    } else {
        PublishError::Network(error.to_string())
    }
}

/// Best human-readable message from an error body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<PublishResponse>(body) {
        if let Some(text) = parsed.error_text() {
            return text.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.chars().take(200).collect()
    }
}
