//! services/viewer/src/adapters/http.rs
//!
//! This module contains the adapter for the remote content generation API.
//! It implements the `ContentGenerationService` port from the `core` crate
//! on top of `reqwest`.

use crate::adapters::protocol::{
    ContentResponse, GenerateContentBody, GenerateContentResponse, StatusResponse,
};
use async_trait::async_trait;
use learning_viewer_core::domain::{GeneratedContent, GenerationRequest, JobStatus};
use learning_viewer_core::ports::{ContentGenerationService, PortError, PortResult};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ContentGenerationService` port over HTTP.
#[derive(Clone)]
pub struct HttpGenerationAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationAdapter {
    /// Creates a new `HttpGenerationAdapter` with its own connection pool.
    pub fn new(base_url: &str, request_timeout: Duration) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates an adapter reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Maps transport failures, non-success statuses and undecodable bodies
    /// onto the port's error kinds.
    async fn decode<T: DeserializeOwned>(
        response: Result<reqwest::Response, reqwest::Error>,
        action: &str,
    ) -> PortResult<T> {
        let response = response
            .map_err(|e| PortError::Network(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("unknown status");
            let message = if body.is_empty() {
                format!("Failed to {}: {}", action, reason)
            } else {
                format!("Failed to {}: {} ({})", action, reason, body)
            };
            return Err(PortError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Network(format!("Failed to {}: {}", action, e)))?;
        serde_json::from_slice(&bytes).map_err(|e| PortError::Schema(format!("{}: {}", action, e)))
    }
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for HttpGenerationAdapter {
    async fn submit(&self, request: &GenerationRequest) -> PortResult<String> {
        let body = GenerateContentBody::from(request);
        let response = self
            .client
            .post(self.url("/api/generate-content"))
            .json(&body)
            .send()
            .await;
        let wire: GenerateContentResponse = Self::decode(response, "generate content").await?;
        debug!(session_id = %wire.session_id, "Generation request accepted.");
        wire.into_session_id()
    }

    async fn poll_status(&self, session_id: &str) -> PortResult<JobStatus> {
        let response = self
            .client
            .get(self.url(&format!("/api/status/{}", session_id)))
            .send()
            .await;
        let wire: StatusResponse = Self::decode(response, "check status").await?;
        wire.try_into()
    }

    async fn fetch_content(&self, session_id: &str) -> PortResult<GeneratedContent> {
        let response = self
            .client
            .get(self.url(&format!("/api/content/{}", session_id)))
            .send()
            .await;
        let wire: ContentResponse = Self::decode(response, "get content").await?;
        wire.try_into()
    }
}
