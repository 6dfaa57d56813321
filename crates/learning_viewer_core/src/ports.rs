//! crates/learning_viewer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the viewer's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the remote API, the storage medium and the audio backend.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{GeneratedContent, GenerationRequest, JobStatus, Narrative};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The request never produced a response (connect, DNS, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),
    /// The service answered with a non-success status.
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },
    /// The payload did not match the expected schema.
    #[error("Malformed payload: {0}")]
    Schema(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote, job-based content generation API.
#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Starts a job and returns its session identifier.
    async fn submit(&self, request: &GenerationRequest) -> PortResult<String>;

    /// A single status fetch for a job.
    async fn poll_status(&self, session_id: &str) -> PortResult<JobStatus>;

    /// Fetches the artifact bundle of a completed job.
    async fn fetch_content(&self, session_id: &str) -> PortResult<GeneratedContent>;
}

/// String-keyed persisted state. Values are opaque serialized text.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn put(&self, key: &str, value: String) -> PortResult<()>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates audio data from a string of text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>>;
}

/// Where a media element gets its narration from.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationTrack {
    /// A resource the media element loads itself.
    Url(String),
    /// Audio produced locally, ready to hand to the element.
    Audio { data: Bytes, mime_type: String },
}

/// What a narration backend needs to know about the loaded content.
#[derive(Debug, Clone, Copy)]
pub struct NarrationSource<'a> {
    pub audio_url: Option<&'a str>,
    pub narrative: Option<&'a Narrative>,
}

#[async_trait]
pub trait NarrationService: Send + Sync {
    /// Resolves the narration for the given content.
    async fn prepare(&self, source: NarrationSource<'_>) -> PortResult<NarrationTrack>;
}
