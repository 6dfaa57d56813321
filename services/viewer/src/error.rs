//! services/viewer/src/error.rs
//!
//! Defines the primary error type for the viewer service.

use crate::config::ConfigError;
use crate::playback::PlaybackError;
use crate::workflow::GenerationError;
use learning_viewer_core::ports::PortError;

/// The primary error type for the `viewer` service.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A generation workflow ended without content.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A media element failed to load or play.
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Represents a standard Input/Output error (e.g., reading an upload file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
