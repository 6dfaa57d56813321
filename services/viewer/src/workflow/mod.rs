pub mod generation_client;
pub mod history;
pub mod session;
pub mod state;

use learning_viewer_core::domain::ValidationError;
use learning_viewer_core::ports::PortError;

pub use generation_client::{GenerationClient, PollAttempt};
pub use history::{HistoryRepository, CURRENT_SESSION_KEY, HISTORY_KEY};
pub use session::{GenerationProgress, GenerationStage, LearningSession};
pub use state::AppState;

/// Ways a generation workflow can end without content.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The user input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A request failed at the transport, service or schema level.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The job reported failure.
    #[error("{message}")]
    Failed { message: String },

    /// The polling budget ran out before the job completed.
    #[error("Content generation timed out after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// The caller abandoned the workflow.
    #[error("Content generation was cancelled")]
    Cancelled,

    /// Another generation is still outstanding on this session.
    #[error("A generation request is already in progress")]
    InProgress,
}
