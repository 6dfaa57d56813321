//! crates/learning_viewer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the viewer.
//! These structs are independent of any transport, storage, or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Narration length requested when the caller does not pick one.
pub const DEFAULT_TARGET_DURATION_SECS: u32 = 120;

//=========================================================================================
// Validation
//=========================================================================================

/// Client-side input problems, detected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a query")]
    EmptyQuery,
    #[error("Target duration must be a positive number of seconds")]
    ZeroDuration,
    #[error("Please enter some content first")]
    EmptyContent,
    #[error("A title is required")]
    EmptyTitle,
}

//=========================================================================================
// Generation Request
//=========================================================================================

/// The tone/register of the generated explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NarrativeStyle {
    #[default]
    Intuitive,
    Formal,
    Conversational,
    Technical,
}

impl NarrativeStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeStyle::Intuitive => "intuitive",
            NarrativeStyle::Formal => "formal",
            NarrativeStyle::Conversational => "conversational",
            NarrativeStyle::Technical => "technical",
        }
    }
}

impl fmt::Display for NarrativeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NarrativeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intuitive" => Ok(NarrativeStyle::Intuitive),
            "formal" => Ok(NarrativeStyle::Formal),
            "conversational" => Ok(NarrativeStyle::Conversational),
            "technical" => Ok(NarrativeStyle::Technical),
            other => Err(format!("unknown narrative style '{}'", other)),
        }
    }
}

/// A validated request for a new learning-content job.
///
/// Fields are private so a value can only exist once `new` has checked it;
/// it is never modified after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    query: String,
    narrative_style: NarrativeStyle,
    target_duration: u32,
    include_video: bool,
}

impl GenerationRequest {
    /// Builds a request with the default style, duration and video flag.
    pub fn new(query: &str) -> Result<Self, ValidationError> {
        Self::with_options(
            query,
            NarrativeStyle::default(),
            DEFAULT_TARGET_DURATION_SECS,
            true,
        )
    }

    pub fn with_options(
        query: &str,
        narrative_style: NarrativeStyle,
        target_duration: u32,
        include_video: bool,
    ) -> Result<Self, ValidationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if target_duration == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        Ok(Self {
            query: query.to_string(),
            narrative_style,
            target_duration,
            include_video,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn narrative_style(&self) -> NarrativeStyle {
        self.narrative_style
    }

    pub fn target_duration(&self) -> u32 {
        self.target_duration
    }

    pub fn include_video(&self) -> bool {
        self.include_video
    }
}

//=========================================================================================
// Job Status
//=========================================================================================

/// Server-side lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Processing,
    Completed,
    Failed,
    NotFound,
}

impl JobState {
    /// Terminal states end the polling loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// One status observation. Superseded by the next poll, never accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub session_id: String,
    pub state: JobState,
    pub topic: Option<String>,
    pub message: Option<String>,
}

//=========================================================================================
// Generated Content
//=========================================================================================

/// A timed unit of the generated narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeSegment {
    pub segment_id: u32,
    pub title: String,
    pub content: String,
    pub start_time: f64,
    pub end_time: f64,
    pub estimated_duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub segments: Vec<NarrativeSegment>,
    pub total_duration: f64,
    pub style: NarrativeStyle,
}

impl Narrative {
    /// The narration script, segment by segment, in playback order.
    pub fn script(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.content.as_str()).collect()
    }
}

/// The final artifact bundle of a completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    pub session_id: String,
    pub topic: String,
    pub mindmap_code: String,
    pub audio_url: String,
    pub video_url: String,
    pub narrative: Narrative,
    /// Opaque asset manifest, kept as raw JSON text.
    pub assets: String,
}

//=========================================================================================
// Client-persisted State
//=========================================================================================

/// An entry of the locally stored learning history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub id: String,
    pub query: String,
    pub subject: Option<String>,
    pub chapter: Option<String>,
    pub content: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryItem {
    /// History entry for a successfully generated job.
    pub fn from_generation(query: &str, content: &GeneratedContent) -> Self {
        Self {
            id: content.session_id.clone(),
            query: query.to_string(),
            subject: Some(content.topic.clone()),
            chapter: None,
            content: None,
            session_id: Some(content.session_id.clone()),
            created_at: Utc::now(),
        }
    }
}

/// The content currently loaded in the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSession {
    pub item: HistoryItem,
    pub generated: Option<GeneratedContent>,
    /// Diagram code for manually uploaded content.
    pub mindmap_code: Option<String>,
}

impl CurrentSession {
    /// Diagram code to render, whichever way the content arrived.
    pub fn mindmap(&self) -> Option<&str> {
        self.generated
            .as_ref()
            .map(|g| g.mindmap_code.as_str())
            .or(self.mindmap_code.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_match_the_generate_form() {
        let req = GenerationRequest::new("  Derivatives in Calculus ").unwrap();
        assert_eq!(req.query(), "Derivatives in Calculus");
        assert_eq!(req.narrative_style(), NarrativeStyle::Intuitive);
        assert_eq!(req.target_duration(), 120);
        assert!(req.include_video());
    }

    #[test]
    fn blank_query_is_rejected() {
        assert_eq!(GenerationRequest::new("   "), Err(ValidationError::EmptyQuery));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = GenerationRequest::with_options("x", NarrativeStyle::Formal, 0, false);
        assert_eq!(err, Err(ValidationError::ZeroDuration));
    }

    #[test]
    fn narrative_style_parses_case_insensitively() {
        assert_eq!("Technical".parse::<NarrativeStyle>(), Ok(NarrativeStyle::Technical));
        assert!("poetic".parse::<NarrativeStyle>().is_err());
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(!JobState::NotFound.is_terminal());
    }
}
