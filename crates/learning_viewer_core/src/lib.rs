pub mod domain;
pub mod ports;

pub use domain::{
    CurrentSession, GeneratedContent, GenerationRequest, HistoryItem, JobState, JobStatus,
    Narrative, NarrativeSegment, NarrativeStyle, ValidationError,
};
pub use ports::{
    ContentGenerationService, KeyValueStore, NarrationService, NarrationSource, NarrationTrack,
    PortError, PortResult, TextToSpeechService,
};
