//! services/viewer/src/adapters/protocol.rs
//!
//! Wire schemas of the remote generation API, and their validation into
//! core domain types. Anything that does not fit is rejected here as
//! `PortError::Schema` instead of leaking half-filled values into the viewer.

use learning_viewer_core::domain::{
    GeneratedContent, GenerationRequest, JobState, JobStatus, Narrative, NarrativeSegment,
    NarrativeStyle,
};
use learning_viewer_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Viewer TO the Service
//=========================================================================================

/// Body of `POST /api/generate-content`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateContentBody {
    pub query: String,
    pub narrative_style: String,
    pub target_duration: u32,
    pub include_video: bool,
}

impl From<&GenerationRequest> for GenerateContentBody {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            query: request.query().to_string(),
            narrative_style: request.narrative_style().as_str().to_string(),
            target_duration: request.target_duration(),
            include_video: request.include_video(),
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Service TO the Viewer
//=========================================================================================

/// Response of `POST /api/generate-content`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerateContentResponse {
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerateContentResponse {
    pub fn into_session_id(self) -> PortResult<String> {
        non_empty("session_id", self.session_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireJobState {
    Processing,
    Completed,
    Failed,
    NotFound,
}

impl From<WireJobState> for JobState {
    fn from(state: WireJobState) -> Self {
        match state {
            WireJobState::Processing => JobState::Processing,
            WireJobState::Completed => JobState::Completed,
            WireJobState::Failed => JobState::Failed,
            WireJobState::NotFound => JobState::NotFound,
        }
    }
}

/// Response of `GET /api/status/{session_id}`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: WireJobState,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TryFrom<StatusResponse> for JobStatus {
    type Error = PortError;

    fn try_from(wire: StatusResponse) -> PortResult<Self> {
        Ok(JobStatus {
            session_id: non_empty("session_id", wire.session_id)?,
            state: wire.status.into(),
            topic: wire.topic,
            message: wire.message,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SegmentRecord {
    pub segment_id: u32,
    pub title: String,
    pub content: String,
    pub start_time: f64,
    pub end_time: f64,
    pub estimated_duration: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NarrativeRecord {
    pub segments: Vec<SegmentRecord>,
    pub total_duration: f64,
    pub style: String,
}

/// Response of `GET /api/content/{session_id}`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ContentResponse {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub mindmap_code: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub narrative: Option<NarrativeRecord>,
    #[serde(default)]
    pub assets: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl TryFrom<NarrativeRecord> for Narrative {
    type Error = PortError;

    fn try_from(wire: NarrativeRecord) -> PortResult<Self> {
        let style = wire
            .style
            .parse::<NarrativeStyle>()
            .map_err(PortError::Schema)?;
        if !(wire.total_duration.is_finite() && wire.total_duration >= 0.0) {
            return Err(PortError::Schema(format!(
                "narrative.total_duration must be a non-negative number, got {}",
                wire.total_duration
            )));
        }
        let mut segments = Vec::with_capacity(wire.segments.len());
        for segment in wire.segments {
            let timed = segment.start_time.is_finite()
                && segment.end_time.is_finite()
                && segment.start_time >= 0.0
                && segment.end_time >= segment.start_time;
            if !timed {
                return Err(PortError::Schema(format!(
                    "segment {} has an invalid time range {}..{}",
                    segment.segment_id, segment.start_time, segment.end_time
                )));
            }
            segments.push(NarrativeSegment {
                segment_id: segment.segment_id,
                title: segment.title,
                content: segment.content,
                start_time: segment.start_time,
                end_time: segment.end_time,
                estimated_duration: segment.estimated_duration,
            });
        }
        Ok(Narrative {
            segments,
            total_duration: wire.total_duration,
            style,
        })
    }
}

impl TryFrom<ContentResponse> for GeneratedContent {
    type Error = PortError;

    fn try_from(wire: ContentResponse) -> PortResult<Self> {
        if wire.status != "completed" {
            return Err(PortError::Schema(format!(
                "content for session {} is '{}', not completed: {}",
                wire.session_id,
                wire.status,
                wire.message.unwrap_or_default()
            )));
        }
        let narrative = wire
            .narrative
            .ok_or_else(|| PortError::Schema("missing field narrative".to_string()))?
            .try_into()?;

        Ok(GeneratedContent {
            session_id: non_empty("session_id", wire.session_id)?,
            topic: required("topic", wire.topic)?,
            mindmap_code: required("mindmap_code", wire.mindmap_code)?,
            audio_url: required("audio_url", wire.audio_url)?,
            video_url: required("video_url", wire.video_url)?,
            narrative,
            assets: wire.assets.to_string(),
        })
    }
}

/// The reverse mapping, used when completed content is persisted locally.
impl From<&GeneratedContent> for ContentResponse {
    fn from(content: &GeneratedContent) -> Self {
        let narrative = &content.narrative;
        Self {
            session_id: content.session_id.clone(),
            status: "completed".to_string(),
            topic: Some(content.topic.clone()),
            mindmap_code: Some(content.mindmap_code.clone()),
            audio_url: Some(content.audio_url.clone()),
            video_url: Some(content.video_url.clone()),
            narrative: Some(NarrativeRecord {
                segments: narrative
                    .segments
                    .iter()
                    .map(|s| SegmentRecord {
                        segment_id: s.segment_id,
                        title: s.title.clone(),
                        content: s.content.clone(),
                        start_time: s.start_time,
                        end_time: s.end_time,
                        estimated_duration: s.estimated_duration,
                    })
                    .collect(),
                total_duration: narrative.total_duration,
                style: narrative.style.as_str().to_string(),
            }),
            assets: serde_json::from_str(&content.assets)
                .unwrap_or_else(|_| serde_json::Value::String(content.assets.clone())),
            message: None,
        }
    }
}

fn required(field: &str, value: Option<String>) -> PortResult<String> {
    let value = value.ok_or_else(|| PortError::Schema(format!("missing field {}", field)))?;
    non_empty(field, value)
}

fn non_empty(field: &str, value: String) -> PortResult<String> {
    if value.trim().is_empty() {
        return Err(PortError::Schema(format!("field {} is empty", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content_json() -> serde_json::Value {
        json!({
            "session_id": "abc123",
            "status": "completed",
            "topic": "Derivatives",
            "mindmap_code": "mindmap\n  root((Derivatives))",
            "audio_url": "/public/generated/abc123/narration.mp3",
            "video_url": "/public/generated/abc123/video.mp4",
            "narrative": {
                "segments": [{
                    "segment_id": 1,
                    "title": "Hook",
                    "content": "You're driving down the highway.",
                    "start_time": 0.0,
                    "end_time": 10.0,
                    "estimated_duration": 10.0
                }],
                "total_duration": 10.0,
                "style": "intuitive"
            },
            "assets": {"narration": "narration.mp3"}
        })
    }

    #[test]
    fn request_body_carries_every_field() {
        let req = GenerationRequest::new("Derivatives in Calculus").unwrap();
        let body = serde_json::to_value(GenerateContentBody::from(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "Derivatives in Calculus",
                "narrative_style": "intuitive",
                "target_duration": 120,
                "include_video": true
            })
        );
    }

    #[test]
    fn status_with_null_topic_decodes() {
        let wire: StatusResponse = serde_json::from_value(json!({
            "session_id": "abc123",
            "status": "not_found",
            "topic": null,
            "message": "Session not found or still initializing"
        }))
        .unwrap();
        let status = JobStatus::try_from(wire).unwrap();
        assert_eq!(status.state, JobState::NotFound);
        assert!(status.topic.is_none());
    }

    #[test]
    fn unknown_status_value_fails_to_decode() {
        let result: Result<StatusResponse, _> =
            serde_json::from_value(json!({"session_id": "a", "status": "queued"}));
        assert!(result.is_err());
    }

    #[test]
    fn completed_content_converts() {
        let wire: ContentResponse = serde_json::from_value(content_json()).unwrap();
        let content = GeneratedContent::try_from(wire).unwrap();
        assert_eq!(content.topic, "Derivatives");
        assert_eq!(content.narrative.segments.len(), 1);
        assert_eq!(content.narrative.style, NarrativeStyle::Intuitive);
        assert!(content.assets.contains("narration.mp3"));
    }

    #[test]
    fn null_mindmap_is_a_schema_error() {
        let mut raw = content_json();
        raw["mindmap_code"] = serde_json::Value::Null;
        let wire: ContentResponse = serde_json::from_value(raw).unwrap();
        let err = GeneratedContent::try_from(wire).unwrap_err();
        assert!(matches!(err, PortError::Schema(msg) if msg.contains("mindmap_code")));
    }

    #[test]
    fn processing_content_is_a_schema_error() {
        let wire: ContentResponse = serde_json::from_value(json!({
            "session_id": "abc123",
            "status": "processing",
            "message": "Content generation not completed yet"
        }))
        .unwrap();
        assert!(matches!(
            GeneratedContent::try_from(wire),
            Err(PortError::Schema(_))
        ));
    }

    #[test]
    fn reversed_segment_times_are_rejected() {
        let mut raw = content_json();
        raw["narrative"]["segments"][0]["end_time"] = json!(-1.0);
        let wire: ContentResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            GeneratedContent::try_from(wire),
            Err(PortError::Schema(_))
        ));
    }
}
