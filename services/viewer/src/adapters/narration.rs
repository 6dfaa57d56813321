//! services/viewer/src/adapters/narration.rs
//!
//! The two `NarrationService` implementations: a pre-recorded file referenced
//! by the content, and speech synthesized from the narrative text.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use learning_viewer_core::ports::{
    NarrationService, NarrationSource, NarrationTrack, PortError, PortResult, TextToSpeechService,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

//=========================================================================================
// File-backed Narration
//=========================================================================================

/// Plays the audio file the content points at, or a static fallback.
#[derive(Clone, Debug)]
pub struct FileBackedNarration {
    base_url: String,
    fallback_path: String,
}

impl FileBackedNarration {
    pub fn new(base_url: &str, fallback_path: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fallback_path: fallback_path.to_string(),
        }
    }

    /// Absolute URLs pass through; service-relative paths are joined to the base URL.
    pub fn resolve(&self, audio_url: Option<&str>) -> String {
        match audio_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                url.to_string()
            }
            Some(path) if path.starts_with('/') => format!("{}{}", self.base_url, path),
            Some(path) => format!("{}/{}", self.base_url, path),
            None => self.fallback_path.clone(),
        }
    }
}

#[async_trait]
impl NarrationService for FileBackedNarration {
    async fn prepare(&self, source: NarrationSource<'_>) -> PortResult<NarrationTrack> {
        Ok(NarrationTrack::Url(self.resolve(source.audio_url)))
    }
}

//=========================================================================================
// Synthesized Narration
//=========================================================================================

/// Speaks the narrative segments through a text-to-speech backend.
#[derive(Clone)]
pub struct SynthesizedNarration {
    tts: Arc<dyn TextToSpeechService>,
}

impl SynthesizedNarration {
    pub fn new(tts: Arc<dyn TextToSpeechService>) -> Self {
        Self { tts }
    }
}

#[async_trait]
impl NarrationService for SynthesizedNarration {
    async fn prepare(&self, source: NarrationSource<'_>) -> PortResult<NarrationTrack> {
        let narrative = source
            .narrative
            .ok_or_else(|| PortError::NotFound("no narrative to synthesize".to_string()))?;
        let script: Vec<String> = narrative
            .script()
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .collect();
        if script.is_empty() {
            return Err(PortError::NotFound("narrative has no spoken text".to_string()));
        }

        info!("🔊 Synthesizing narration for {} segments in parallel", script.len());

        // Segments are generated concurrently and joined back in script order.
        // Dropping the set on an early return aborts the segments still running.
        let mut tasks = JoinSet::new();
        for (i, text) in script.into_iter().enumerate() {
            let tts = self.tts.clone();
            tasks.spawn(async move { (i, tts.generate_audio(&text).await) });
        }

        let mut chunks: Vec<Option<Vec<u8>>> = vec![None; tasks.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, Ok(chunk))) => chunks[i] = Some(chunk),
                Ok((i, Err(e))) => {
                    error!("TTS generation failed for segment {}: {:?}", i + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Task join error during synthesis: {:?}", e);
                    return Err(PortError::Unexpected(e.to_string()));
                }
            }
        }

        let mut audio = BytesMut::new();
        for chunk in chunks.into_iter().flatten() {
            audio.extend_from_slice(&chunk);
        }

        Ok(NarrationTrack::Audio {
            data: Bytes::from(audio),
            mime_type: "audio/mpeg".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learning_viewer_core::domain::{Narrative, NarrativeSegment, NarrativeStyle};

    struct EchoTts;

    #[async_trait]
    impl TextToSpeechService for EchoTts {
        async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>> {
            Ok(format!("<{}>", text).into_bytes())
        }
    }

    fn segment(id: u32, content: &str) -> NarrativeSegment {
        NarrativeSegment {
            segment_id: id,
            title: format!("Part {}", id),
            content: content.to_string(),
            start_time: 0.0,
            end_time: 1.0,
            estimated_duration: 1.0,
        }
    }

    #[test]
    fn relative_audio_paths_join_the_base_url() {
        let narration = FileBackedNarration::new("http://localhost:8000/", "/media/fallback.mp3");
        assert_eq!(
            narration.resolve(Some("/public/generated/abc/narration.mp3")),
            "http://localhost:8000/public/generated/abc/narration.mp3"
        );
        assert_eq!(
            narration.resolve(Some("https://cdn.example/a.mp3")),
            "https://cdn.example/a.mp3"
        );
        assert_eq!(narration.resolve(Some("  ")), "/media/fallback.mp3");
        assert_eq!(narration.resolve(None), "/media/fallback.mp3");
    }

    #[tokio::test]
    async fn synthesized_audio_keeps_segment_order() {
        let narrative = Narrative {
            segments: vec![segment(1, "first"), segment(2, ""), segment(3, "second")],
            total_duration: 3.0,
            style: NarrativeStyle::Intuitive,
        };
        let narration = SynthesizedNarration::new(Arc::new(EchoTts));
        let track = narration
            .prepare(NarrationSource {
                audio_url: None,
                narrative: Some(&narrative),
            })
            .await
            .unwrap();
        match track {
            NarrationTrack::Audio { data, mime_type } => {
                assert_eq!(&data[..], b"<first><second>");
                assert_eq!(mime_type, "audio/mpeg");
            }
            other => panic!("expected synthesized audio, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn synthesis_without_narrative_is_not_found() {
        let narration = SynthesizedNarration::new(Arc::new(EchoTts));
        let result = narration
            .prepare(NarrationSource {
                audio_url: Some("/a.mp3"),
                narrative: None,
            })
            .await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    /// Fails "bad" at once; every other segment takes a while and is counted
    /// only if it runs to completion.
    struct SlowTts {
        completed: Arc<std::sync::atomic::AtomicU32>,
    }

    #[async_trait]
    impl TextToSpeechService for SlowTts {
        async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>> {
            if text == "bad" {
                return Err(PortError::Network("quota exceeded".to_string()));
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.completed
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(text.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn failed_segment_stops_the_remaining_syntheses() {
        let completed = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let narrative = Narrative {
            segments: vec![
                segment(1, "bad"),
                segment(2, "a"),
                segment(3, "b"),
                segment(4, "c"),
            ],
            total_duration: 4.0,
            style: NarrativeStyle::Intuitive,
        };
        let narration = SynthesizedNarration::new(Arc::new(SlowTts {
            completed: completed.clone(),
        }));

        let result = narration
            .prepare(NarrationSource {
                audio_url: None,
                narrative: Some(&narrative),
            })
            .await;
        assert!(matches!(result, Err(PortError::Network(_))));

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert_eq!(completed.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
