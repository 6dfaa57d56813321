//! services/viewer/src/adapters/tts.rs
//!
//! This module contains the adapter for OpenAI's Text-to-Speech (TTS) service,
//! used by synthesized narration. It implements the `TextToSpeechService` port
//! from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use learning_viewer_core::ports::{PortError, PortResult, TextToSpeechService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextToSpeechService` port using the OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAiTtsAdapter {
    /// Creates a new `OpenAiTtsAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: SpeechModel, voice: Voice) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }

    /// Builds the adapter from an API key and a configured voice name.
    pub fn from_settings(api_key: &str, voice_name: &str) -> PortResult<Self> {
        let voice = parse_voice(voice_name)?;
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Ok(Self::new(client, SpeechModel::Tts1Hd, voice))
    }
}

/// Maps a configured voice name onto the API's voice enum.
pub fn parse_voice(name: &str) -> PortResult<Voice> {
    match name.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        _ => Err(PortError::Unexpected(format!(
            "Invalid TTS voice specified in config: '{}'",
            name
        ))),
    }
}

//=========================================================================================
// `TextToSpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextToSpeechService for OpenAiTtsAdapter {
    /// Generates MP3 audio for one narration segment.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>> {
        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            ..Default::default()
        };

        // Map the client error by hand; the orphan rule forbids a `From` impl here.
        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Network(e.to_string()))?;

        Ok(response.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_names_are_case_insensitive() {
        assert!(matches!(parse_voice("Nova"), Ok(Voice::Nova)));
        assert!(parse_voice("baritone").is_err());
    }
}
