//! services/viewer/src/workflow/state.rs
//!
//! Defines the viewer's shared state: the configured adapters behind their ports.

use crate::adapters::{
    FileBackedNarration, FileStore, HttpGenerationAdapter, MemoryStore, OpenAiTtsAdapter,
    SynthesizedNarration,
};
use crate::config::{Config, NarrationMode};
use crate::error::ViewerError;
use crate::workflow::{GenerationClient, HistoryRepository, LearningSession};
use learning_viewer_core::ports::{ContentGenerationService, KeyValueStore, NarrationService};
use std::sync::Arc;
use tracing::info;

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generation: Arc<dyn ContentGenerationService>,
    pub store: Arc<dyn KeyValueStore>,
    pub narration: Arc<dyn NarrationService>,
    /// Shared so that every session serializes its writes on one lock.
    history: HistoryRepository,
}

impl AppState {
    /// Wires the adapters selected by `config`.
    pub fn from_config(config: Config) -> Result<Self, ViewerError> {
        let generation = Arc::new(HttpGenerationAdapter::new(
            &config.api_base_url,
            config.request_timeout,
        )?);

        let store: Arc<dyn KeyValueStore> = match &config.store_path {
            Some(path) => {
                info!("Persisting viewer state to {}", path.display());
                Arc::new(FileStore::new(path))
            }
            None => {
                info!("No STORE_PATH set; viewer state lives in memory.");
                Arc::new(MemoryStore::new())
            }
        };

        let narration: Arc<dyn NarrationService> = match config.narration_mode {
            NarrationMode::File => Arc::new(FileBackedNarration::new(
                &config.api_base_url,
                &config.fallback_audio_path,
            )),
            NarrationMode::Synthesized => {
                let api_key = config.openai_api_key.as_deref().ok_or_else(|| {
                    ViewerError::Internal("OPENAI_API_KEY is required".to_string())
                })?;
                let tts = Arc::new(OpenAiTtsAdapter::from_settings(api_key, &config.tts_voice)?);
                Arc::new(SynthesizedNarration::new(tts))
            }
        };

        Ok(Self {
            config: Arc::new(config),
            generation,
            history: HistoryRepository::new(store.clone()),
            store,
            narration,
        })
    }

    pub fn history(&self) -> HistoryRepository {
        self.history.clone()
    }

    /// A fresh learning session over the shared adapters.
    pub fn learning_session(&self) -> LearningSession {
        LearningSession::new(
            GenerationClient::new(self.generation.clone(), self.config.poll),
            self.history(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use learning_viewer_core::domain::HistoryItem;
    use std::collections::HashMap;

    fn item(id: &str) -> HistoryItem {
        HistoryItem {
            id: id.to_string(),
            query: id.to_string(),
            subject: None,
            chapter: None,
            content: None,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn histories_handed_out_share_one_write_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        let vars = HashMap::from([("STORE_PATH", path.to_string_lossy().into_owned())]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let app_state = AppState::from_config(config).unwrap();

        let (first, second) = (app_state.history(), app_state.history());
        let (item_a, item_b) = (item("a"), item("b"));
        let (a, b) = tokio::join!(first.record(&item_a), second.record(&item_b));
        a.unwrap();
        b.unwrap();

        assert_eq!(app_state.history().list().await.unwrap().len(), 2);
    }
}
