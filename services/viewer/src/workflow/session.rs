//! services/viewer/src/workflow/session.rs
//!
//! The user-facing learning session: validates input, runs one generation at a
//! time, reports coarse progress and records finished content in the history.

use crate::mindmap;
use crate::workflow::{GenerationClient, GenerationError, HistoryRepository};
use chrono::Utc;
use learning_viewer_core::domain::{
    CurrentSession, GeneratedContent, GenerationRequest, HistoryItem, ValidationError,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

const SUBMITTED_PERCENT: u8 = 20;
const PER_POLL_PERCENT: u8 = 5;
const POLLING_CEILING_PERCENT: u8 = 90;

/// What the generation workflow is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Idle,
    Initializing,
    Generating,
    Ready,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GenerationStage::Idle => "",
            GenerationStage::Initializing => "Initializing AI agents...",
            GenerationStage::Generating => "Generating mindmap and narrative...",
            GenerationStage::Ready => "Content ready!",
        };
        f.write_str(text)
    }
}

/// A progress indicator for the generate control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationProgress {
    pub percent: u8,
    pub stage: GenerationStage,
}

impl GenerationProgress {
    pub const IDLE: Self = Self {
        percent: 0,
        stage: GenerationStage::Idle,
    };
}

/// Clears the in-flight flag when a generation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct LearningSession {
    client: GenerationClient,
    history: HistoryRepository,
    in_flight: AtomicBool,
    progress: watch::Sender<GenerationProgress>,
}

impl LearningSession {
    pub fn new(client: GenerationClient, history: HistoryRepository) -> Self {
        let (progress, _) = watch::channel(GenerationProgress::IDLE);
        Self {
            client,
            history,
            in_flight: AtomicBool::new(false),
            progress,
        }
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn history(&self) -> &HistoryRepository {
        &self.history
    }

    /// Progress updates for the generation in flight.
    pub fn subscribe(&self) -> watch::Receiver<GenerationProgress> {
        self.progress.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Validates a raw query and generates content for it with default options.
    pub async fn generate_query(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedContent, GenerationError> {
        let request = GenerationRequest::new(query)?;
        self.generate(&request, cancel).await
    }

    /// Submits `request`, waits for the job and records the result.
    ///
    /// A second call while one is outstanding fails with `InProgress`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedContent, GenerationError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GenerationError::InProgress);
        }
        let _guard = InFlight(&self.in_flight);

        let result = self.run(request, cancel).await;
        match &result {
            Ok(content) => {
                self.publish(100, GenerationStage::Ready);
                info!(session_id = %content.session_id, topic = %content.topic, "Content generated.");
            }
            Err(e) => {
                self.publish(0, GenerationStage::Idle);
                error!("Generation error: {}", e);
            }
        }
        result
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedContent, GenerationError> {
        self.publish(0, GenerationStage::Initializing);
        let session_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            id = self.client.submit(request) => id?,
        };
        self.publish(SUBMITTED_PERCENT, GenerationStage::Generating);

        let content = self
            .client
            .await_completion_with(&session_id, self.client.policy(), cancel, |attempt| {
                let step = PER_POLL_PERCENT.saturating_mul(attempt.attempt.min(255) as u8);
                let percent = SUBMITTED_PERCENT
                    .saturating_add(step)
                    .min(POLLING_CEILING_PERCENT);
                self.publish(percent, GenerationStage::Generating);
            })
            .await?;

        self.remember(request.query(), &content).await;
        Ok(content)
    }

    /// Records generated content. A storage failure does not discard the content.
    async fn remember(&self, query: &str, content: &GeneratedContent) {
        let item = HistoryItem::from_generation(query, content);
        if let Err(e) = self.history.record(&item).await {
            warn!("Failed to record history entry {}: {}", item.id, e);
        }
        let current = CurrentSession {
            item,
            generated: Some(content.clone()),
            mindmap_code: None,
        };
        if let Err(e) = self.history.set_current(&current).await {
            warn!("Failed to store the current session: {}", e);
        }
    }

    /// Loads hand-pasted text as the current content, without any request.
    pub async fn upload(
        &self,
        title: &str,
        subject: Option<&str>,
        chapter: Option<&str>,
        text: &str,
    ) -> Result<CurrentSession, GenerationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let item = HistoryItem {
            id: Uuid::new_v4().to_string(),
            query: title.to_string(),
            subject: non_blank(subject),
            chapter: non_blank(chapter),
            content: Some(text.to_string()),
            session_id: None,
            created_at: Utc::now(),
        };
        let session = CurrentSession {
            mindmap_code: Some(mindmap::from_text(title, text)),
            item,
            generated: None,
        };
        self.history.record(&session.item).await?;
        self.history.set_current(&session).await?;
        info!(id = %session.item.id, "Uploaded content loaded.");
        Ok(session)
    }

    fn publish(&self, percent: u8, stage: GenerationStage) {
        self.progress.send_replace(GenerationProgress { percent, stage });
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
