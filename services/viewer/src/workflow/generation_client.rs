//! services/viewer/src/workflow/generation_client.rs
//!
//! The request/poll/fetch protocol against the remote generation service.

use crate::config::PollPolicy;
use crate::workflow::GenerationError;
use learning_viewer_core::domain::{GeneratedContent, GenerationRequest, JobState, JobStatus};
use learning_viewer_core::ports::{ContentGenerationService, PortResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_FAILURE_MESSAGE: &str = "Content generation failed";

/// One observed status check of a polling loop.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: JobStatus,
}

/// Drives a single remote job from submission to its final content.
///
/// Status checks within one `await_completion` call are strictly sequential.
/// Running two loops for the same job at once is the caller's mistake to avoid.
pub struct GenerationClient {
    service: Arc<dyn ContentGenerationService>,
    policy: PollPolicy,
    session_id: Mutex<Option<String>>,
}

impl GenerationClient {
    pub fn new(service: Arc<dyn ContentGenerationService>, policy: PollPolicy) -> Self {
        Self {
            service,
            policy,
            session_id: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// The job identifier returned by the most recent successful `submit`.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    pub async fn submit(&self, request: &GenerationRequest) -> PortResult<String> {
        info!(query = request.query(), style = %request.narrative_style(), "Submitting generation request.");
        let session_id = self.service.submit(request).await?;
        *self.session_id.lock().await = Some(session_id.clone());
        info!(session_id = %session_id, "Generation job started.");
        Ok(session_id)
    }

    pub async fn poll_status(&self, session_id: &str) -> PortResult<JobStatus> {
        self.service.poll_status(session_id).await
    }

    /// Only meaningful once the job has reported `completed`.
    pub async fn fetch_content(&self, session_id: &str) -> PortResult<GeneratedContent> {
        self.service.fetch_content(session_id).await
    }

    /// Polls with the client's configured policy.
    pub async fn await_completion(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratedContent, GenerationError> {
        self.await_completion_with(session_id, self.policy, cancel, |_| {})
            .await
    }

    /// Polls `session_id` until it resolves, spacing checks by `policy.interval`.
    ///
    /// `completed` triggers exactly one content fetch; `failed` ends the loop
    /// without one; `processing` and `not_found` keep polling. A failed request
    /// is returned as-is, never retried. `observe` sees every status received.
    pub async fn await_completion_with<F>(
        &self,
        session_id: &str,
        policy: PollPolicy,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Result<GeneratedContent, GenerationError>
    where
        F: FnMut(&PollAttempt),
    {
        for attempt in 1..=policy.max_attempts {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                status = self.poll_status(session_id) => status?,
            };
            debug!(
                session_id,
                attempt,
                max_attempts = policy.max_attempts,
                state = ?status.state,
                "Status check."
            );

            let state = status.state;
            let message = status.message.clone();
            observe(&PollAttempt {
                attempt,
                max_attempts: policy.max_attempts,
                status,
            });

            match state {
                JobState::Completed => {
                    info!(session_id, attempt, "Generation completed, fetching content.");
                    let content = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                        content = self.fetch_content(session_id) => content?,
                    };
                    return Ok(content);
                }
                JobState::Failed => {
                    let message = message.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                    warn!(session_id, attempt, %message, "Generation failed.");
                    return Err(GenerationError::Failed { message });
                }
                JobState::Processing | JobState::NotFound => {}
            }

            if attempt < policy.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }

        warn!(session_id, attempts = policy.max_attempts, "Generation timed out.");
        Err(GenerationError::Timeout {
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use learning_viewer_core::domain::{Narrative, NarrativeStyle};
    use learning_viewer_core::ports::PortError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Replays a fixed list of status answers and counts every call.
    struct ScriptedService {
        statuses: StdMutex<VecDeque<PortResult<JobState>>>,
        message: Option<String>,
        polls: AtomicU32,
        fetches: AtomicU32,
    }

    impl ScriptedService {
        fn new(statuses: Vec<PortResult<JobState>>) -> Self {
            Self {
                statuses: StdMutex::new(statuses.into()),
                message: None,
                polls: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
            }
        }

        fn with_message(mut self, message: &str) -> Self {
            self.message = Some(message.to_string());
            self
        }
    }

    #[async_trait]
    impl ContentGenerationService for ScriptedService {
        async fn submit(&self, _request: &GenerationRequest) -> PortResult<String> {
            Ok("abc123".to_string())
        }

        async fn poll_status(&self, session_id: &str) -> PortResult<JobStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(JobState::Processing));
            next.map(|state| JobStatus {
                session_id: session_id.to_string(),
                state,
                topic: None,
                message: self.message.clone(),
            })
        }

        async fn fetch_content(&self, session_id: &str) -> PortResult<GeneratedContent> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedContent {
                session_id: session_id.to_string(),
                topic: "Derivatives".to_string(),
                mindmap_code: "mindmap".to_string(),
                audio_url: "/a.mp3".to_string(),
                video_url: "/v.mp4".to_string(),
                narrative: Narrative {
                    segments: Vec::new(),
                    total_duration: 0.0,
                    style: NarrativeStyle::Intuitive,
                },
                assets: "{}".to_string(),
            })
        }
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    fn client(service: &Arc<ScriptedService>, policy: PollPolicy) -> GenerationClient {
        GenerationClient::new(service.clone(), policy)
    }

    #[tokio::test]
    async fn submit_records_the_session_id() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let client = client(&service, fast(1));
        assert_eq!(client.session_id().await, None);
        let request = GenerationRequest::new("Derivatives in Calculus").unwrap();
        let id = client.submit(&request).await.unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(client.session_id().await.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn completes_after_processing_with_one_fetch() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok(JobState::Processing),
            Ok(JobState::NotFound),
            Ok(JobState::Processing),
            Ok(JobState::Completed),
        ]));
        let client = client(&service, fast(60));
        let mut seen = Vec::new();
        let content = client
            .await_completion_with("abc123", fast(60), &CancellationToken::new(), |a| {
                seen.push(a.attempt)
            })
            .await
            .unwrap();

        assert_eq!(content.topic, "Derivatives");
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(service.polls.load(Ordering::SeqCst), 4);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_status_stops_without_fetching() {
        let service = Arc::new(
            ScriptedService::new(vec![Ok(JobState::Processing), Ok(JobState::Failed)])
                .with_message("rate limited"),
        );
        let client = client(&service, fast(60));
        let err = client
            .await_completion("abc123", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Failed { ref message } if message == "rate limited"));
        assert_eq!(service.polls.load(Ordering::SeqCst), 2);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_status_without_message_uses_default_text() {
        let service = Arc::new(ScriptedService::new(vec![Ok(JobState::Failed)]));
        let err = client(&service, fast(5))
            .await_completion("abc123", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Content generation failed");
    }

    #[tokio::test]
    async fn exhausting_attempts_times_out_without_fetching() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let err = client(&service, fast(60))
            .await_completion("abc123", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { attempts: 60 }));
        assert_eq!(service.polls.load(Ordering::SeqCst), 60);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok(JobState::Processing),
            Err(PortError::Network("connection refused".to_string())),
            Ok(JobState::Completed),
        ]));
        let err = client(&service, fast(60))
            .await_completion("abc123", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Port(PortError::Network(_))));
        assert_eq!(service.polls.load(Ordering::SeqCst), 2);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_delay() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let slow = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 60,
        };
        let client = client(&service, slow);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = client.await_completion("abc123", &cancel).await.unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(service.polls.load(Ordering::SeqCst), 1);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_poll() {
        let service = Arc::new(ScriptedService::new(vec![Ok(JobState::Completed)]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client(&service, fast(3))
            .await_completion("abc123", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(service.polls.load(Ordering::SeqCst), 0);
    }
}
