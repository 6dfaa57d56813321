//! services/viewer/src/playback/synchronizer.rs
//!
//! A state machine over one media element: Idle, Playing, Paused, Ended.
//! Native events move it forward; user controls issue commands to the element
//! and apply the matching transition at once, so a late native event repeats
//! a transition that already happened and changes nothing.

use crate::playback::media::{MediaElement, MediaEvent};
use crate::playback::transcript::{active_line, TranscriptLine};
use crate::playback::{format_time, progress_percent, PlaybackError, ResetPolicy};
use futures::{Stream, StreamExt};
use learning_viewer_core::ports::NarrationTrack;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_VOLUME: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Ended,
}

/// Transient notifications for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    Playing,
    Paused,
    Completed,
    Reset,
    Muted,
    Unmuted,
    Error(String),
}

/// Linear level in `[0, 100]` plus an independent mute flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    pub level: u8,
    pub muted: bool,
}

impl Volume {
    /// Gain handed to the media element.
    pub fn effective(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            f64::from(self.level) / 100.0
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            level: DEFAULT_VOLUME,
            muted: false,
        }
    }
}

pub struct PlaybackSynchronizer<M: MediaElement> {
    media: M,
    state: PlaybackState,
    progress: f64,
    current_time: f64,
    duration: Option<f64>,
    /// Revealed lines; empty until playback first starts.
    transcript: Vec<TranscriptLine>,
    /// Lines associated with the loaded content.
    associated: Vec<TranscriptLine>,
    volume: Volume,
    reset_policy: ResetPolicy,
}

impl<M: MediaElement> PlaybackSynchronizer<M> {
    pub fn new(mut media: M, associated: Vec<TranscriptLine>, reset_policy: ResetPolicy) -> Self {
        let volume = Volume::default();
        media.set_volume(volume.effective());
        Self {
            media,
            state: PlaybackState::Idle,
            progress: 0.0,
            current_time: 0.0,
            duration: None,
            transcript: Vec::new(),
            associated,
            volume,
            reset_policy,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// The revealed line covering the current position.
    pub fn active_line(&self) -> Option<&TranscriptLine> {
        active_line(&self.transcript, self.current_time)
    }

    /// `m:ss / m:ss`
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.current_time),
            format_time(self.duration.unwrap_or(0.0))
        )
    }

    /// Replaces the content: new source, new associated transcript, fresh clock.
    pub fn load(
        &mut self,
        track: &NarrationTrack,
        associated: Vec<TranscriptLine>,
    ) -> Result<(), PlaybackError> {
        self.media.pause();
        self.media.load(track)?;
        self.media.set_volume(self.volume.effective());
        self.state = PlaybackState::Idle;
        self.progress = 0.0;
        self.current_time = 0.0;
        self.duration = None;
        self.transcript.clear();
        self.associated = associated;
        info!("Narration loaded.");
        Ok(())
    }

    /// Applies one native media event.
    pub fn handle_event(&mut self, event: MediaEvent) -> Option<PlaybackNotice> {
        match event {
            MediaEvent::LoadedMetadata { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.duration = Some(duration);
                }
                None
            }
            MediaEvent::Play => {
                if self.state != PlaybackState::Playing {
                    debug!(from = ?self.state, "Playback started.");
                    self.state = PlaybackState::Playing;
                }
                if self.transcript.is_empty() {
                    self.transcript = self.associated.clone();
                }
                None
            }
            MediaEvent::Pause => {
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                }
                None
            }
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                if duration.is_finite() && duration > 0.0 {
                    self.duration = Some(duration);
                }
                if !current_time.is_finite() {
                    return None;
                }
                match self.state {
                    PlaybackState::Playing => {
                        self.current_time = current_time.max(0.0);
                        self.progress =
                            progress_percent(self.current_time, self.duration.unwrap_or(0.0));
                    }
                    // A seek while paused moves the clock but progress stays frozen.
                    PlaybackState::Paused => self.current_time = current_time.max(0.0),
                    PlaybackState::Idle | PlaybackState::Ended => {}
                }
                None
            }
            MediaEvent::Ended => {
                if self.state == PlaybackState::Ended {
                    return None;
                }
                self.state = PlaybackState::Ended;
                self.progress = 100.0;
                if let Some(duration) = self.duration {
                    self.current_time = duration;
                }
                info!("Narration completed.");
                Some(PlaybackNotice::Completed)
            }
            MediaEvent::Error { message } => {
                warn!("Media error: {}", message);
                self.media.pause();
                self.state = PlaybackState::Idle;
                self.progress = 0.0;
                self.current_time = 0.0;
                Some(PlaybackNotice::Error(message))
            }
        }
    }

    /// Play/pause control. A failed play leaves the synchronizer Idle.
    pub fn toggle_play(&mut self) -> PlaybackNotice {
        if self.state == PlaybackState::Playing {
            self.media.pause();
            self.handle_event(MediaEvent::Pause);
            return PlaybackNotice::Paused;
        }
        if self.state == PlaybackState::Ended {
            self.media.seek(0.0);
            self.current_time = 0.0;
            self.progress = 0.0;
        }
        match self.media.play() {
            Ok(()) => {
                self.handle_event(MediaEvent::Play);
                PlaybackNotice::Playing
            }
            Err(e) => self
                .handle_event(MediaEvent::Error {
                    message: e.to_string(),
                })
                .unwrap_or(PlaybackNotice::Error(e.to_string())),
        }
    }

    /// Stops and rewinds to zero from any state.
    pub fn reset(&mut self) -> PlaybackNotice {
        self.media.pause();
        self.media.seek(0.0);
        self.state = PlaybackState::Idle;
        self.progress = 0.0;
        self.current_time = 0.0;
        if self.reset_policy == ResetPolicy::ClearTranscript {
            self.transcript.clear();
        }
        info!("Narration reset.");
        PlaybackNotice::Reset
    }

    pub fn set_volume(&mut self, level: u8) {
        self.volume.level = level.min(100);
        self.media.set_volume(self.volume.effective());
    }

    pub fn toggle_mute(&mut self) -> PlaybackNotice {
        self.volume.muted = !self.volume.muted;
        self.media.set_volume(self.volume.effective());
        if self.volume.muted {
            PlaybackNotice::Muted
        } else {
            PlaybackNotice::Unmuted
        }
    }
}

/// Feeds native events into `sync` until the stream ends or `cancel` fires,
/// forwarding notices. Cancelling is how a torn-down view stops updates.
pub async fn drive<M, S>(
    sync: &mut PlaybackSynchronizer<M>,
    mut events: S,
    cancel: &CancellationToken,
    notices: &mpsc::UnboundedSender<PlaybackNotice>,
) where
    M: MediaElement,
    S: Stream<Item = MediaEvent> + Unpin,
{
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Playback driver cancelled.");
                return;
            }
            event = events.next() => event,
        };
        let Some(event) = event else {
            return;
        };
        if let Some(notice) = sync.handle_event(event) {
            if notices.send(notice).is_err() {
                debug!("Notice receiver dropped; stopping playback driver.");
                return;
            }
        }
    }
}
