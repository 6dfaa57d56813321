//! services/viewer/src/playback/media.rs
//!
//! The media element abstraction the synchronizer binds to, and a headless
//! implementation that advances its own clock.

use crate::playback::PlaybackError;
use learning_viewer_core::ports::NarrationTrack;

/// Native playback events, as a browser media element would fire them.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    Play,
    Pause,
    TimeUpdate { current_time: f64, duration: f64 },
    Ended,
    Error { message: String },
}

/// Commands a synchronizer issues to the element it owns.
pub trait MediaElement: Send {
    fn load(&mut self, track: &NarrationTrack) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    /// Output gain in `[0, 1]`.
    fn set_volume(&mut self, volume: f64);
}

/// A media element without audio output, driven by `advance`.
#[derive(Debug, Default)]
pub struct HeadlessMedia {
    track: Option<NarrationTrack>,
    duration: f64,
    position: f64,
    playing: bool,
    volume: f64,
}

impl HeadlessMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            volume: 1.0,
            ..Self::default()
        }
    }

    pub fn track(&self) -> Option<&NarrationTrack> {
        self.track.as_ref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Moves the clock forward by `seconds` while playing and returns the
    /// events the element would fire.
    pub fn advance(&mut self, seconds: f64) -> Vec<MediaEvent> {
        if !self.playing {
            return Vec::new();
        }
        self.position = (self.position + seconds).min(self.duration);
        let mut events = vec![MediaEvent::TimeUpdate {
            current_time: self.position,
            duration: self.duration,
        }];
        if self.position >= self.duration {
            self.playing = false;
            events.push(MediaEvent::Pause);
            events.push(MediaEvent::Ended);
        }
        events
    }
}

impl MediaElement for HeadlessMedia {
    fn load(&mut self, track: &NarrationTrack) -> Result<(), PlaybackError> {
        if let NarrationTrack::Audio { data, .. } = track {
            if data.is_empty() {
                return Err(PlaybackError::Media("audio track is empty".to_string()));
            }
        }
        self.track = Some(track.clone());
        self.position = 0.0;
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.track.is_none() {
            return Err(PlaybackError::NoSource);
        }
        if self.position >= self.duration {
            self.position = 0.0;
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, position: f64) {
        self.position = position.max(0.0).min(self.duration);
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }
}
