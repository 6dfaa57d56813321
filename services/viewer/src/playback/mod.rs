//! services/viewer/src/playback/mod.rs
//!
//! Keeps progress, transcript and volume in step with one media element's
//! playback clock.

pub mod media;
pub mod synchronizer;
pub mod transcript;

pub use media::{HeadlessMedia, MediaElement, MediaEvent};
pub use synchronizer::{drive, PlaybackNotice, PlaybackState, PlaybackSynchronizer, Volume};
pub use transcript::{TranscriptCatalog, TranscriptLine};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("No narration has been loaded")]
    NoSource,
    #[error("Media error: {0}")]
    Media(String),
}

/// What a reset does to the revealed transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// The transcript belongs to the content and stays until new content loads.
    #[default]
    RetainTranscript,
    ClearTranscript,
}

/// Percentage of `duration` reached at `current_time`, clamped to `[0, 100]`.
///
/// An unknown or zero duration reports 0.
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if !(duration.is_finite() && duration > 0.0) || !current_time.is_finite() {
        return 0.0;
    }
    (current_time / duration * 100.0).clamp(0.0, 100.0)
}

/// Renders seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halfway_through_reports_fifty() {
        assert_eq!(progress_percent(59.0, 118.0), 50.0);
    }

    #[test]
    fn progress_stays_within_bounds() {
        let duration = 157.3;
        let mut t = 0.0;
        while t <= duration {
            let p = progress_percent(t, duration);
            assert!((0.0..=100.0).contains(&p), "{} at {}", p, t);
            t += 0.7;
        }
        assert_eq!(progress_percent(duration, duration), 100.0);
        assert_eq!(progress_percent(0.0, duration), 0.0);
        assert_eq!(progress_percent(200.0, duration), 100.0);
    }

    #[test]
    fn unknown_duration_reports_zero() {
        assert_eq!(progress_percent(10.0, 0.0), 0.0);
        assert_eq!(progress_percent(10.0, f64::NAN), 0.0);
        assert_eq!(progress_percent(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn time_is_formatted_as_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.9), "0:09");
        assert_eq!(format_time(157.0), "2:37");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
