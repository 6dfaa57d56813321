//! services/viewer/src/playback/transcript.rs
//!
//! Timed transcript lines and the built-in, topic-keyed transcript catalog.

use crate::playback::format_time;
use learning_viewer_core::domain::Narrative;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptLine {
    /// `(start, end)` in seconds; `None` for untimed lines.
    pub span: Option<(f64, f64)>,
    pub text: String,
}

impl TranscriptLine {
    pub fn timed(start: f64, end: f64, text: &str) -> Self {
        Self {
            span: Some((start, end)),
            text: text.to_string(),
        }
    }

    pub fn untimed(text: &str) -> Self {
        Self {
            span: None,
            text: text.to_string(),
        }
    }

    /// Parses `[m:ss - m:ss] text`; anything else becomes an untimed line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(caps) = timestamp_pattern().captures(line) else {
            return Self::untimed(line);
        };
        let secs = |m: usize, s: usize| -> f64 {
            let minutes: f64 = caps[m].parse().unwrap_or(0.0);
            let seconds: f64 = caps[s].parse().unwrap_or(0.0);
            minutes * 60.0 + seconds
        };
        let (start, end) = (secs(1, 2), secs(3, 4));
        if end < start {
            return Self::untimed(line);
        }
        Self::timed(start, end, &caps[5])
    }

    /// Ranges are written at whole-second granularity, so a line stays
    /// active until the next second after its end.
    pub fn covers(&self, position: f64) -> bool {
        match self.span {
            Some((start, end)) => position >= start && position < end + 1.0,
            None => false,
        }
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some((start, end)) => write!(
                f,
                "[{} - {}] {}",
                format_time(start),
                format_time(end),
                self.text
            ),
            None => f.write_str(&self.text),
        }
    }
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[(\d+):(\d{2})\s*-\s*(\d+):(\d{2})\]\s*(.*)$")
            .unwrap_or_else(|e| unreachable!("timestamp pattern is valid: {}", e))
    })
}

/// Transcript lines built from generated narrative segments.
pub fn from_narrative(narrative: &Narrative) -> Vec<TranscriptLine> {
    narrative
        .segments
        .iter()
        .map(|s| TranscriptLine::timed(s.start_time, s.end_time, &s.content))
        .collect()
}

/// The active line for `position`, if any timed line covers it.
pub fn active_line(lines: &[TranscriptLine], position: f64) -> Option<&TranscriptLine> {
    lines.iter().find(|line| line.covers(position))
}

//=========================================================================================
// Built-in Catalog
//=========================================================================================

const DERIVATIVE_INTUITION: &[&str] = &[
    "[0:00 - 0:10] You're driving down the highway, and your speedometer reads 60 miles per hour. But here's a puzzling question: what does that number actually mean right now, at this exact instant?",
    "[0:11 - 0:20] Speed is distance divided by time. But at a single frozen moment, no time has passed and no distance has been covered. So how can you have a speed? This paradox stumped mathematicians for two thousand years.",
    "[0:21 - 0:30] Newton and Leibniz had a brilliant insight in the 1600s: you can't measure an instant directly, but you can get infinitely close to it.",
    "[0:31 - 0:50] Imagine calculating your average speed over one minute. Then over one second. Then over one millisecond. As you shrink the time interval closer and closer to zero, your average speed approaches a specific number. That number, the one you're approaching but never quite calculating with actual zero time, is your instantaneous speed. That's a derivative.",
    "[0:51 - 1:05] Here's another way to see it. Draw a curve on paper. Pick a point on it, then pick another point nearby. Connect them with a straight line. That line's slope tells you the average rate of change between those points.",
    "[1:06 - 1:20] Now slide the second point closer... closer... infinitely close. The line rotates until it just barely kisses the curve at a single point. It becomes a tangent line. The slope of that tangent line is the derivative.",
    "[1:21 - 1:30] A derivative measures how fast something is changing at a precise moment. It's the instantaneous rate of change.",
    "[1:31 - 1:50] Position changing over time? The derivative is velocity. Velocity changing? The derivative is acceleration. A hillside's height changing? The derivative is the steepness. Temperature changing? The derivative tells you how fast it's rising or falling.",
    "[1:51 - 2:05] For the simple function f of x equals x squared, the derivative is f prime of x equals 2x. At any point, the curve's steepness is exactly twice the x-value. At x equals zero, it's flat. At x equals 2, it's rising with a slope of 4.",
    "[2:06 - 2:25] Before derivatives, we could only understand average behavior. With derivatives, we can analyze change with perfect precision at every single point. This unlocked modern physics, engineering, economics, and nearly every field that deals with change and motion.",
    "[2:26 - 2:40] The derivative is our mathematical way of capturing something profound: the rate of change in an ever-changing world. It lets us freeze a moment and ask, what's happening right now? That simple question, and its answer, changed everything.",
];

const ANIMATION_WALKTHROUGH: &[&str] = &[
    "Welcome to this animated explanation of the concept.",
    "We'll start by introducing the fundamental principles.",
    "First, let's examine the core components and their relationships.",
    "Notice how each element interacts with the others in the system.",
    "This animation demonstrates the process step by step.",
    "Finally, we'll see how everything comes together to form a complete understanding.",
];

/// Static transcripts looked up by topic.
#[derive(Debug, Clone)]
pub struct TranscriptCatalog {
    entries: Vec<(String, Vec<TranscriptLine>)>,
    fallback: Vec<TranscriptLine>,
}

impl TranscriptCatalog {
    pub fn new(fallback: Vec<TranscriptLine>) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// The transcripts that ship with the viewer.
    pub fn builtin() -> Self {
        let parse = |lines: &[&str]| -> Vec<TranscriptLine> {
            lines.iter().map(|l| TranscriptLine::parse(l)).collect()
        };
        Self::new(parse(ANIMATION_WALKTHROUGH)).with_entry("derivative", parse(DERIVATIVE_INTUITION))
    }

    pub fn with_entry(mut self, key: &str, lines: Vec<TranscriptLine>) -> Self {
        self.entries.push((key.to_lowercase(), lines));
        self
    }

    /// First entry whose key occurs in `topic`, ignoring case.
    pub fn lookup(&self, topic: &str) -> Option<&[TranscriptLine]> {
        let topic = topic.to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| topic.contains(key.as_str()))
            .map(|(_, lines)| lines.as_slice())
    }

    /// Lookup with the generic walkthrough as a last resort.
    pub fn lookup_or_fallback(&self, topic: &str) -> &[TranscriptLine] {
        self.lookup(topic).unwrap_or(&self.fallback)
    }

    /// Segments of the narrative when it has any, otherwise the catalog entry.
    pub fn for_content(&self, topic: &str, narrative: Option<&Narrative>) -> Vec<TranscriptLine> {
        match narrative {
            Some(n) if !n.segments.is_empty() => from_narrative(n),
            _ => self.lookup_or_fallback(topic).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learning_viewer_core::domain::{NarrativeSegment, NarrativeStyle};

    #[test]
    fn timestamped_line_parses() {
        let line = TranscriptLine::parse("[1:06 - 1:20] Now slide the second point closer.");
        assert_eq!(line.span, Some((66.0, 80.0)));
        assert_eq!(line.text, "Now slide the second point closer.");
        assert_eq!(line.to_string(), "[1:06 - 1:20] Now slide the second point closer.");
    }

    #[test]
    fn plain_line_is_untimed() {
        let line = TranscriptLine::parse("Welcome to this animated explanation.");
        assert_eq!(line.span, None);
        assert!(!line.covers(0.0));
    }

    #[test]
    fn active_line_bridges_whole_second_gaps() {
        let catalog = TranscriptCatalog::builtin();
        let lines = catalog.lookup("Derivatives in Calculus").unwrap();
        assert_eq!(lines.len(), 11);
        assert!(active_line(lines, 10.5).unwrap().text.starts_with("You're driving"));
        assert!(active_line(lines, 11.0).unwrap().text.starts_with("Speed is distance"));
        assert!(active_line(lines, 200.0).is_none());
    }

    #[test]
    fn unknown_topic_falls_back_to_walkthrough() {
        let catalog = TranscriptCatalog::builtin();
        assert!(catalog.lookup("Photosynthesis").is_none());
        assert_eq!(catalog.lookup_or_fallback("Photosynthesis").len(), 6);
    }

    #[test]
    fn narrative_segments_take_precedence() {
        let narrative = Narrative {
            segments: vec![NarrativeSegment {
                segment_id: 1,
                title: "Hook".to_string(),
                content: "Limits approach a value.".to_string(),
                start_time: 0.0,
                end_time: 8.5,
                estimated_duration: 8.5,
            }],
            total_duration: 8.5,
            style: NarrativeStyle::Formal,
        };
        let lines = TranscriptCatalog::builtin().for_content("Derivatives", Some(&narrative));
        assert_eq!(lines, vec![TranscriptLine::timed(0.0, 8.5, "Limits approach a value.")]);
    }
}
