use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::strategy::StrategyKind;

/// Opaque key for a single video
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who produced a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    /// Supplied by the content owner
    Authored,
    /// Produced by automatic speech recognition
    AutoGenerated,
}

impl TrackOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackOrigin::Authored => "authored",
            TrackOrigin::AutoGenerated => "auto-generated",
        }
    }
}

/// One discoverable caption source for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as reported upstream (e.g. `en`, `zh-Hant`)
    pub language_code: String,

    /// Authored or auto-generated
    pub origin: TrackOrigin,

    /// Whether upstream can machine-translate this track
    pub is_translatable: bool,

    /// Opaque handle used to fetch the payload (a URL for the HTTP service)
    pub fetch_descriptor: String,
}

impl CaptionTrack {
    pub fn new(
        language_code: impl Into<String>,
        origin: TrackOrigin,
        is_translatable: bool,
        fetch_descriptor: impl Into<String>,
    ) -> Self {
        Self {
            language_code: language_code.into(),
            origin,
            is_translatable,
            fetch_descriptor: fetch_descriptor.into(),
        }
    }

    pub fn is_authored(&self) -> bool {
        self.origin == TrackOrigin::Authored
    }
}

/// One timed caption unit before cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Duration,
    pub text: String,
}

impl Cue {
    pub fn new(start: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            text: text.into(),
        }
    }
}

/// Final output unit, rendered as `[HH:MM:SS] text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Whole seconds from the start of the video
    pub offset_secs: u64,

    /// Cleaned text
    pub text: String,
}

impl TranscriptLine {
    pub fn timestamp(&self) -> String {
        crate::normalize::format_timestamp(Duration::from_secs(self.offset_secs))
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp(), self.text)
    }
}

impl From<&TranscriptLine> for Cue {
    fn from(line: &TranscriptLine) -> Self {
        Cue::new(Duration::from_secs(line.offset_secs), line.text.clone())
    }
}

/// A complete transcript with the metadata of how it was obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: VideoId,

    /// Video title, when the upstream listing carried one
    pub title: Option<String>,

    /// Language actually delivered (the translation target when translated)
    pub language: Option<String>,

    /// Strategy that produced the cues
    pub source: StrategyKind,

    /// When the transcript was retrieved
    pub retrieved_at: chrono::DateTime<chrono::Utc>,

    /// Deduplicated, chronological lines
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Render the lines as `[HH:MM:SS] text`, one per line
    pub fn render(&self) -> String {
        crate::normalize::render(&self.lines)
    }
}

/// Per-identifier outcome of the acquisition chain
#[derive(Debug, Clone)]
pub enum AcquisitionResult {
    /// A complete transcript
    Success(Transcript),

    /// No caption track exists or is derivable
    NotFound,

    /// Upstream returned a payload in a format with no parser
    Unsupported,

    /// Network or process error that may succeed on retry
    TransientFailure(String),
}

impl AcquisitionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AcquisitionResult::Success(_))
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            AcquisitionResult::Success(transcript) => Some(transcript),
            _ => None,
        }
    }

    /// Short label for summaries and logs
    pub fn label(&self) -> &'static str {
        match self {
            AcquisitionResult::Success(_) => "success",
            AcquisitionResult::NotFound => "not found",
            AcquisitionResult::Unsupported => "unsupported",
            AcquisitionResult::TransientFailure(_) => "transient failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_line_display() {
        let line = TranscriptLine {
            offset_secs: 3725,
            text: "hello there".to_string(),
        };
        assert_eq!(line.to_string(), "[01:02:05] hello there");
    }

    #[test]
    fn test_line_converts_back_to_cue() {
        let line = TranscriptLine {
            offset_secs: 7,
            text: "hi".to_string(),
        };
        let cue = Cue::from(&line);
        assert_eq!(cue.start, Duration::from_secs(7));
        assert_eq!(cue.text, "hi");
    }

    #[test]
    fn test_video_id_watch_url() {
        let id = VideoId::new("dQw4w9WgXcQ");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ");
    }
}
