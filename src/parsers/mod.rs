use crate::captions::Cue;

pub mod event_stream;
pub mod timed_text;

pub use event_stream::parse_event_stream;
pub use timed_text::parse_timed_text;

/// Errors raised while turning a raw payload into cues
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Unsupported caption payload format")]
    UnsupportedFormat,

    #[error("Malformed caption payload: {0}")]
    Malformed(String),
}

/// Wire formats the engine knows how to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    /// JSON with `events[].tStartMs` and `events[].segs[].utf8`
    EventStream,
    /// WebVTT / SRT style blocks separated by blank lines
    TimedText,
}

impl CaptionFormat {
    /// Sniff the format of a payload from its leading bytes
    pub fn detect(payload: &str) -> Option<Self> {
        let head = payload.trim_start_matches('\u{feff}').trim_start();

        if head.starts_with('{') {
            return Some(CaptionFormat::EventStream);
        }

        if head.starts_with("WEBVTT") || head.contains("-->") {
            return Some(CaptionFormat::TimedText);
        }

        None
    }
}

/// Parse a payload of unknown format with the matching parser
pub fn parse_payload(payload: &str) -> Result<Vec<Cue>, ParseError> {
    match CaptionFormat::detect(payload) {
        Some(CaptionFormat::EventStream) => parse_event_stream(payload),
        Some(CaptionFormat::TimedText) => Ok(parse_timed_text(payload)),
        None => Err(ParseError::UnsupportedFormat),
    }
}

/// Order cues chronologically; ties keep their source order
pub(crate) fn into_chronological(mut cues: Vec<Cue>) -> Vec<Cue> {
    // sort_by_key is stable
    cues.sort_by_key(|cue| cue.start);
    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        assert_eq!(CaptionFormat::detect(r#"{"events":[]}"#), Some(CaptionFormat::EventStream));
        assert_eq!(CaptionFormat::detect("\u{feff}WEBVTT\n\n"), Some(CaptionFormat::TimedText));
        assert_eq!(
            CaptionFormat::detect("1\n00:00:01,000 --> 00:00:02,000\nhi\n"),
            Some(CaptionFormat::TimedText)
        );
        assert_eq!(CaptionFormat::detect("<?xml version=\"1.0\"?><transcript/>"), None);
    }

    #[test]
    fn test_parse_payload_rejects_unknown_format() {
        let err = parse_payload("<transcript><text start=\"0\">hi</text></transcript>").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat));
    }

    #[test]
    fn test_parse_payload_dispatches() {
        let cues = parse_payload(r#"{"events":[{"tStartMs":1500,"segs":[{"utf8":"hi"}]}]}"#).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "hi");
    }
}
