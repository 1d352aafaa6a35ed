use serde::Deserialize;
use std::time::Duration;

use super::{into_chronological, ParseError};
use crate::captions::Cue;

#[derive(Debug, Deserialize)]
struct EventStreamPayload {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,

    /// Absent on style/positioning-only events
    segs: Option<Vec<Segment>>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse the JSON event-stream caption format.
///
/// Each event with a segment list becomes one cue: segment texts are concatenated
/// and trimmed, and the cue starts at `tStartMs`. Events without segments, or whose
/// text is empty after trimming, are skipped.
pub fn parse_event_stream(payload: &str) -> Result<Vec<Cue>, ParseError> {
    let payload: EventStreamPayload = serde_json::from_str(payload.trim_start_matches('\u{feff}'))
        .map_err(|e| ParseError::Malformed(format!("event stream: {}", e)))?;

    let cues = payload
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text: String = segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.trim();

            if text.is_empty() {
                None
            } else {
                Some(Cue::new(Duration::from_millis(event.start_ms), text))
            }
        })
        .collect();

    Ok(into_chronological(cues))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_segments() {
        let payload = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 4000, "segs": [{"utf8": "hello"}, {"utf8": " world", "tOffsetMs": 400}]},
                {"tStartMs": 4200, "segs": [{"utf8": "  second line "}]}
            ]
        }"#;

        let cues = parse_event_stream(payload).unwrap();
        assert_eq!(
            cues,
            vec![
                Cue::new(Duration::from_millis(0), "hello world"),
                Cue::new(Duration::from_millis(4200), "second line"),
            ]
        );
    }

    #[test]
    fn test_skips_events_without_segments() {
        let payload = r#"{"events": [
            {"tStartMs": 0, "id": 1, "wpWinPosId": 1, "wsWinStyleId": 1},
            {"tStartMs": 1000, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 2000, "segs": [{"utf8": "kept"}]}
        ]}"#;

        let cues = parse_event_stream(payload).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, Duration::from_secs(2));
        assert_eq!(cues[0].text, "kept");
    }

    #[test]
    fn test_orders_by_start_time() {
        let payload = r#"{"events": [
            {"tStartMs": 5000, "segs": [{"utf8": "later"}]},
            {"tStartMs": 1000, "segs": [{"utf8": "first"}]},
            {"tStartMs": 5000, "segs": [{"utf8": "later tie"}]}
        ]}"#;

        let texts: Vec<String> = parse_event_stream(payload)
            .unwrap()
            .into_iter()
            .map(|cue| cue.text)
            .collect();
        assert_eq!(texts, vec!["first", "later", "later tie"]);
    }

    #[test]
    fn test_missing_events_is_empty() {
        assert!(parse_event_stream("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_event_stream("{\"events\": [").unwrap_err(),
            ParseError::Malformed(_)
        ));
    }
}
