use std::time::Duration;

use crate::captions::{Cue, TranscriptLine};

/// Format an offset as zero-padded `HH:MM:SS`, flooring to whole seconds.
///
/// Hours are not wrapped at 24.
pub fn format_timestamp(offset: Duration) -> String {
    let total_seconds = offset.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Collapse newlines and runs of whitespace into single spaces and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn parsed cues into transcript lines.
///
/// Empty cues are dropped and a line is only kept when its text differs from the
/// previously kept line. Auto-generated captions repeat the same utterance across
/// overlapping windows; the comparison is against the immediate predecessor only, so
/// a phrase that legitimately recurs later is preserved.
pub fn normalize(cues: &[Cue]) -> Vec<TranscriptLine> {
    let mut lines: Vec<TranscriptLine> = Vec::with_capacity(cues.len());

    for cue in cues {
        let text = clean_text(&cue.text);
        if text.is_empty() {
            continue;
        }

        if lines.last().is_some_and(|previous| previous.text == text) {
            continue;
        }

        lines.push(TranscriptLine {
            offset_secs: cue.start.as_secs(),
            text,
        });
    }

    lines
}

/// Serialize lines as `[HH:MM:SS] text`, one per line
pub fn render(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
