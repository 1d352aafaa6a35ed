use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use super::into_chronological;
use crate::captions::Cue;

fn block_separator_regex() -> &'static Regex {
    static BLOCK_SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();
    BLOCK_SEPARATOR_REGEX
        .get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("Failed to compile block separator regex"))
}

fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP_REGEX.get_or_init(|| {
        Regex::new(r"(\d{2,}):(\d{2}):(\d{2})(?:[.,](\d{3}))?").expect("Failed to compile timestamp regex")
    })
}

fn html_tag_regex() -> &'static Regex {
    static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    HTML_TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile HTML tag regex"))
}

fn cue_setting_regex() -> &'static Regex {
    static CUE_SETTING_REGEX: OnceLock<Regex> = OnceLock::new();
    CUE_SETTING_REGEX.get_or_init(|| {
        Regex::new(r"\b(?:align|position|kind|line):\S+").expect("Failed to compile cue setting regex")
    })
}

/// Parse the line-oriented timed-text markup format (WebVTT, and SRT which shares its shape).
///
/// Blocks are separated by blank lines. Header, `STYLE`, `NOTE` and `REGION` blocks and
/// blocks without an `HH:MM:SS` timestamp are dropped. The first timestamp in a block is
/// the cue start; everything after the time-range line (the whole block when there is
/// none) is cue text with tags, cue settings and `&nbsp;` removed, its non-empty lines
/// joined by a single space.
pub fn parse_timed_text(payload: &str) -> Vec<Cue> {
    let payload = payload
        .strip_prefix('\u{feff}')
        .unwrap_or(payload)
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let cues = block_separator_regex()
        .split(&payload)
        .filter_map(parse_block)
        .collect();

    into_chronological(cues)
}

/// Header and metadata blocks, which may carry timestamps but never cue text
const NON_CUE_BLOCKS: &[&str] = &["WEBVTT", "NOTE", "STYLE", "REGION"];

fn parse_block(block: &str) -> Option<Cue> {
    let first_line = block.trim_start().lines().next()?;
    let is_non_cue = NON_CUE_BLOCKS.iter().any(|keyword| {
        first_line
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    });
    if is_non_cue {
        return None;
    }

    let captures = timestamp_regex().captures(block)?;
    let start = captured_offset(&captures)?;

    let lines: Vec<&str> = block.lines().collect();

    // Cue identifiers sit above the time range, so only what follows it is text.
    // A block split off by a whitespace-only line has no time range and is all text.
    let text_start = lines
        .iter()
        .position(|line| line.contains("-->"))
        .map_or(0, |timing_line| timing_line + 1);

    let text = lines[text_start..]
        .iter()
        .map(|line| clean_line(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(Cue::new(start, text))
    }
}

fn captured_offset(captures: &regex::Captures<'_>) -> Option<Duration> {
    let hours: u64 = captures.get(1)?.as_str().parse().ok()?;
    let minutes: u64 = captures.get(2)?.as_str().parse().ok()?;
    let seconds: u64 = captures.get(3)?.as_str().parse().ok()?;
    let millis: u64 = captures
        .get(4)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let total_millis = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;

    Some(Duration::from_millis(total_millis))
}

fn clean_line(line: &str) -> String {
    let without_tags = html_tag_regex().replace_all(line, "");
    let without_settings = cue_setting_regex().replace_all(&without_tags, "");
    decode_entities(&without_settings).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
