use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::captions::Transcript;
use crate::cli::OutputFormat;
use crate::utils::sanitize_filename;

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    offset_secs: u64,
    text: &'a str,
}

#[derive(Serialize)]
struct JsonTranscript<'a> {
    video_id: &'a str,
    url: String,
    title: Option<&'a str>,
    language: Option<&'a str>,
    source: &'static str,
    retrieved_at: String,
    lines: Vec<JsonLine<'a>>,
}

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => transcript.render(),
        OutputFormat::Markdown => format_as_markdown(transcript),
        OutputFormat::Json => format_as_json(transcript)?,
    };
    Ok(content)
}

fn format_as_markdown(transcript: &Transcript) -> String {
    let title = transcript
        .title
        .as_deref()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(transcript.video_id.as_str());

    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title));
    out.push_str(&format!("URL: {}\n\n", transcript.video_id.watch_url()));
    if let Some(language) = &transcript.language {
        out.push_str(&format!("Language: {}\n\n", language));
    }
    out.push_str("## Transcript\n\n");
    out.push_str(&transcript.render());
    out.push('\n');
    out
}

fn format_as_json(transcript: &Transcript) -> Result<String> {
    let doc = JsonTranscript {
        video_id: transcript.video_id.as_str(),
        url: transcript.video_id.watch_url(),
        title: transcript.title.as_deref(),
        language: transcript.language.as_deref(),
        source: transcript.source.as_str(),
        retrieved_at: transcript.retrieved_at.to_rfc3339(),
        lines: transcript
            .lines
            .iter()
            .map(|line| JsonLine {
                timestamp: line.timestamp(),
                offset_secs: line.offset_secs,
                text: &line.text,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&doc).context("Failed to serialize transcript")
}

/// `<title>_<id>.<ext>`, or `<id>.<ext>` when there is no usable title
pub fn output_filename(transcript: &Transcript, format: OutputFormat) -> String {
    let id = sanitize_filename(transcript.video_id.as_str());
    let title = transcript.title.as_deref().map(sanitize_filename).unwrap_or_default();

    if title.is_empty() {
        format!("{}.{}", id, format.extension())
    } else {
        format!("{}_{}.{}", title, id, format.extension())
    }
}

/// Write a transcript into `dir`, returning the file path
pub async fn save_to_dir(transcript: &Transcript, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    let content = render(transcript, format)?;

    fs_err::tokio::create_dir_all(dir).await?;
    let path = dir.join(output_filename(transcript, format));
    fs_err::tokio::write(&path, content).await?;

    Ok(path)
}

/// Print a transcript to stdout
pub fn print_to_console(transcript: &Transcript, format: OutputFormat) -> Result<()> {
    let content = render(transcript, format)?;
    println!("{}", content);
    Ok(())
}
