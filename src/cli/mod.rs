use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "captions",
    about = "Caption Transcriptor - Turn online video captions into clean, timestamped transcripts",
    version,
    long_about = "Fetches the caption tracks of one or more videos, picks the best track for your language \
preference (requesting a machine translation when only another language exists), and writes a \
deduplicated [HH:MM:SS] transcript. Falls back to the single-fetch endpoint and then to yt-dlp when \
the track listing is unavailable."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts for one or more videos
    Fetch {
        /// Video URLs (watch, youtu.be, embed, shorts) or bare video identifiers
        #[arg(value_name = "URL_OR_ID", required = true)]
        inputs: Vec<String>,

        /// Directory to write transcripts to (defaults to the configured output_dir)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print transcripts to stdout instead of writing files
        #[arg(long)]
        stdout: bool,

        /// Output format (defaults to the configured default_output_format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Preferred caption language, most preferred first (repeatable)
        #[arg(short, long = "lang", value_name = "LANG")]
        languages: Vec<String>,

        /// Fallback language accepted natively or as a translation source (repeatable)
        #[arg(long = "fallback-lang", value_name = "LANG")]
        fallback_languages: Vec<String>,

        /// Maximum number of videos processed at once
        #[arg(short, long, value_name = "COUNT")]
        concurrency: Option<usize>,
    },

    /// Create or show the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that external tools are available
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain `[HH:MM:SS] text` lines
    Text,
    /// Markdown document with title and source URL
    Markdown,
    /// JSON with metadata and lines
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::TranscriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            other => Err(crate::TranscriptorError::InvalidConfig(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}
