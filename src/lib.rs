//! Caption Transcriptor - A Rust CLI tool for turning online video captions into transcripts
//!
//! This library discovers the caption tracks of a video, picks (or requests a translation of)
//! the best one for a language preference, parses whichever wire format comes back, and
//! normalizes it into a deduplicated `[HH:MM:SS] text` transcript.

pub mod captions;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod normalize;
pub mod output;
pub mod parsers;
pub mod pipeline;
pub mod selector;
pub mod strategy;
pub mod upstream;
pub mod utils;

pub use captions::{AcquisitionResult, CaptionTrack, Cue, TrackOrigin, Transcript, TranscriptLine, VideoId};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::CaptionEngine;
pub use selector::{LanguagePreference, TrackSelection};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the transcriptor
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Not a recognizable video URL or identifier: {0}")]
    InvalidVideoReference(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
