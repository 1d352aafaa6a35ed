use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::captions::VideoId;

/// Errors from an out-of-process caption extractor
#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not finish within {seconds}s")]
    TimedOut { program: String, seconds: u64 },

    #[error("Failed to read extractor output: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractorError {
    /// A missing tool will not appear on retry; a crash or timeout might not repeat
    pub fn is_transient(&self) -> bool {
        !matches!(self, ExtractorError::Spawn { .. })
    }
}

/// Trait for tools that download caption files for a video into a directory
#[async_trait]
pub trait CaptionExtractor: Send + Sync {
    /// Download every available caption file into `scratch_dir` and list them
    async fn extract(&self, video_id: &VideoId, scratch_dir: &Path) -> Result<Vec<PathBuf>, ExtractorError>;

    /// Name of the tool, for logs
    fn tool_name(&self) -> &str;
}

/// Caption file extensions the timed-text parser understands
const CAPTION_EXTENSIONS: &[&str] = &["vtt", "srt"];

/// Language infix of a caption file name, e.g. `zh-Hant` in `sub.zh-Hant.vtt`
pub fn language_infix(path: &Path) -> Option<&str> {
    let extension = path.extension()?.to_str()?;
    if !CAPTION_EXTENSIONS.iter().any(|ext| extension.eq_ignore_ascii_case(ext)) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let (_, infix) = stem.rsplit_once('.')?;
    Some(infix)
}

/// Pick the caption file for the most preferred language.
///
/// A file matches a code when its language infix equals the code or is a regional
/// variant of it (`en-US` for `en`), compared case-insensitively.
pub fn select_caption_file(files: &[PathBuf], languages: &[&str]) -> Option<PathBuf> {
    let mut files: Vec<&PathBuf> = files.iter().collect();
    files.sort();

    for code in languages {
        let code = code.to_ascii_lowercase();
        let variant_prefix = format!("{}-", code);

        let found = files.iter().find(|file| {
            language_infix(file)
                .map(|infix| infix.to_ascii_lowercase())
                .is_some_and(|infix| infix == code || infix.starts_with(&variant_prefix))
        });

        if let Some(file) = found {
            return Some((*file).clone());
        }
    }

    None
}
