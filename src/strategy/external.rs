use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::{AcquisitionStrategy, Acquired, StrategyFailure, StrategyKind, StrategyOutcome};
use crate::captions::VideoId;
use crate::extractors::{language_infix, select_caption_file, CaptionExtractor};
use crate::parsers::parse_timed_text;

/// Scratch directory owned by one video's pipeline.
///
/// Named after the identifier with a random suffix, and removed when dropped.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create(base: Option<&Path>, video_id: &VideoId) -> std::io::Result<Self> {
        let safe_id: String = video_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let prefix = format!("captions-{}-", safe_id);

        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match base {
            Some(base) => {
                fs_err::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Download caption files with an external tool and parse the best one
pub struct ExternalToolStrategy {
    extractor: Arc<dyn CaptionExtractor>,
    languages: Vec<String>,
    scratch_base: Option<PathBuf>,
}

impl ExternalToolStrategy {
    pub fn new(extractor: Arc<dyn CaptionExtractor>, languages: Vec<String>, scratch_base: Option<PathBuf>) -> Self {
        Self {
            extractor,
            languages,
            scratch_base,
        }
    }

    async fn run_in(&self, video_id: &VideoId, scratch_dir: &Path) -> StrategyOutcome {
        let files = match self.extractor.extract(video_id, scratch_dir).await {
            Ok(files) => files,
            Err(e) if e.is_transient() => return StrategyOutcome::Fail(StrategyFailure::transient(e.to_string())),
            Err(e) => return StrategyOutcome::Skip(e.to_string()),
        };

        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();
        let Some(file) = select_caption_file(&files, &languages) else {
            return StrategyOutcome::Skip(format!(
                "{} produced no caption file for {}",
                self.extractor.tool_name(),
                self.languages.join(", ")
            ));
        };

        tracing::debug!("Using caption file {}", file.display());

        let content = match tokio::fs::read(&file).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                return StrategyOutcome::Fail(StrategyFailure::transient(format!(
                    "reading {}: {}",
                    file.display(),
                    e
                )))
            }
        };

        let cues = parse_timed_text(&content);
        if cues.is_empty() {
            return StrategyOutcome::Skip(format!("{} contained no cues", file.display()));
        }

        StrategyOutcome::Success(Acquired {
            cues,
            language: language_infix(&file).map(str::to_string),
            title: None,
        })
    }
}

#[async_trait]
impl AcquisitionStrategy for ExternalToolStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExternalTool
    }

    async fn attempt(&self, video_id: &VideoId) -> StrategyOutcome {
        let scratch = match ScratchDir::create(self.scratch_base.as_deref(), video_id) {
            Ok(scratch) => scratch,
            Err(e) => return StrategyOutcome::Fail(StrategyFailure::transient(format!("scratch directory: {}", e))),
        };

        let outcome = self.run_in(video_id, scratch.path()).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!("Failed to remove scratch directory {}: {}", scratch_path.display(), e);
        }

        outcome
    }
}
