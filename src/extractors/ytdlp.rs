use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{language_infix, CaptionExtractor, ExtractorError};
use crate::captions::VideoId;
use crate::config::ToolConfig;

/// Caption file downloader using yt-dlp
pub struct YtDlpExtractor {
    yt_dlp_path: String,
    sub_format: String,
    languages: Vec<String>,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &ToolConfig, languages: Vec<String>) -> Self {
        Self {
            yt_dlp_path: config.program.clone(),
            sub_format: config.sub_format.clone(),
            languages,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn build_args(&self, video_id: &VideoId, scratch_dir: &Path) -> Vec<String> {
        vec![
            "--skip-download".to_string(),
            // Authored and auto-generated tracks
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-langs".to_string(),
            self.languages.join(","),
            "--sub-format".to_string(),
            self.sub_format.clone(),
            // Fixed base name keeps odd titles out of the file names
            "--output".to_string(),
            output_template(scratch_dir),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            video_id.watch_url(),
        ]
    }
}

/// `--output` is a template, so a literal `%` in the directory must be doubled
fn output_template(scratch_dir: &Path) -> String {
    scratch_dir.join("sub").to_string_lossy().replace('%', "%%")
}

#[async_trait]
impl CaptionExtractor for YtDlpExtractor {
    async fn extract(&self, video_id: &VideoId, scratch_dir: &Path) -> Result<Vec<PathBuf>, ExtractorError> {
        tracing::debug!("Downloading caption files for {} into {}", video_id, scratch_dir.display());

        let child = Command::new(&self.yt_dlp_path)
            .args(self.build_args(video_id, scratch_dir))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractorError::Spawn {
                program: self.yt_dlp_path.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExtractorError::TimedOut {
                program: self.yt_dlp_path.clone(),
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::Failed {
                program: self.yt_dlp_path.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if language_infix(&path).is_some() {
                files.push(path);
            }
        }

        Ok(files)
    }

    fn tool_name(&self) -> &str {
        &self.yt_dlp_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let extractor = YtDlpExtractor::new(&ToolConfig::default(), vec!["zh-Hant".to_string(), "en".to_string()]);
        let args = extractor.build_args(&VideoId::new("abc123def45"), Path::new("/tmp/scratch"));

        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--write-subs".to_string()));
        assert!(args.contains(&"--write-auto-subs".to_string()));

        let langs = args.iter().position(|a| a == "--sub-langs").unwrap();
        assert_eq!(args[langs + 1], "zh-Hant,en");

        let output = args.iter().position(|a| a == "--output").unwrap();
        assert_eq!(PathBuf::from(&args[output + 1]), Path::new("/tmp/scratch").join("sub"));

        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc123def45");
    }

    #[test]
    fn test_output_template_escapes_percent() {
        let template = output_template(Path::new("/tmp/100%(id)s"));
        assert_eq!(
            PathBuf::from(template),
            Path::new("/tmp/100%%(id)s").join("sub")
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let config = ToolConfig {
            program: "definitely-not-a-real-caption-tool".to_string(),
            ..ToolConfig::default()
        };
        let extractor = YtDlpExtractor::new(&config, vec!["en".to_string()]);
        let scratch = tempfile::tempdir().unwrap();

        let err = extractor.extract(&VideoId::new("abc"), scratch.path()).await.unwrap_err();
        assert!(matches!(err, ExtractorError::Spawn { .. }));
    }
}
