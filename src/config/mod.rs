use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::selector::LanguagePreference;
use crate::TranscriptorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Caption language policy
    #[serde(default)]
    pub languages: LanguagePreference,

    /// Upstream captions service
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// External caption-extraction tool
    #[serde(default)]
    pub tool: ToolConfig,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Root of the player and timedtext endpoints
    pub base_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Player API client identity
    pub client_name: String,
    pub client_version: String,

    /// Optional player API key
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path or name of the yt-dlp executable
    pub program: String,

    /// Subtitle format selector passed to `--sub-format`
    pub sub_format: String,

    /// Maximum run time of one invocation in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory for per-video scratch directories
    pub temp_dir: Option<PathBuf>,

    /// Directory transcripts are written to
    pub output_dir: PathBuf,

    /// Default output format
    pub default_output_format: String,

    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            client_name: "WEB".to_string(),
            client_version: "2.20250626.01.00".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            sub_format: "vtt/srt/best".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            output_dir: PathBuf::from("transcripts"),
            default_output_format: "markdown".to_string(),
            max_concurrent_jobs: 3,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::tokio::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::tokio::create_dir_all(parent).await?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::tokio::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // A config.yaml in the working directory wins
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("caption-transcriptor").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.languages.preferred.is_empty() {
            return Err(TranscriptorError::InvalidConfig(
                "at least one preferred language must be configured".to_string(),
            )
            .into());
        }

        if self.app.max_concurrent_jobs == 0 {
            return Err(TranscriptorError::InvalidConfig(
                "max_concurrent_jobs must be at least 1".to_string(),
            )
            .into());
        }

        if self.upstream.timeout_secs == 0 || self.tool.timeout_secs == 0 {
            return Err(TranscriptorError::InvalidConfig("timeouts must be non-zero".to_string()).into());
        }

        url::Url::parse(&self.upstream.base_url)
            .map_err(|_| TranscriptorError::InvalidConfig(format!("invalid base_url: {}", self.upstream.base_url)))?;

        Ok(())
    }

    /// Apply `--lang` / `--fallback-lang`; an empty list keeps the configured one
    pub fn override_languages(&mut self, preferred: Vec<String>, fallback: Vec<String>) {
        if !preferred.is_empty() {
            self.languages.preferred = preferred;
            // The configured target named the replaced preferred language
            self.languages.translate_to = None;
        }
        if !fallback.is_empty() {
            self.languages.fallback = fallback;
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Preferred languages: {}", self.languages.preferred.join(", "));
        println!("  Fallback languages: {}", self.languages.fallback.join(", "));
        if let Some(target) = self.languages.translation_target() {
            println!("  Translation target: {}", target);
        }
        println!("  Accept untranslated: {}", self.languages.accept_untranslated);
        println!("  Upstream: {}", self.upstream.base_url);
        println!("  Extraction tool: {}", self.tool.program);
        println!("  Output directory: {}", self.app.output_dir.display());
        println!("  Default Format: {}", self.app.default_output_format);
        println!("  Max concurrent jobs: {}", self.app.max_concurrent_jobs);
    }
}
