use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extractors::validate_url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// YouTube endpoints and client identity
    pub youtube: YoutubeConfig,

    /// Transcript selection settings
    pub transcript: TranscriptConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Watch page endpoint, queried with `?v=<id>`
    pub watch_url: String,

    /// Player API endpoint, queried with `?key=<api key>`
    pub player_url: String,

    /// Client name sent in the player API context
    pub client_name: String,

    /// Client version sent in the player API context
    pub client_version: String,

    /// Accept-Language header for every request
    pub accept_language: String,

    /// Optional User-Agent override
    pub user_agent: Option<String>,

    /// Optional raw Cookie header for a signed-in session
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Caption languages in order of preference
    pub preferred_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How often the page location is checked for navigation
    pub navigation_poll_ms: u64,

    /// How often playback time is published to the display
    pub time_update_ms: u64,

    /// Default output format
    pub default_output_format: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            watch_url: "https://www.youtube.com/watch".to_string(),
            player_url: "https://www.youtube.com/youtubei/v1/player".to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "20.10.38".to_string(),
            accept_language: "en-US".to_string(),
            user_agent: None,
            cookie: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube: YoutubeConfig::default(),
            transcript: TranscriptConfig {
                preferred_languages: ["en", "zh", "zh-Hans", "zh-Hant"]
                    .iter()
                    .map(|code| code.to_string())
                    .collect(),
            },
            app: AppConfig {
                navigation_poll_ms: 800,
                time_update_ms: 250,
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed
    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-sync").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.youtube.watch_url).context("Invalid youtube.watch_url")?;
        validate_url(&self.youtube.player_url).context("Invalid youtube.player_url")?;

        if self.youtube.client_name.is_empty() || self.youtube.client_version.is_empty() {
            anyhow::bail!("YouTube client name and version must be configured");
        }

        if self.app.navigation_poll_ms == 0 || self.app.time_update_ms == 0 {
            anyhow::bail!("Polling intervals must be greater than zero");
        }

        Ok(())
    }

    /// Replace the language preference when the command line supplies one
    pub fn with_languages(mut self, languages: &[String]) -> Self {
        if !languages.is_empty() {
            self.transcript.preferred_languages = languages.to_vec();
        }
        self
    }

    pub fn navigation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.app.navigation_poll_ms)
    }

    pub fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.app.time_update_ms)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Watch URL: {}", self.youtube.watch_url);
        println!("  Player URL: {}", self.youtube.player_url);
        println!(
            "  Client: {} {}",
            self.youtube.client_name, self.youtube.client_version
        );
        println!("  Accept-Language: {}", self.youtube.accept_language);
        println!("  Cookie: {}", if self.youtube.cookie.is_some() { "set" } else { "not set" });
        println!(
            "  Preferred Languages: {}",
            self.transcript.preferred_languages.join(", ")
        );
        println!("  Default Format: {}", self.app.default_output_format);
    }
}
