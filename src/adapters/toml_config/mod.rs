// TOML config adapter - Typed configuration loaded from TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::model::EncoderSettings;
use crate::error::{SpeedTrimError, SpeedTrimResult};

/// Valid log levels
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default config file locations, checked in order
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["speedtrim.toml", "config/speedtrim.toml"];

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub encoder: EncoderConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Working directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where source videos are looked up
    pub videos_dir: PathBuf,
    /// Where finished outputs are written
    pub processed_dir: PathBuf,
    /// Per-range artifacts and concat manifests
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            processed_dir: PathBuf::from("processed"),
            temp_dir: PathBuf::from("temp"),
        }
    }
}

/// External engine binaries and the fixed encode configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub video_codec: String,
    pub preset: String,
    /// Constant Rate Factor (0-51)
    pub crf: u8,
    pub audio_codec: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let settings = EncoderSettings::default();
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            video_codec: settings.video_codec,
            preset: settings.preset,
            crf: settings.crf,
            audio_codec: settings.audio_codec,
        }
    }
}

impl EncoderConfig {
    pub fn settings(&self) -> EncoderSettings {
        EncoderSettings {
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
            audio_codec: self.audio_codec.clone(),
        }
    }
}

/// Task scheduling and failure policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tasks allowed to run at once; the rest wait in `queued`
    pub max_concurrent_tasks: usize,
    /// Remove temporary artifacts when a task fails
    pub cleanup_on_error: bool,
    /// Reject requests whose segments overlap
    pub reject_overlaps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: num_cpus::get().max(1),
            cleanup_on_error: false,
            reject_overlaps: true,
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Validate configuration
    pub fn validate(&self) -> SpeedTrimResult<()> {
        if self.encoder.crf > 51 {
            return Err(SpeedTrimError::ConfigError {
                message: format!("CRF value {} is invalid (must be 0-51)", self.encoder.crf),
            });
        }
        if self.encoder.preset.trim().is_empty() || self.encoder.video_codec.trim().is_empty() {
            return Err(SpeedTrimError::ConfigError {
                message: "Encoder codec and preset cannot be empty".to_string(),
            });
        }
        if self.pipeline.max_concurrent_tasks == 0 {
            return Err(SpeedTrimError::ConfigError {
                message: "max_concurrent_tasks must be at least 1".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(SpeedTrimError::ConfigError {
                message: format!(
                    "Invalid log level: {}. Valid levels: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration from TOML text; missing keys take defaults
    pub fn parse(content: &str) -> SpeedTrimResult<AppConfig> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> SpeedTrimResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SpeedTrimError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// First existing file among the default locations
    pub fn find_default_config() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Serialize config to TOML string
    pub fn serialize(config: &AppConfig) -> SpeedTrimResult<String> {
        toml::to_string_pretty(config).map_err(|e| SpeedTrimError::ConfigError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }
}
