//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::adapters::{AppConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};

/// Final configuration plus where its values came from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    /// Config file that was loaded, if any
    pub source: Option<PathBuf>,
    pub env_overrides: usize,
    pub cli_overrides: usize,
}

impl ResolvedConfig {
    /// Report the resolution; call once logging is up
    pub fn log_summary(&self) {
        match &self.source {
            Some(path) => info!("Loaded configuration from: {}", path.display()),
            None => info!("No configuration file found, using defaults"),
        }
        info!(
            env_overrides = self.env_overrides,
            cli_overrides = self.cli_overrides,
            "Configuration resolved"
        );
    }
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let (mut config, source) = load_config_file(cli.config.as_deref())?;

    let env_overrides = apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    let cli_overrides = apply_cli_overrides(&mut config, cli);

    config.validate().context("Invalid configuration")?;
    Ok(ResolvedConfig {
        config,
        source,
        env_overrides,
        cli_overrides,
    })
}

/// Load the explicit config file, else the first default location, else defaults
fn load_config_file(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match TomlConfigAdapter::find_default_config() {
            Some(path) => path,
            None => return Ok((AppConfig::default(), None)),
        },
    };

    let config = TomlConfigAdapter::load(&path)
        .with_context(|| format!("Failed to load config file {}", path.display()))?;
    Ok((config, Some(path)))
}

/// Apply `SPEEDTRIM_*` variables read through `lookup`; returns how many were set
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;
    let mut get = |key: &str| {
        let value = lookup(key).filter(|v| !v.trim().is_empty());
        if value.is_some() {
            applied += 1;
        }
        value
    };

    if let Some(v) = get("SPEEDTRIM_VIDEOS_DIR") {
        config.paths.videos_dir = v.into();
    }
    if let Some(v) = get("SPEEDTRIM_PROCESSED_DIR") {
        config.paths.processed_dir = v.into();
    }
    if let Some(v) = get("SPEEDTRIM_TEMP_DIR") {
        config.paths.temp_dir = v.into();
    }
    if let Some(v) = get("SPEEDTRIM_FFMPEG") {
        config.encoder.ffmpeg_path = v.into();
    }
    if let Some(v) = get("SPEEDTRIM_FFPROBE") {
        config.encoder.ffprobe_path = v.into();
    }
    if let Some(v) = get("SPEEDTRIM_PRESET") {
        config.encoder.preset = v;
    }
    if let Some(v) = get("SPEEDTRIM_CRF") {
        config.encoder.crf = parse_env("SPEEDTRIM_CRF", &v)?;
    }
    if let Some(v) = get("SPEEDTRIM_MAX_TASKS") {
        config.pipeline.max_concurrent_tasks = parse_env("SPEEDTRIM_MAX_TASKS", &v)?;
    }
    if let Some(v) = get("SPEEDTRIM_CLEANUP_ON_ERROR") {
        config.pipeline.cleanup_on_error = parse_flag("SPEEDTRIM_CLEANUP_ON_ERROR", &v)?;
    }
    if let Some(v) = get("SPEEDTRIM_REJECT_OVERLAPS") {
        config.pipeline.reject_overlaps = parse_flag("SPEEDTRIM_REJECT_OVERLAPS", &v)?;
    }
    if let Some(v) = get("SPEEDTRIM_LOG_LEVEL") {
        config.logging.level = v;
    }

    Ok(applied)
}

/// Apply command-line overrides; returns how many were set
fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> usize {
    let mut applied = 0;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
        applied += 1;
    }
    if cli.json_logs {
        config.logging.json = true;
        applied += 1;
    }

    if let Commands::Render(args) = &cli.command {
        if let Some(dir) = &args.output_dir {
            config.paths.processed_dir = dir.clone();
            applied += 1;
        }
        if let Some(tasks) = args.max_tasks {
            config.pipeline.max_concurrent_tasks = tasks;
            applied += 1;
        }
        if args.cleanup_on_error {
            config.pipeline.cleanup_on_error = true;
            applied += 1;
        }
        if args.allow_overlaps {
            config.pipeline.reject_overlaps = false;
            applied += 1;
        }
    }

    applied
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid value for {}: '{}' (expected true/false)", key, value)),
    }
}
