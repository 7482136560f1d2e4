// TOML config adapter - Configuration loading from TOML files and environment

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::CompressorConfig;
use crate::domain::model::CodecId;
use crate::error::{CompressResult, CompressionError};

/// Files searched, in order, when no explicit config path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["vidshrink.toml", "config/vidshrink.toml"];

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "VIDSHRINK_";

/// Loads [`CompressorConfig`] from a TOML file and `VIDSHRINK_*` variables
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Defaults, then the config file, then environment overrides
    ///
    /// An explicit `path` must exist; the default locations are optional.
    pub fn load(path: Option<&Path>) -> CompressResult<CompressorConfig> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => match Self::find_default_file() {
                Some(path) => Self::load_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    CompressorConfig::default()
                }
            },
        };

        let overrides = Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        if overrides > 0 {
            info!("Applied {} environment variable overrides", overrides);
        }

        Ok(config)
    }

    fn find_default_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    }

    /// Parse one config file
    pub fn load_file(path: &Path) -> CompressResult<CompressorConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| CompressionError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse TOML text; settings live under a `[vidshrink]` table
    pub fn from_toml_str(content: &str) -> CompressResult<CompressorConfig> {
        let parsed: toml::Value = toml::from_str(content).map_err(|e| CompressionError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })?;

        match parsed.get("vidshrink") {
            Some(section) => section
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| CompressionError::Config {
                    message: format!("Invalid [vidshrink] section: {}", e),
                }),
            None => Ok(CompressorConfig::default()),
        }
    }

    /// Apply `VIDSHRINK_*` overrides read through `lookup`; returns how many applied
    pub fn apply_env_overrides<F>(config: &mut CompressorConfig, lookup: F) -> CompressResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).filter(|v| !v.trim().is_empty()).map(|v| (key, v))
        };
        let mut applied = 0;

        if let Some((_, value)) = var("FFMPEG_PATH") {
            config.engine.ffmpeg_path = Some(PathBuf::from(value));
            applied += 1;
        }
        if let Some((_, value)) = var("FFPROBE_PATH") {
            config.engine.ffprobe_path = Some(PathBuf::from(value));
            applied += 1;
        }
        if let Some((key, value)) = var("THREADS") {
            config.engine.threads = parse_env(&key, &value)?;
            applied += 1;
        }
        if let Some((key, value)) = var("TIMEOUT_MAX_SECONDS") {
            config.timeout.max_seconds = parse_env(&key, &value)?;
            applied += 1;
        }
        if let Some((key, value)) = var("PROGRESS_POLL_MS") {
            config.progress.poll_interval_ms = parse_env(&key, &value)?;
            applied += 1;
        }
        if let Some((key, value)) = var("PLAYBACK_DECODERS") {
            config.playback.decoders = Some(parse_codec_list(&key, &value)?);
            applied += 1;
        }
        if let Some((key, value)) = var("CODEC_PRIORITY") {
            config.playback.priority = parse_codec_list(&key, &value)?;
            applied += 1;
        }
        if let Some((key, value)) = var("LOG_LEVEL") {
            config.logging.level = value.parse().map_err(|e| env_error(&key, e))?;
            applied += 1;
        }
        if let Some((key, value)) = var("LOG_FORMAT") {
            config.logging.format = value.parse().map_err(|e| env_error(&key, e))?;
            applied += 1;
        }

        Ok(applied)
    }
}

fn parse_env<T>(key: &str, value: &str) -> CompressResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| env_error(key, e))
}

/// Comma separated codec ids; `none` yields an empty list
fn parse_codec_list(key: &str, value: &str) -> CompressResult<Vec<CodecId>> {
    if value.trim().eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| CodecId::parse(item).map_err(|e| env_error(key, e)))
        .collect()
}

fn env_error(key: &str, error: impl std::fmt::Display) -> CompressionError {
    CompressionError::Config {
        message: format!("Invalid value for {}: {}", key, error),
    }
}
