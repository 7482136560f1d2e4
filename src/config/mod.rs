//! Typed configuration for the compressor
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Loading and layering live in `adapters::toml_config`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::model::CodecId;
use crate::engine::ProgressConfig;
use crate::error::{CompressResult, CompressionError};
use crate::planner::{PlannerPolicy, TimeBudgetPolicy};
use crate::utils::logging::LoggingConfig;

/// Root configuration, the `[vidshrink]` table of a config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    pub engine: EngineSettings,
    pub planner: PlannerPolicy,
    pub progress: ProgressConfig,
    pub timeout: TimeBudgetPolicy,
    pub playback: PlaybackSettings,
    pub logging: LoggingConfig,
}

/// Native engine location and resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Explicit ffmpeg binary; `PATH` lookup when unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary; `PATH` lookup when unset
    pub ffprobe_path: Option<PathBuf>,
    /// Encoder threads; 0 lets the encoder decide
    pub threads: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            threads: num_cpus::get(),
        }
    }
}

/// Playback target description used for codec negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Codecs the playback target decodes. Unset means probe the local ffmpeg.
    pub decoders: Option<Vec<CodecId>>,
    /// Negotiation order; the universal fallback is appended when missing
    pub priority: Vec<CodecId>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            decoders: None,
            priority: vec![CodecId::Hevc, CodecId::Vp9, CodecId::H264],
        }
    }
}

impl CompressorConfig {
    /// Planner policy with the configured time budget applied
    pub fn planner_policy(&self) -> PlannerPolicy {
        PlannerPolicy {
            time_budget: self.timeout,
            ..self.planner.clone()
        }
    }

    /// Check cross-field constraints after all layers are merged
    pub fn validate(&self) -> CompressResult<()> {
        self.planner_policy().validate()?;

        if self.timeout.base_seconds == 0 {
            return Err(config_error("timeout.base_seconds must be greater than 0"));
        }
        if !self.timeout.seconds_per_mb.is_finite() || self.timeout.seconds_per_mb < 0.0 {
            return Err(config_error("timeout.seconds_per_mb must be a non-negative number"));
        }

        if self.progress.poll_interval_ms == 0 {
            return Err(config_error("progress.poll_interval_ms must be greater than 0"));
        }
        if self.progress.fallback_step == 0 {
            return Err(config_error("progress.fallback_step must be greater than 0"));
        }
        if self.progress.fallback_ceiling >= crate::engine::progress::FINALIZING_FLOOR {
            return Err(config_error(format!(
                "progress.fallback_ceiling must be below {}",
                crate::engine::progress::FINALIZING_FLOOR
            )));
        }

        if self.playback.priority.is_empty() {
            return Err(config_error("playback.priority must name at least one codec"));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> CompressionError {
    CompressionError::Config {
        message: message.into(),
    }
}
