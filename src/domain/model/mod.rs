// Domain models - Core types and data structures

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CompressResult, CompressionError};


/// Identifier of a supported video codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    /// H.265 / HEVC, high efficiency
    Hevc,
    /// VP9, royalty free
    Vp9,
    /// H.264 / AVC, universally decodable
    H264,
}

impl CodecId {
    /// Short lowercase identifier (also the libav decoder name)
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecId::Hevc => "hevc",
            CodecId::Vp9 => "vp9",
            CodecId::H264 => "h264",
        }
    }

    /// Parse codec identifier from string
    pub fn parse(codec_str: &str) -> CompressResult<Self> {
        match codec_str.trim().to_lowercase().as_str() {
            "hevc" | "h265" | "h.265" | "x265" => Ok(CodecId::Hevc),
            "vp9" | "vp09" => Ok(CodecId::Vp9),
            "h264" | "avc" | "h.264" | "x264" => Ok(CodecId::H264),
            other => Err(CompressionError::invalid(format!(
                "Unknown codec: {}. Valid codecs: hevc, vp9, h264",
                other
            ))),
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecId {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Immutable description of an output codec and its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecDescriptor {
    pub codec_id: CodecId,
    pub display_name: &'static str,
    pub encoder_name: &'static str,
    pub container_mime_type: &'static str,
    pub file_extension: &'static str,
    pub audio_encoder: &'static str,
    pub audio_bitrate_kbps: u32,
}

impl CodecDescriptor {
    pub const HEVC: CodecDescriptor = CodecDescriptor {
        codec_id: CodecId::Hevc,
        display_name: "H.265/HEVC",
        encoder_name: "libx265",
        container_mime_type: "video/mp4",
        file_extension: "mp4",
        audio_encoder: "aac",
        audio_bitrate_kbps: 128,
    };

    pub const VP9: CodecDescriptor = CodecDescriptor {
        codec_id: CodecId::Vp9,
        display_name: "VP9",
        encoder_name: "libvpx-vp9",
        container_mime_type: "video/webm",
        file_extension: "webm",
        audio_encoder: "libopus",
        audio_bitrate_kbps: 96,
    };

    pub const H264: CodecDescriptor = CodecDescriptor {
        codec_id: CodecId::H264,
        display_name: "H.264/AVC",
        encoder_name: "libx264",
        container_mime_type: "video/mp4",
        file_extension: "mp4",
        audio_encoder: "aac",
        audio_bitrate_kbps: 128,
    };

    /// Built-in descriptors in negotiation priority order
    pub fn builtin_priority() -> [CodecDescriptor; 3] {
        [Self::HEVC, Self::VP9, Self::H264]
    }

    /// Look up the built-in descriptor for a codec
    pub fn for_id(codec_id: CodecId) -> CodecDescriptor {
        match codec_id {
            CodecId::Hevc => Self::HEVC,
            CodecId::Vp9 => Self::VP9,
            CodecId::H264 => Self::H264,
        }
    }

    /// The fallback codec every playback target can decode
    pub fn universal() -> CodecDescriptor {
        Self::H264
    }

    pub fn is_universal(&self) -> bool {
        self.codec_id == CodecId::H264
    }

    /// Whether the container is MP4 (fast-start and hvc1 tagging apply)
    pub fn is_mp4(&self) -> bool {
        self.file_extension == "mp4"
    }
}

/// Encoder speed/quality trade-off requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Fast,
    #[default]
    Balanced,
    High,
}

impl QualityPreset {
    /// Parse preset from string
    pub fn parse(preset_str: &str) -> CompressResult<Self> {
        match preset_str.trim().to_lowercase().as_str() {
            "fast" => Ok(QualityPreset::Fast),
            "balanced" | "default" => Ok(QualityPreset::Balanced),
            "high" => Ok(QualityPreset::High),
            other => Err(CompressionError::invalid(format!(
                "Invalid quality preset: {}. Valid presets: fast, balanced, high",
                other
            ))),
        }
    }
}

impl FromStr for QualityPreset {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Caller supplied compression options; unset fields get planner defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Explicit bitrate ceiling. Replaces constant-quality encoding.
    pub max_bitrate_mbps: Option<f64>,
    pub quality_preset: QualityPreset,
}

impl CompressionOptions {
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn with_max_height(mut self, height: u32) -> Self {
        self.max_height = Some(height);
        self
    }

    pub fn with_max_bitrate_mbps(mut self, mbps: f64) -> Self {
        self.max_bitrate_mbps = Some(mbps);
        self
    }

    pub fn with_quality(mut self, preset: QualityPreset) -> Self {
        self.quality_preset = preset;
        self
    }

    /// Reject values the planner cannot honor
    pub fn validate(&self) -> CompressResult<()> {
        for (name, value) in [("max_width", self.max_width), ("max_height", self.max_height)] {
            if let Some(v) = value {
                if v < 2 {
                    return Err(CompressionError::invalid(format!(
                        "{} must be at least 2, got {}",
                        name, v
                    )));
                }
            }
        }

        if let Some(mbps) = self.max_bitrate_mbps {
            if !mbps.is_finite() || mbps <= 0.0 {
                return Err(CompressionError::invalid(format!(
                    "max_bitrate_mbps must be a positive number, got {}",
                    mbps
                )));
            }
        }

        Ok(())
    }
}

/// What the planner needs to know about the source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMetadata {
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub duration_seconds: Option<f64>,
}

impl InputMetadata {
    /// Create new input metadata with validation
    pub fn new(width: u32, height: u32, size_bytes: u64) -> CompressResult<Self> {
        if width == 0 || height == 0 {
            return Err(CompressionError::invalid("Video dimensions cannot be zero"));
        }
        Ok(Self {
            width,
            height,
            size_bytes,
            duration_seconds: None,
        })
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// File size in mebibytes
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// Rate control strategy for the video stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RateControl {
    /// Quality-driven; output size varies
    ConstantQuality { crf: u8 },
    /// Explicit bitrate target with VBV ceiling
    Bitrate {
        target_kbps: u32,
        max_kbps: u32,
        buffer_kbps: u32,
    },
}

/// Encoder speed/effort knob, expressed per encoder family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum EncoderEffort {
    /// x264/x265 `-preset`
    X26x { preset: &'static str },
    /// libvpx `-deadline` and `-cpu-used`
    Vpx { deadline: &'static str, cpu_used: u8 },
}

/// Keyframe placement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyframePolicy {
    pub gop_size: u32,
    pub min_keyint: u32,
    pub scene_cut_detection: bool,
}

impl Default for KeyframePolicy {
    fn default() -> Self {
        Self {
            gop_size: 250,
            min_keyint: 25,
            scene_cut_detection: false,
        }
    }
}

/// Quality-related encoder parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityParams {
    pub rate_control: RateControl,
    pub effort: EncoderEffort,
    pub keyframes: KeyframePolicy,
}

impl QualityParams {
    /// Constant rate factor, if the plan is quality-driven
    pub fn crf(&self) -> Option<u8> {
        match self.rate_control {
            RateControl::ConstantQuality { crf } => Some(crf),
            RateControl::Bitrate { .. } => None,
        }
    }

    /// Target bitrate, if the plan is bitrate-driven
    pub fn target_bitrate_kbps(&self) -> Option<u32> {
        match self.rate_control {
            RateControl::Bitrate { target_kbps, .. } => Some(target_kbps),
            RateControl::ConstantQuality { .. } => None,
        }
    }
}

/// Everything needed to run one encode, derived once per call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodePlan {
    pub codec: CodecDescriptor,
    pub output_width: u32,
    pub output_height: u32,
    pub quality_params: QualityParams,
    pub time_budget_seconds: u64,
}

impl EncodePlan {
    /// Hard wall-clock ceiling for the encode step
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_seconds)
    }
}

/// Coarse stage of a compression call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Loading,
    Compressing,
    Finalizing,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProgressStage::Loading => "loading",
            ProgressStage::Compressing => "compressing",
            ProgressStage::Finalizing => "finalizing",
        };
        f.write_str(label)
    }
}

/// Progress notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// 0-100, non-decreasing within one call
    pub percent: u8,
    pub stage: ProgressStage,
    pub message: String,
    /// Synthesized by the fallback ticker rather than reported by the encoder
    pub estimated: bool,
}

/// Successful compression output
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub output_bytes: Vec<u8>,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    /// Space saved relative to the original; negative when the output grew
    pub compression_ratio_percent: f64,
    pub codec_id: CodecId,
    pub mime_type: &'static str,
    pub file_extension: &'static str,
    pub output_filename: String,
    pub output_width: u32,
    pub output_height: u32,
    pub elapsed: Duration,
}

impl CompressionResult {
    /// Build the result from the extracted artifact and the plan that produced it
    pub fn new(
        output_bytes: Vec<u8>,
        original_size_bytes: u64,
        plan: &EncodePlan,
        source_filename: &str,
        elapsed: Duration,
    ) -> Self {
        let compressed_size_bytes = output_bytes.len() as u64;
        Self {
            compression_ratio_percent: compression_ratio(
                original_size_bytes,
                compressed_size_bytes,
            ),
            output_bytes,
            original_size_bytes,
            compressed_size_bytes,
            codec_id: plan.codec.codec_id,
            mime_type: plan.codec.container_mime_type,
            file_extension: plan.codec.file_extension,
            output_filename: output_filename(source_filename, plan.codec.file_extension),
            output_width: plan.output_width,
            output_height: plan.output_height,
            elapsed,
        }
    }
}

/// Percentage of the original size saved, to one decimal place
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = (1.0 - compressed as f64 / original as f64) * 100.0;
    (saved * 10.0).round() / 10.0
}

/// Derive the artifact name from the source name and negotiated extension
pub fn output_filename(source_filename: &str, extension: &str) -> String {
    let stem = std::path::Path::new(source_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_compressed.{}", stem, extension)
}
