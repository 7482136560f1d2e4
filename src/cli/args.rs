//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::domain::model::{CodecId, CompressionOptions, QualityPreset};

/// Encoding options shared by `compress` and `plan`
#[derive(Args, Debug, Clone)]
pub struct EncodeOptionArgs {
    /// Maximum output width in pixels
    #[arg(long, value_parser = parse_dimension)]
    pub max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long, value_parser = parse_dimension)]
    pub max_height: Option<u32>,

    /// Bitrate ceiling in Mbit/s; replaces constant-quality encoding
    #[arg(long, value_name = "MBPS", value_parser = parse_bitrate)]
    pub max_bitrate: Option<f64>,

    /// Speed/quality trade-off (fast, balanced, high)
    #[arg(long, default_value = "balanced", value_parser = parse_quality)]
    pub quality: QualityPreset,
}

impl EncodeOptionArgs {
    pub fn to_options(&self) -> CompressionOptions {
        CompressionOptions {
            max_width: self.max_width,
            max_height: self.max_height,
            max_bitrate_mbps: self.max_bitrate,
            quality_preset: self.quality,
        }
    }
}

/// Arguments for the compress command
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Input video file or directory
    #[arg(short, long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output file, or directory for batch input (default: next to the source)
    #[arg(short, long = "out", value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: EncodeOptionArgs,

    /// Encoder threads (0 lets the encoder decide)
    #[arg(long, value_parser = parse_threads)]
    pub threads: Option<usize>,

    /// Emit progress and results as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Source width in pixels
    #[arg(long, value_parser = parse_source_dimension)]
    pub width: u32,

    /// Source height in pixels
    #[arg(long, value_parser = parse_source_dimension)]
    pub height: u32,

    /// Source file size in megabytes
    #[arg(long, value_name = "MB", value_parser = parse_size_mb)]
    pub size_mb: f64,

    #[command(flatten)]
    pub options: EncodeOptionArgs,

    /// Plan for this codec instead of negotiating one
    #[arg(long, value_parser = parse_codec)]
    pub codec: Option<CodecId>,
}

/// Arguments for the codecs command
#[derive(Args, Debug)]
pub struct CodecsArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

fn parse_dimension(s: &str) -> Result<u32, String> {
    number_range(s, 2, 16384)
}

fn parse_source_dimension(s: &str) -> Result<u32, String> {
    number_range(s, 1, 65535)
}

fn parse_threads(s: &str) -> Result<usize, String> {
    number_range(s, 0, 256)
}

fn parse_bitrate(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("bitrate must be greater than 0".to_string());
    }
    Ok(value)
}

fn parse_size_mb(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err("size must be a non-negative number".to_string());
    }
    Ok(value)
}

fn parse_quality(s: &str) -> Result<QualityPreset, String> {
    QualityPreset::parse(s).map_err(|e| e.to_string())
}

fn parse_codec(s: &str) -> Result<CodecId, String> {
    CodecId::parse(s).map_err(|e| e.to_string())
}
