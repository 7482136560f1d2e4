//! FFprobe adapter for media probing
//!
//! Reads the first video stream's dimensions and the container duration.

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::exec_ffmpeg::locate_binary;
use crate::domain::model::InputMetadata;
use crate::error::{CompressResult, CompressionError};
use crate::ports::MediaProbe;

/// FFprobe-based media probe
pub struct FfprobeMediaProbe {
    ffprobe_path: Option<PathBuf>,
}

impl FfprobeMediaProbe {
    /// `ffprobe_path` overrides the `PATH` lookup
    pub fn new(ffprobe_path: Option<PathBuf>) -> Self {
        Self { ffprobe_path }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[async_trait]
impl MediaProbe for FfprobeMediaProbe {
    async fn probe(&self, data: &[u8], filename: &str) -> CompressResult<InputMetadata> {
        let binary = locate_binary(self.ffprobe_path.as_deref(), "ffprobe").map_err(|e| {
            CompressionError::Probe {
                message: e.to_string(),
            }
        })?;

        let suffix = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let mut staged = tempfile::Builder::new()
            .prefix("vidshrink-probe-")
            .suffix(&suffix)
            .tempfile()?;
        staged.write_all(data)?;
        staged.flush()?;

        let output = Command::new(&binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height:format=duration",
                "-of",
                "json",
            ])
            .arg(staged.path())
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(CompressionError::Probe {
                message: format!(
                    "ffprobe failed on {}: {}",
                    filename,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let metadata = parse_probe_output(&output.stdout, data.len() as u64)?;
        debug!(
            "Probed {}: {}x{}, {:?}s",
            filename, metadata.width, metadata.height, metadata.duration_seconds
        );
        Ok(metadata)
    }
}

/// Build metadata from ffprobe's JSON output
pub(crate) fn parse_probe_output(json: &[u8], size_bytes: u64) -> CompressResult<InputMetadata> {
    let parsed: ProbeOutput = serde_json::from_slice(json).map_err(|e| CompressionError::Probe {
        message: format!("unreadable ffprobe output: {}", e),
    })?;

    let (width, height) = parsed
        .streams
        .iter()
        .find_map(|s| s.width.zip(s.height))
        .ok_or_else(|| CompressionError::Probe {
            message: "no video stream found".to_string(),
        })?;

    let mut metadata = InputMetadata::new(width, height, size_bytes).map_err(|e| {
        CompressionError::Probe {
            message: e.to_string(),
        }
    })?;

    if let Some(seconds) = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
    {
        metadata = metadata.with_duration(seconds);
    }

    Ok(metadata)
}
