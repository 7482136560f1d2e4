//! Capability prober backed by the ffmpeg binary's codec listings

use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::model::{CodecDescriptor, CodecId};
use crate::ports::CapabilityProber;

/// Reports a codec as supported when ffmpeg lists both its decoder and its encoder
///
/// The listings are read once by [`FfmpegCapabilityProber::detect`]; lookups
/// afterwards are pure.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCapabilityProber {
    decoders: HashSet<String>,
    encoders: HashSet<String>,
}

impl FfmpegCapabilityProber {
    /// Query `binary` for its decoders and encoders
    ///
    /// Failure to run the binary yields a prober that supports nothing beyond
    /// the universal fallback.
    pub async fn detect(binary: &Path) -> Self {
        let decoders = list_codecs(binary, "-decoders").await;
        let encoders = list_codecs(binary, "-encoders").await;
        debug!(
            "ffmpeg lists {} video decoders and {} video encoders",
            decoders.len(),
            encoders.len()
        );
        Self { decoders, encoders }
    }

    /// Build from raw `-decoders` / `-encoders` output
    pub fn from_listings(decoders: &str, encoders: &str) -> Self {
        Self {
            decoders: parse_codec_listing(decoders),
            encoders: parse_codec_listing(encoders),
        }
    }
}

impl CapabilityProber for FfmpegCapabilityProber {
    fn supports(&self, codec_id: CodecId) -> bool {
        let descriptor = CodecDescriptor::for_id(codec_id);
        self.decoders.contains(codec_id.as_str()) && self.encoders.contains(descriptor.encoder_name)
    }
}

async fn list_codecs(binary: &Path, flag: &str) -> HashSet<String> {
    let output = Command::new(binary)
        .args(["-hide_banner", flag])
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            parse_codec_listing(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            warn!("ffmpeg {} exited with {}", flag, output.status);
            HashSet::new()
        }
        Err(e) => {
            warn!("Failed to run ffmpeg {}: {}", flag, e);
            HashSet::new()
        }
    }
}

/// Video codec names from an ffmpeg codec listing
///
/// Rows look like ` V....D libx265   libx265 H.265 / HEVC`; everything above
/// the ` ------` separator is legend.
pub(crate) fn parse_codec_listing(text: &str) -> HashSet<String> {
    text.lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            flags.starts_with('V').then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECODERS: &str = "Decoders:
 V..... = Video
 A..... = Audio
 ------
 V....D h264                 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10
 V....D hevc                 HEVC (High Efficiency Video Coding)
 V....D vp9                  Google VP9
 A....D aac                  AAC (Advanced Audio Coding)
";

    const ENCODERS: &str = "Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_parse_listing_skips_legend_and_audio() {
        let names = parse_codec_listing(DECODERS);
        assert!(names.contains("hevc"));
        assert!(names.contains("h264"));
        assert!(!names.contains("aac"));
        assert!(!names.contains("="));
    }

    #[test]
    fn test_requires_decoder_and_encoder() {
        let prober = FfmpegCapabilityProber::from_listings(DECODERS, ENCODERS);
        assert!(!prober.supports(CodecId::Hevc));
        assert!(prober.supports(CodecId::Vp9));
        assert!(prober.supports(CodecId::H264));
    }

    #[tokio::test]
    async fn test_missing_binary_supports_nothing() {
        let prober = FfmpegCapabilityProber::detect(Path::new("/nonexistent/ffmpeg")).await;
        assert!(!prober.supports(CodecId::H264));
    }
}
