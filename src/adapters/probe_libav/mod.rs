//! Capability prober backed by the linked libav libraries

use ffmpeg_next as ffmpeg;
use tracing::warn;

use crate::domain::model::{CodecDescriptor, CodecId};
use crate::ports::CapabilityProber;

/// Checks the linked libavcodec for a decoder and the planned encoder
pub struct LibavCapabilityProber {
    initialized: bool,
}

impl LibavCapabilityProber {
    pub fn new() -> Self {
        let initialized = match ffmpeg::init() {
            Ok(()) => true,
            Err(e) => {
                warn!("libav initialization failed: {}", e);
                false
            }
        };
        Self { initialized }
    }
}

impl Default for LibavCapabilityProber {
    fn default() -> Self {
        Self::new()
    }
}

fn libav_id(codec_id: CodecId) -> ffmpeg::codec::Id {
    match codec_id {
        CodecId::Hevc => ffmpeg::codec::Id::HEVC,
        CodecId::Vp9 => ffmpeg::codec::Id::VP9,
        CodecId::H264 => ffmpeg::codec::Id::H264,
    }
}

impl CapabilityProber for LibavCapabilityProber {
    fn supports(&self, codec_id: CodecId) -> bool {
        if !self.initialized {
            return false;
        }
        let encoder_name = CodecDescriptor::for_id(codec_id).encoder_name;
        ffmpeg::codec::decoder::find(libav_id(codec_id)).is_some()
            && ffmpeg::codec::encoder::find_by_name(encoder_name).is_some()
    }
}
