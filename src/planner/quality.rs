//! Per-codec effort and quality tables

use crate::domain::model::{CodecId, EncoderEffort, QualityPreset, RateControl};

/// Encoder effort for a codec and preset
pub fn effort_for(codec: CodecId, preset: QualityPreset) -> EncoderEffort {
    match codec {
        CodecId::H264 | CodecId::Hevc => EncoderEffort::X26x {
            preset: match preset {
                QualityPreset::Fast => "ultrafast",
                QualityPreset::Balanced => "veryfast",
                QualityPreset::High => "medium",
            },
        },
        CodecId::Vp9 => match preset {
            QualityPreset::Fast => EncoderEffort::Vpx {
                deadline: "realtime",
                cpu_used: 8,
            },
            QualityPreset::Balanced => EncoderEffort::Vpx {
                deadline: "good",
                cpu_used: 4,
            },
            QualityPreset::High => EncoderEffort::Vpx {
                deadline: "good",
                cpu_used: 1,
            },
        },
    }
}

/// The fastest effort value the codec's encoder accepts
pub fn fastest_effort(codec: CodecId) -> EncoderEffort {
    effort_for(codec, QualityPreset::Fast)
}

/// Constant rate factor for a codec and preset; lower is higher quality
pub fn crf_for(codec: CodecId, preset: QualityPreset) -> u8 {
    match (codec, preset) {
        (CodecId::H264, QualityPreset::Fast) => 28,
        (CodecId::H264, QualityPreset::Balanced) => 23,
        (CodecId::H264, QualityPreset::High) => 20,
        (CodecId::Hevc, QualityPreset::Fast) => 30,
        (CodecId::Hevc, QualityPreset::Balanced) => 28,
        (CodecId::Hevc, QualityPreset::High) => 24,
        (CodecId::Vp9, QualityPreset::Fast) => 40,
        (CodecId::Vp9, QualityPreset::Balanced) => 33,
        (CodecId::Vp9, QualityPreset::High) => 28,
    }
}

/// Bitrate-driven rate control for a ceiling in Mbit/s
pub fn bitrate_control(max_bitrate_mbps: f64) -> RateControl {
    let target_kbps = ((max_bitrate_mbps * 1000.0).round() as u32).max(1);
    RateControl::Bitrate {
        target_kbps,
        max_kbps: target_kbps,
        buffer_kbps: target_kbps.saturating_mul(2),
    }
}
