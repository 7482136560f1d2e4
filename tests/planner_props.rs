//! Property tests for resolution fitting, rate control and codec negotiation

use std::sync::Arc;

use proptest::prelude::*;

use vidshrink::planner::{fit_dimensions, EncodePlanner};
use vidshrink::probe::{CodecNegotiator, StaticCapabilityProber};
use vidshrink::{CodecDescriptor, CodecId, CompressionOptions, InputMetadata};

fn codec_strategy() -> impl Strategy<Value = CodecId> {
    prop_oneof![Just(CodecId::Hevc), Just(CodecId::Vp9), Just(CodecId::H264)]
}

/// Source dimensions, up to 8K with a little headroom
fn dimensions_strategy() -> impl Strategy<Value = (u32, u32)> {
    (2u32..=8192, 2u32..=8192)
}

fn box_strategy() -> impl Strategy<Value = (u32, u32)> {
    (2u32..=4096, 2u32..=4096)
}

proptest! {
    /// Outputs are even and never below 2
    #[test]
    fn prop_dimensions_even(
        (width, height) in dimensions_strategy(),
        (max_width, max_height) in box_strategy(),
    ) {
        let (w, h) = fit_dimensions(width, height, max_width, max_height);
        prop_assert_eq!(w % 2, 0);
        prop_assert_eq!(h % 2, 0);
        prop_assert!(w >= 2 && h >= 2);
    }

    /// Outputs stay inside the box and never upscale
    #[test]
    fn prop_dimensions_bounded(
        (width, height) in dimensions_strategy(),
        (max_width, max_height) in box_strategy(),
    ) {
        let (w, h) = fit_dimensions(width, height, max_width, max_height);
        prop_assert!(w <= max_width.max(2), "{} > {}", w, max_width);
        prop_assert!(h <= max_height.max(2), "{} > {}", h, max_height);
        prop_assert!(w <= width.max(2));
        prop_assert!(h <= height.max(2));
    }

    /// Each axis is within 1 px of exact aspect-preserving scaling
    #[test]
    fn prop_dimensions_preserve_aspect(
        (width, height) in dimensions_strategy(),
        (max_width, max_height) in box_strategy(),
    ) {
        let scale = f64::min(
            1.0,
            f64::min(max_width as f64 / width as f64, max_height as f64 / height as f64),
        );
        let exact_w = width as f64 * scale;
        let exact_h = height as f64 * scale;
        prop_assume!(exact_w >= 2.0 && exact_h >= 2.0);

        let (w, h) = fit_dimensions(width, height, max_width, max_height);
        prop_assert!((w as f64 - exact_w).abs() <= 1.0, "width {} vs {}", w, exact_w);
        prop_assert!((h as f64 - exact_h).abs() <= 1.0, "height {} vs {}", h, exact_h);
    }

    /// An explicit bitrate always replaces constant quality
    #[test]
    fn prop_bitrate_disables_crf(
        mbps in 0.1f64..50.0,
        codec in codec_strategy(),
        size_mb in 1u64..200,
    ) {
        let meta = InputMetadata::new(1920, 1080, size_mb * 1024 * 1024).unwrap();
        let options = CompressionOptions::default().with_max_bitrate_mbps(mbps);
        let plan = EncodePlanner::default()
            .plan(&meta, &options, CodecDescriptor::for_id(codec))
            .unwrap();

        prop_assert!(plan.quality_params.crf().is_none());
        prop_assert!(plan.quality_params.target_bitrate_kbps().is_some());

        let plan = EncodePlanner::default()
            .plan(&meta, &CompressionOptions::default(), CodecDescriptor::for_id(codec))
            .unwrap();
        prop_assert!(plan.quality_params.crf().is_some());
        prop_assert!(plan.quality_params.target_bitrate_kbps().is_none());
    }

    /// Negotiation always yields a decodable codec, the first one in priority order
    #[test]
    fn prop_negotiation_is_total(
        priority in prop::collection::vec(codec_strategy(), 0..6),
        supported in prop::collection::vec(codec_strategy(), 0..3),
    ) {
        let prober = Arc::new(StaticCapabilityProber::new(supported.iter().copied()));
        let negotiator = CodecNegotiator::with_priority(prober, &priority);
        let chosen = negotiator.negotiate();

        prop_assert!(chosen.is_universal() || supported.contains(&chosen.codec_id));

        let expected = priority
            .iter()
            .copied()
            .find(|id| *id == CodecId::H264 || supported.contains(id))
            .unwrap_or(CodecId::H264);
        prop_assert_eq!(chosen.codec_id, expected);
    }
}
