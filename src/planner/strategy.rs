//! Encode parameter planning

use tracing::debug;

use crate::domain::model::*;
use crate::error::CompressResult;
use crate::planner::policy::PlannerPolicy;
use crate::planner::quality;

/// Derives an [`EncodePlan`] from input metadata, options and the negotiated codec
///
/// Pure computation: no I/O and no shared state.
#[derive(Debug, Clone, Default)]
pub struct EncodePlanner {
    policy: PlannerPolicy,
}

impl EncodePlanner {
    /// Create a new planner with the given policy table
    pub fn new(policy: PlannerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PlannerPolicy {
        &self.policy
    }

    /// Plan the encode
    pub fn plan(
        &self,
        input: &InputMetadata,
        options: &CompressionOptions,
        codec: CodecDescriptor,
    ) -> CompressResult<EncodePlan> {
        options.validate()?;

        let (max_width, max_height) = self.resolution_box(input, options);
        let (output_width, output_height) =
            fit_dimensions(input.width, input.height, max_width, max_height);

        let rate_control = match options.max_bitrate_mbps {
            Some(mbps) => quality::bitrate_control(mbps),
            None => RateControl::ConstantQuality {
                crf: quality::crf_for(codec.codec_id, options.quality_preset),
            },
        };

        let quality_params = QualityParams {
            rate_control,
            effort: quality::effort_for(codec.codec_id, options.quality_preset),
            keyframes: KeyframePolicy::default(),
        };

        let time_budget_seconds = self.policy.time_budget.budget_for(input.size_mb());

        debug!(
            "Planned {} encode: {}x{} -> {}x{} (box {}x{}), {:?}, budget {}s",
            codec.display_name,
            input.width,
            input.height,
            output_width,
            output_height,
            max_width,
            max_height,
            quality_params.rate_control,
            time_budget_seconds
        );

        Ok(EncodePlan {
            codec,
            output_width,
            output_height,
            quality_params,
            time_budget_seconds,
        })
    }

    /// Effective resolution ceiling: caller values win per axis, else the size tier
    pub fn resolution_box(
        &self,
        input: &InputMetadata,
        options: &CompressionOptions,
    ) -> (u32, u32) {
        let tier = self.policy.tier_for(input.size_mb());
        let (default_width, default_height) = if input.is_portrait() {
            (tier.short_edge, tier.long_edge)
        } else {
            (tier.long_edge, tier.short_edge)
        };

        (
            options.max_width.unwrap_or(default_width),
            options.max_height.unwrap_or(default_height),
        )
    }
}

/// Fit `width`x`height` inside `max_width`x`max_height`, preserving aspect ratio
///
/// Both outputs are even, at least 2, never above the even floor of their
/// max, and within 1 px of exact scaling.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (even_floor(width), even_floor(height));
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    (
        nearest_even(width as f64 * scale).min(even_floor(max_width)),
        nearest_even(height as f64 * scale).min(even_floor(max_height)),
    )
}

fn even_floor(value: u32) -> u32 {
    (value & !1).max(2)
}

fn nearest_even(value: f64) -> u32 {
    (((value / 2.0).round() as u32) * 2).max(2)
}
