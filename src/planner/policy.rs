//! Size-tiered planning policy
//!
//! The thresholds here are empirical policy rather than codec constraints, so
//! they are plain data loaded from configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CompressResult, CompressionError};

/// Default resolution ceiling for inputs above a size threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeTier {
    /// Applies to inputs strictly larger than this many MiB
    pub above_mb: f64,
    /// Ceiling for the long edge
    pub long_edge: u32,
    /// Ceiling for the short edge
    pub short_edge: u32,
}

/// Wall-clock ceiling for one encode, scaled by input size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBudgetPolicy {
    pub base_seconds: u64,
    pub seconds_per_mb: f64,
    pub max_seconds: u64,
}

impl Default for TimeBudgetPolicy {
    fn default() -> Self {
        Self {
            base_seconds: 300,
            seconds_per_mb: 6.0,
            max_seconds: 1800,
        }
    }
}

impl TimeBudgetPolicy {
    /// Budget in whole seconds for an input of `size_mb`
    pub fn budget_for(&self, size_mb: f64) -> u64 {
        let scaled = self.base_seconds as f64 + self.seconds_per_mb * size_mb.max(0.0);
        (scaled.round() as u64).clamp(self.base_seconds, self.max_seconds.max(self.base_seconds))
    }
}

/// Planner policy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerPolicy {
    /// Tiers in any order; the largest matching threshold wins
    pub size_tiers: Vec<SizeTier>,
    /// Configured through the `timeout` section
    #[serde(skip)]
    pub time_budget: TimeBudgetPolicy,
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        Self {
            size_tiers: vec![
                SizeTier {
                    above_mb: 50.0,
                    long_edge: 1280,
                    short_edge: 720,
                },
                SizeTier {
                    above_mb: 30.0,
                    long_edge: 1920,
                    short_edge: 1080,
                },
                SizeTier {
                    above_mb: 0.0,
                    long_edge: 2560,
                    short_edge: 1440,
                },
            ],
            time_budget: TimeBudgetPolicy::default(),
        }
    }
}

/// Used only when the configured tier list is empty
const FALLBACK_TIER: SizeTier = SizeTier {
    above_mb: 0.0,
    long_edge: 1920,
    short_edge: 1080,
};

impl PlannerPolicy {
    /// Pick the tier for an input of `size_mb`
    pub fn tier_for(&self, size_mb: f64) -> SizeTier {
        let mut tiers = self.size_tiers.clone();
        tiers.sort_by(|a, b| b.above_mb.total_cmp(&a.above_mb));

        tiers
            .iter()
            .find(|tier| size_mb > tier.above_mb)
            .or_else(|| tiers.last())
            .copied()
            .unwrap_or(FALLBACK_TIER)
    }

    /// Check the table for values the planner cannot use
    pub fn validate(&self) -> CompressResult<()> {
        if self.size_tiers.is_empty() {
            return Err(CompressionError::Config {
                message: "planner.size_tiers must contain at least one tier".to_string(),
            });
        }

        for tier in &self.size_tiers {
            if tier.short_edge < 2 || tier.long_edge < tier.short_edge {
                return Err(CompressionError::Config {
                    message: format!(
                        "invalid size tier above {} MB: {}x{}",
                        tier.above_mb, tier.long_edge, tier.short_edge
                    ),
                });
            }
            if !tier.above_mb.is_finite() || tier.above_mb < 0.0 {
                return Err(CompressionError::Config {
                    message: format!("invalid size tier threshold: {}", tier.above_mb),
                });
            }
        }

        if self.time_budget.max_seconds < self.time_budget.base_seconds {
            return Err(CompressionError::Config {
                message: "timeout max_seconds must be >= base_seconds".to_string(),
            });
        }

        Ok(())
    }
}
