//! Encode parameter planning module
//!
//! Resolution and quality decisions live here; the policy table is data so the
//! size thresholds can be tuned from configuration.

pub mod policy;
pub mod quality;
pub mod strategy;

pub use policy::{PlannerPolicy, SizeTier, TimeBudgetPolicy};
pub use strategy::{fit_dimensions, EncodePlanner};
