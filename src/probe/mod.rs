//! Playback capability probing and codec negotiation

use std::collections::HashSet;

use crate::domain::model::CodecId;
use crate::ports::CapabilityProber;

pub mod negotiator;

pub use negotiator::CodecNegotiator;

/// Capability prober backed by a fixed table
///
/// Used for declared playback targets (`playback.decoders` in configuration)
/// and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilityProber {
    supported: HashSet<CodecId>,
}

impl StaticCapabilityProber {
    pub fn new(supported: impl IntoIterator<Item = CodecId>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }

    /// A target that decodes every built-in codec
    pub fn everything() -> Self {
        Self::new([CodecId::Hevc, CodecId::Vp9, CodecId::H264])
    }
}

impl CapabilityProber for StaticCapabilityProber {
    fn supports(&self, codec_id: CodecId) -> bool {
        self.supported.contains(&codec_id)
    }
}
