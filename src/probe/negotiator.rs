//! Codec negotiation against playback capability

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::model::{CodecDescriptor, CodecId};
use crate::ports::CapabilityProber;

/// Selects one working codec from a priority list
///
/// The universal fallback is always treated as decodable and is always part
/// of the list, so negotiation never fails.
pub struct CodecNegotiator {
    prober: Arc<dyn CapabilityProber>,
    priority: Vec<CodecDescriptor>,
}

impl CodecNegotiator {
    /// Negotiator over the built-in priority list (HEVC, VP9, H.264)
    pub fn new(prober: Arc<dyn CapabilityProber>) -> Self {
        Self {
            prober,
            priority: CodecDescriptor::builtin_priority().to_vec(),
        }
    }

    /// Negotiator over a custom priority list
    ///
    /// Duplicates are dropped and the universal fallback is appended when absent.
    pub fn with_priority(prober: Arc<dyn CapabilityProber>, priority: &[CodecId]) -> Self {
        let mut list: Vec<CodecDescriptor> = Vec::with_capacity(priority.len() + 1);
        for id in priority {
            let descriptor = CodecDescriptor::for_id(*id);
            if !list.contains(&descriptor) {
                list.push(descriptor);
            }
        }
        if !list.iter().any(|c| c.is_universal()) {
            list.push(CodecDescriptor::universal());
        }

        Self {
            prober,
            priority: list,
        }
    }

    /// The effective priority list
    pub fn priority(&self) -> &[CodecDescriptor] {
        &self.priority
    }

    /// Whether the playback target can decode this codec
    pub fn is_supported(&self, codec: &CodecDescriptor) -> bool {
        codec.is_universal() || self.prober.supports(codec.codec_id)
    }

    /// Pick the first supported codec in priority order
    pub fn negotiate(&self) -> CodecDescriptor {
        for codec in &self.priority {
            if self.is_supported(codec) {
                info!("Negotiated codec: {}", codec.display_name);
                return *codec;
            }
            debug!("Codec {} not decodable by playback target", codec.display_name);
        }

        CodecDescriptor::universal()
    }

    /// Support status of every codec in the list, in priority order
    pub fn report(&self) -> Vec<(CodecDescriptor, bool)> {
        self.priority
            .iter()
            .map(|codec| (*codec, self.is_supported(codec)))
            .collect()
    }
}
