//! Cooperative cancellation

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CompressResult, CompressionError};

/// Points at which a running compression observes cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendPoint {
    BeforeStaging,
    AfterStaging,
    BeforeExtraction,
    AfterExtraction,
}

impl fmt::Display for SuspendPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SuspendPoint::BeforeStaging => "before staging",
            SuspendPoint::AfterStaging => "after staging",
            SuspendPoint::BeforeExtraction => "before extraction",
            SuspendPoint::AfterExtraction => "after extraction",
        };
        f.write_str(label)
    }
}

/// Out-of-band cancellation flag shared between a caller and a running call
///
/// Cancellation never interrupts the native encode; it is observed at the
/// next [`SuspendPoint`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`CompressionError::Cancelled`] if cancellation was requested
    pub fn checkpoint(&self, point: SuspendPoint) -> CompressResult<()> {
        if self.is_cancelled() {
            debug!("Cancellation observed {}", point);
            return Err(CompressionError::Cancelled);
        }
        Ok(())
    }
}
