//! Encode engine control: command construction, pipeline, progress and cancellation

use std::fmt;

use serde::Serialize;

pub mod cancel;
pub mod command;
pub mod pipeline;
pub mod progress;

pub use cancel::{CancellationToken, SuspendPoint};
pub use command::EncodeCommand;
pub use pipeline::EncodePipeline;
pub use progress::{FallbackTicker, ProgressConfig, ProgressMonitor, ProgressSink};

/// Lifecycle state of the encode pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Engine not loaded yet, or the last load failed
    Uninitialized,
    /// Engine load in flight
    Initializing,
    /// Engine loaded, nothing staged
    Ready,
    /// Input written to working storage
    Staged,
    /// Native command running
    Encoding,
    /// Reading the output back
    Extracting,
    /// Last call succeeded
    Idle,
    /// Last call was cancelled or timed out
    Cancelled,
    /// Last call failed
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Uninitialized => "uninitialized",
            PipelineState::Initializing => "initializing",
            PipelineState::Ready => "ready",
            PipelineState::Staged => "staged",
            PipelineState::Encoding => "encoding",
            PipelineState::Extracting => "extracting",
            PipelineState::Idle => "idle",
            PipelineState::Cancelled => "cancelled",
            PipelineState::Failed => "failed",
        };
        f.write_str(label)
    }
}
