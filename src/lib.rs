//! vidshrink adaptive video compression library
//!
//! Negotiates an output codec against playback capability, plans resolution
//! and quality from the input size, and drives a native encoder with
//! monotonic progress, cooperative cancellation and a hard time budget.
//!
//! ```no_run
//! use vidshrink::{
//!     AppContainer, CancellationToken, CompressRequest, CompressionOptions, CompressorConfig,
//!     DefaultAppContainer,
//! };
//!
//! # async fn run() -> vidshrink::CompressResult<()> {
//! let container = DefaultAppContainer::new(CompressorConfig::default()).await?;
//! let bytes = std::fs::read("clip.mov")?;
//! let request = CompressRequest::new(bytes, "clip.mov");
//! let result = container
//!     .compressor()
//!     .compress(&request, &CompressionOptions::default(), None, &CancellationToken::new())
//!     .await?;
//! println!("{} ({:.1}% saved)", result.output_filename, result.compression_ratio_percent);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, CompressRequest, CompressionTask, Compressor, DefaultAppContainer};
pub use config::CompressorConfig;
pub use domain::model::{
    CodecDescriptor, CodecId, CompressionOptions, CompressionResult, EncodePlan, InputMetadata,
    ProgressEvent, ProgressStage, QualityPreset,
};
pub use engine::{CancellationToken, EncodePipeline, PipelineState, ProgressSink};
pub use error::{CompressResult, CompressionError};
