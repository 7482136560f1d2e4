// Compress interactor - Orchestrates the compression use case

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::model::*;
use crate::engine::progress::{COMPLETE, FINALIZING_FLOOR, LOADING_CEILING};
use crate::engine::{
    CancellationToken, EncodePipeline, ProgressConfig, ProgressMonitor, ProgressSink,
};
use crate::error::{CompressResult, CompressionError};
use crate::planner::EncodePlanner;
use crate::ports::MediaProbe;
use crate::probe::CodecNegotiator;

/// One source file to compress
#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub bytes: Arc<[u8]>,
    /// Source name; drives the artifact name and the container hint
    pub filename: String,
    /// Known dimensions; probed from the bytes when absent
    pub metadata: Option<InputMetadata>,
}

impl CompressRequest {
    pub fn new(bytes: impl Into<Arc<[u8]>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: InputMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Compression facade: negotiate, plan, encode, report
pub struct Compressor {
    negotiator: CodecNegotiator,
    planner: EncodePlanner,
    pipeline: EncodePipeline,
    media_probe: Arc<dyn MediaProbe>,
    progress: ProgressConfig,
}

impl Compressor {
    /// Create new compressor with injected collaborators
    pub fn new(
        negotiator: CodecNegotiator,
        planner: EncodePlanner,
        pipeline: EncodePipeline,
        media_probe: Arc<dyn MediaProbe>,
        progress: ProgressConfig,
    ) -> Self {
        Self {
            negotiator,
            planner,
            pipeline,
            media_probe,
            progress,
        }
    }

    pub fn negotiator(&self) -> &CodecNegotiator {
        &self.negotiator
    }

    pub fn pipeline(&self) -> &EncodePipeline {
        &self.pipeline
    }

    /// Plan without encoding; `codec` overrides negotiation
    pub fn plan(
        &self,
        metadata: &InputMetadata,
        options: &CompressionOptions,
        codec: Option<CodecId>,
    ) -> CompressResult<EncodePlan> {
        let codec = match codec {
            Some(id) => CodecDescriptor::for_id(id),
            None => self.negotiator.negotiate(),
        };
        self.planner.plan(metadata, options, codec)
    }

    /// Compress one file
    ///
    /// Emitted progress is non-decreasing and ends at 100 on success. Working
    /// storage is cleaned up on every path.
    pub async fn compress(
        &self,
        request: &CompressRequest,
        options: &CompressionOptions,
        on_progress: Option<ProgressSink>,
        cancel: &CancellationToken,
    ) -> CompressResult<CompressionResult> {
        let started = Instant::now();
        let monitor = ProgressMonitor::new(on_progress, self.progress);

        let outcome = self
            .run(request, options, &monitor, cancel)
            .await
            .map(|(output, plan)| {
                CompressionResult::new(
                    output,
                    request.bytes.len() as u64,
                    &plan,
                    &request.filename,
                    started.elapsed(),
                )
            });

        match &outcome {
            Ok(result) => {
                monitor.emit(COMPLETE, ProgressStage::Finalizing, "Compression complete", false);
                info!(
                    "Compressed {} -> {} ({} -> {} bytes, {:.1}% saved) in {:.2}s",
                    request.filename,
                    result.output_filename,
                    result.original_size_bytes,
                    result.compressed_size_bytes,
                    result.compression_ratio_percent,
                    result.elapsed.as_secs_f64()
                );
            }
            Err(e) if e.is_cancellation() => info!("Compression of {} cancelled", request.filename),
            Err(e) => error!("Compression of {} failed: {}", request.filename, e),
        }

        outcome
    }

    async fn run(
        &self,
        request: &CompressRequest,
        options: &CompressionOptions,
        monitor: &ProgressMonitor,
        cancel: &CancellationToken,
    ) -> CompressResult<(Vec<u8>, EncodePlan)> {
        monitor.emit(0, ProgressStage::Loading, "Loading encoder", false);

        if request.bytes.is_empty() {
            return Err(CompressionError::invalid("input file is empty"));
        }
        options.validate()?;

        let metadata = match &request.metadata {
            Some(metadata) => metadata.clone(),
            None => {
                self.media_probe
                    .probe(&request.bytes, &request.filename)
                    .await?
            }
        };

        let codec = self.negotiator.negotiate();
        if let Some(preferred) = self.negotiator.priority().first() {
            if *preferred != codec {
                warn!(
                    "Preferred codec {} not decodable, using {}",
                    preferred.display_name, codec.display_name
                );
            }
        }

        let plan = self.planner.plan(&metadata, options, codec)?;
        info!(
            "Encoding {} ({}x{}, {:.1} MB) as {} at {}x{}",
            request.filename,
            metadata.width,
            metadata.height,
            metadata.size_mb(),
            plan.codec.display_name,
            plan.output_width,
            plan.output_height
        );

        self.pipeline.load_engine().await?;
        monitor.emit(LOADING_CEILING, ProgressStage::Compressing, "Compressing video", false);

        let ticker = monitor.start_fallback();
        let output = self
            .pipeline
            .execute(
                &request.bytes,
                &request.filename,
                &plan,
                monitor.native_listener(),
                cancel,
            )
            .await;
        drop(ticker);
        let output = output?;

        monitor.emit(FINALIZING_FLOOR, ProgressStage::Finalizing, "Finalizing output", false);
        Ok((output, plan))
    }

    /// Run [`Compressor::compress`] on a background task
    pub fn spawn(
        self: &Arc<Self>,
        request: CompressRequest,
        options: CompressionOptions,
        on_progress: Option<ProgressSink>,
    ) -> CompressionTask {
        let cancel = CancellationToken::new();
        let compressor = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            compressor
                .compress(&request, &options, on_progress, &token)
                .await
        });
        CompressionTask { cancel, handle }
    }
}

/// Handle to a compression running in the background
pub struct CompressionTask {
    cancel: CancellationToken,
    handle: JoinHandle<CompressResult<CompressionResult>>,
}

impl CompressionTask {
    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observing this task's cancellation
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the result
    pub async fn wait(self) -> CompressResult<CompressionResult> {
        self.handle
            .await
            .map_err(|e| CompressionError::encode(format!("compression task failed: {}", e)))?
    }
}
