use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::exec_ffmpeg::locate_binary;
use crate::adapters::{FfmpegCapabilityProber, FfmpegLoader, FfprobeMediaProbe};
use crate::app::compress_interactor::Compressor;
use crate::config::CompressorConfig;
use crate::engine::EncodePipeline;
use crate::error::CompressResult;
use crate::planner::EncodePlanner;
use crate::ports::{CapabilityProber, EngineLoader, MediaProbe};
use crate::probe::{CodecNegotiator, StaticCapabilityProber};

pub trait AppContainer: Send + Sync {
    fn compressor(&self) -> Arc<Compressor>;
    fn config(&self) -> &CompressorConfig;
}

pub struct DefaultAppContainer {
    config: CompressorConfig,
    compressor: Arc<Compressor>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg-backed adapters described by `config`
    pub async fn new(config: CompressorConfig) -> CompressResult<Self> {
        let prober = Self::capability_prober(&config).await;
        let loader = Arc::new(FfmpegLoader::new(config.engine.ffmpeg_path.clone()));
        let media_probe = Arc::new(FfprobeMediaProbe::new(config.engine.ffprobe_path.clone()));

        Self::with_ports(config, prober, loader, media_probe)
    }

    /// Wire explicit port implementations
    pub fn with_ports(
        config: CompressorConfig,
        prober: Arc<dyn CapabilityProber>,
        loader: Arc<dyn EngineLoader>,
        media_probe: Arc<dyn MediaProbe>,
    ) -> CompressResult<Self> {
        config.validate()?;

        let negotiator = CodecNegotiator::with_priority(prober, &config.playback.priority);
        let planner = EncodePlanner::new(config.planner_policy());
        let pipeline = EncodePipeline::new(loader, config.engine.threads);

        let compressor = Arc::new(Compressor::new(
            negotiator,
            planner,
            pipeline,
            media_probe,
            config.progress,
        ));

        Ok(Self { config, compressor })
    }

    /// Declared decoders win; otherwise ask the local encoder
    async fn capability_prober(config: &CompressorConfig) -> Arc<dyn CapabilityProber> {
        if let Some(decoders) = &config.playback.decoders {
            debug!("Using declared playback decoders: {:?}", decoders);
            return Arc::new(StaticCapabilityProber::new(decoders.iter().copied()));
        }

        Self::local_prober(config).await
    }

    #[cfg(feature = "libav")]
    async fn local_prober(_config: &CompressorConfig) -> Arc<dyn CapabilityProber> {
        debug!("Probing codec support through libav");
        Arc::new(crate::adapters::LibavCapabilityProber::new())
    }

    #[cfg(not(feature = "libav"))]
    async fn local_prober(config: &CompressorConfig) -> Arc<dyn CapabilityProber> {
        match locate_binary(config.engine.ffmpeg_path.as_deref(), "ffmpeg") {
            Ok(binary) => Arc::new(FfmpegCapabilityProber::detect(&binary).await),
            Err(e) => {
                info!(
                    "Codec probing unavailable ({}), offering the universal codec only",
                    e
                );
                Arc::new(StaticCapabilityProber::default())
            }
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn compressor(&self) -> Arc<Compressor> {
        Arc::clone(&self.compressor)
    }

    fn config(&self) -> &CompressorConfig {
        &self.config
    }
}
