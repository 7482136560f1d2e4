// Ports - Interface definitions (contracts)

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::error::{CompressResult, EngineResult};

/// Port for querying which codecs the playback target can decode
///
/// Must never fail: an unsupported or indeterminate capability is `false`.
pub trait CapabilityProber: Send + Sync {
    /// Whether streams in this codec can be decoded by the playback target
    fn supports(&self, codec_id: CodecId) -> bool;
}

/// Callback receiving raw native progress as a fraction in `0.0..=1.0`
pub type ProgressListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Handle returned when a progress listener is attached to an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Port for the native encoding engine
///
/// The engine owns a working storage of named entries (the "virtual
/// filesystem") and runs ffmpeg-style argument vectors against it. Neither
/// the storage nor the listeners are call-scoped, so callers must serialize
/// access.
#[async_trait]
pub trait EncoderEngine: Send + Sync {
    /// Write an entry into working storage
    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()>;

    /// Read an entry from working storage
    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>>;

    /// Delete an entry from working storage
    async fn delete_file(&self, name: &str) -> EngineResult<()>;

    /// Names of all entries currently in working storage
    fn list_files(&self) -> Vec<String>;

    /// Attach a progress listener for subsequent commands
    fn add_progress_listener(&self, listener: ProgressListener) -> ListenerId;

    /// Detach a previously attached listener
    fn remove_progress_listener(&self, id: ListenerId);

    /// Execute an encode command; entry names in `args` refer to working storage
    async fn exec(&self, args: &[String]) -> EngineResult<()>;

    /// Best-effort request to stop a running command
    fn abort(&self) {}
}

/// Port for constructing and loading the native engine
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Load the engine. Called at most once per successful initialization.
    async fn load(&self) -> EngineResult<Arc<dyn EncoderEngine>>;
}

/// Port for reading source dimensions and duration
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Probe in-memory media; `filename` is a hint for the container format
    async fn probe(&self, data: &[u8], filename: &str) -> CompressResult<InputMetadata>;
}
