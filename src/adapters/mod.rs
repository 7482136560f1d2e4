// Adapters - External system implementations

pub mod caps_ffmpeg;
pub mod exec_ffmpeg;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod toml_config;

// Re-export adapters
pub use caps_ffmpeg::FfmpegCapabilityProber;
pub use exec_ffmpeg::{FfmpegEngine, FfmpegLoader};
pub use probe_ffprobe::FfprobeMediaProbe;
#[cfg(feature = "libav")]
pub use probe_libav::LibavCapabilityProber;
pub use toml_config::TomlConfigAdapter;
