// Application layer - Use case interactors

pub mod compress_interactor;
pub mod container;

// Re-export interactors
pub use compress_interactor::{CompressRequest, CompressionTask, Compressor};
pub use container::{AppContainer, DefaultAppContainer};
