//! Single-call encode pipeline over the native engine
//!
//! One call walks `Ready -> Staged -> Encoding -> Extracting -> Idle`. The
//! engine is loaded once and shared; its working storage and listeners are
//! not call-scoped, so calls are serialized behind an owned mutex that stays
//! held until the native command really returns, timeouts included.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OnceCell, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::cancel::{CancellationToken, SuspendPoint};
use super::command::EncodeCommand;
use super::PipelineState;
use crate::domain::model::EncodePlan;
use crate::error::{CompressResult, CompressionError, EngineError};
use crate::ports::{EncoderEngine, EngineLoader, ListenerId, ProgressListener};

/// How long a timed-out call waits for the engine to honor an abort
const ABORT_GRACE: Duration = Duration::from_secs(5);

/// Owns the engine lifecycle and runs one encode at a time
pub struct EncodePipeline {
    loader: Arc<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn EncoderEngine>>,
    encode_lock: Arc<AsyncMutex<()>>,
    state: Mutex<PipelineState>,
    active: Mutex<Option<CancellationToken>>,
    sequence: AtomicU64,
    threads: usize,
}

impl EncodePipeline {
    pub fn new(loader: Arc<dyn EngineLoader>, threads: usize) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
            encode_lock: Arc::new(AsyncMutex::new(())),
            state: Mutex::new(PipelineState::Uninitialized),
            active: Mutex::new(None),
            sequence: AtomicU64::new(0),
            threads,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(PipelineState::Failed)
    }

    /// Request cancellation of the encode currently holding the engine
    ///
    /// Returns `false` when no call is running.
    pub fn cancel(&self) -> bool {
        match self.active.lock().ok().and_then(|active| active.clone()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn set_active(&self, token: Option<CancellationToken>) {
        if let Ok(mut active) = self.active.lock() {
            *active = token;
        }
    }

    fn set_state(&self, next: PipelineState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("Pipeline state {} -> {}", *state, next);
            *state = next;
        }
    }

    /// Load the engine if needed; concurrent callers share one load
    ///
    /// A failed load leaves the pipeline uninitialized so a later call retries.
    pub async fn load_engine(&self) -> CompressResult<Arc<dyn EncoderEngine>> {
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let engine = self
            .engine
            .get_or_try_init(|| async {
                self.set_state(PipelineState::Initializing);
                info!("Loading encoder engine");
                match self.loader.load().await {
                    Ok(engine) => {
                        self.set_state(PipelineState::Ready);
                        Ok(engine)
                    }
                    Err(e) => {
                        self.set_state(PipelineState::Uninitialized);
                        Err(map_load_error(e))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(engine))
    }

    /// Run one encode of `input` according to `plan` and return the output bytes
    pub async fn execute(
        &self,
        input: &[u8],
        source_filename: &str,
        plan: &EncodePlan,
        on_progress: ProgressListener,
        cancel: &CancellationToken,
    ) -> CompressResult<Vec<u8>> {
        let engine = self.load_engine().await?;

        let guard = Arc::new(Arc::clone(&self.encode_lock).lock_owned().await);
        self.set_active(Some(cancel.clone()));
        let names = StagedNames::new(
            self.sequence.fetch_add(1, Ordering::Relaxed),
            source_filename,
            plan.codec.file_extension,
        );

        let outcome = self
            .run_locked(&engine, &guard, &names, input, plan, on_progress, cancel)
            .await;

        remove_entries(&engine, &names).await;
        self.set_active(None);
        self.set_state(match &outcome {
            Ok(_) => PipelineState::Idle,
            Err(CompressionError::Cancelled) | Err(CompressionError::TimedOut { .. }) => {
                PipelineState::Cancelled
            }
            Err(_) => PipelineState::Failed,
        });

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_locked(
        &self,
        engine: &Arc<dyn EncoderEngine>,
        guard: &Arc<OwnedMutexGuard<()>>,
        names: &StagedNames,
        input: &[u8],
        plan: &EncodePlan,
        on_progress: ProgressListener,
        cancel: &CancellationToken,
    ) -> CompressResult<Vec<u8>> {
        cancel.checkpoint(SuspendPoint::BeforeStaging)?;

        engine
            .write_file(&names.input, input)
            .await
            .map_err(|e| CompressionError::encode(format!("failed to stage input: {}", e)))?;
        self.set_state(PipelineState::Staged);
        debug!("Staged {} ({} bytes)", names.input, input.len());

        cancel.checkpoint(SuspendPoint::AfterStaging)?;

        let args = EncodeCommand::new(plan, self.threads).build(&names.input, &names.output);
        debug!("Encode arguments: {}", args.join(" "));

        let listener = ListenerGuard::attach(Arc::clone(engine), on_progress);
        self.set_state(PipelineState::Encoding);

        let mut worker = {
            let engine = Arc::clone(engine);
            let guard = Arc::clone(guard);
            tokio::spawn(async move {
                let result = engine.exec(&args).await;
                drop(guard);
                result
            })
        };

        let result = match tokio::time::timeout(plan.time_budget(), &mut worker).await {
            Ok(joined) => joined.map_err(|e| {
                CompressionError::encode(format!("encode task terminated: {}", e))
            })?,
            Err(_) => {
                warn!(
                    "Encode exceeded time budget of {}s, aborting",
                    plan.time_budget_seconds
                );
                engine.abort();
                drop(listener);
                // The worker keeps its share of the lock until the native call returns
                match tokio::time::timeout(ABORT_GRACE, &mut worker).await {
                    Ok(Err(e)) => warn!("Encode task ended abnormally after abort: {}", e),
                    Ok(Ok(_)) => debug!("Encode stopped after abort"),
                    Err(_) => {
                        warn!("Encoder ignored abort; engine stays locked until it returns");
                        let engine = Arc::clone(engine);
                        let names = names.clone();
                        tokio::spawn(async move {
                            // Entries written after the call gave up are removed here
                            let _ = worker.await;
                            remove_entries(&engine, &names).await;
                        });
                    }
                }
                return Err(CompressionError::TimedOut {
                    seconds: plan.time_budget_seconds,
                });
            }
        };

        drop(listener);

        // A cancel during the native call wins over whatever it returned
        cancel.checkpoint(SuspendPoint::BeforeExtraction)?;
        result.map_err(map_exec_error)?;
        self.set_state(PipelineState::Extracting);

        let output = match engine.read_file(&names.output).await {
            Ok(bytes) if bytes.is_empty() => {
                return Err(CompressionError::encode("encoder produced an empty output"));
            }
            Ok(bytes) => bytes,
            Err(EngineError::FileNotFound(_)) => {
                return Err(CompressionError::encode("encoder produced no output"));
            }
            Err(e) => {
                return Err(CompressionError::encode(format!(
                    "failed to read output: {}",
                    e
                )))
            }
        };

        cancel.checkpoint(SuspendPoint::AfterExtraction)?;
        Ok(output)
    }
}

/// Remove one call's entries from working storage
async fn remove_entries(engine: &Arc<dyn EncoderEngine>, names: &StagedNames) {
    for name in [&names.input, &names.output] {
        match engine.delete_file(name).await {
            Ok(()) => debug!("Removed working entry {}", name),
            Err(EngineError::FileNotFound(_)) => {}
            Err(e) => warn!("Failed to remove working entry {}: {}", name, e),
        }
    }
}

/// Per-call working storage names, unique across calls
#[derive(Clone)]
struct StagedNames {
    input: String,
    output: String,
}

impl StagedNames {
    fn new(sequence: u64, source_filename: &str, output_extension: &str) -> Self {
        let input_extension = std::path::Path::new(source_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_ascii_lowercase();

        Self {
            input: format!("input_{}.{}", sequence, input_extension),
            output: format!("output_{}.{}", sequence, output_extension),
        }
    }
}

/// Detaches the progress listener when dropped
struct ListenerGuard {
    engine: Arc<dyn EncoderEngine>,
    id: ListenerId,
}

impl ListenerGuard {
    fn attach(engine: Arc<dyn EncoderEngine>, listener: ProgressListener) -> Self {
        let id = engine.add_progress_listener(listener);
        Self { engine, id }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.engine.remove_progress_listener(self.id);
    }
}

fn map_load_error(error: EngineError) -> CompressionError {
    match error {
        EngineError::Unavailable(message) => CompressionError::UnsupportedEnvironment { message },
        other => CompressionError::InitializationFailure {
            message: other.to_string(),
        },
    }
}

fn map_exec_error(error: EngineError) -> CompressionError {
    match error {
        EngineError::CommandFailed { status, diagnostic } => {
            let diagnostic = diagnostic.trim();
            if diagnostic.is_empty() {
                CompressionError::encode(format!("encoder exited with {}", status))
            } else {
                CompressionError::encode(diagnostic.to_string())
            }
        }
        other => CompressionError::encode(other.to_string()),
    }
}
