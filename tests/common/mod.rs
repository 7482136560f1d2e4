//! Scripted in-memory engine and helpers shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use vidshrink::error::{CompressResult, EngineError, EngineResult};
use vidshrink::ports::{
    CapabilityProber, EncoderEngine, EngineLoader, ListenerId, MediaProbe, ProgressListener,
};
use vidshrink::probe::StaticCapabilityProber;
use vidshrink::{
    AppContainer, CodecId, Compressor, CompressorConfig, DefaultAppContainer, InputMetadata,
};

/// What a scripted `exec` does after reporting progress and waiting
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// Write these bytes to the output entry (the last argument)
    Output(Vec<u8>),
    /// Exit unsuccessfully with this diagnostic
    Fail(String),
    /// Exit successfully without writing anything
    NoOutput,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub progress: Vec<f64>,
    pub duration: Duration,
    pub outcome: ExecOutcome,
    pub honor_abort: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            progress: vec![0.25, 0.5, 0.75, 1.0],
            duration: Duration::from_millis(20),
            outcome: ExecOutcome::Output(vec![7u8; 400]),
            honor_abort: true,
        }
    }
}

/// In-memory engine following a [`Script`]
pub struct FakeEngine {
    files: Mutex<HashMap<String, Vec<u8>>>,
    listeners: Mutex<HashMap<u64, ProgressListener>>,
    next_listener: AtomicU64,
    script: Mutex<Script>,
    pub exec_calls: AtomicUsize,
    pub aborts: AtomicUsize,
    running: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    abort_requested: AtomicBool,
    abort_signal: Notify,
    pub last_args: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
            script: Mutex::new(script),
            exec_calls: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            abort_requested: AtomicBool::new(false),
            abort_signal: Notify::new(),
            last_args: Mutex::new(Vec::new()),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn insert_file(&self, name: &str, data: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
    }

    fn notify(&self, fraction: f64) {
        let listeners: Vec<ProgressListener> =
            self.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(fraction);
        }
    }
}

#[async_trait]
impl EncoderEngine for FakeEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()> {
        self.insert_file(name, data);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    async fn delete_file(&self, name: &str) -> EngineResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    fn list_files(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn add_progress_listener(&self, listener: ProgressListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(id, listener);
        ListenerId(id)
    }

    fn remove_progress_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id.0);
    }

    async fn exec(&self, args: &[String]) -> EngineResult<()> {
        self.exec_calls.fetch_add(1, Ordering::SeqCst);
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now_running, Ordering::SeqCst);
        self.abort_requested.store(false, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = args.to_vec();

        let script = self.script.lock().unwrap().clone();
        for fraction in &script.progress {
            self.notify(*fraction);
        }

        let aborted = if script.honor_abort {
            tokio::select! {
                _ = tokio::time::sleep(script.duration) => false,
                _ = self.abort_signal.notified() => self.abort_requested.load(Ordering::SeqCst),
            }
        } else {
            tokio::time::sleep(script.duration).await;
            false
        };

        self.running.fetch_sub(1, Ordering::SeqCst);

        if aborted {
            return Err(EngineError::Aborted);
        }
        match script.outcome {
            ExecOutcome::Output(bytes) => {
                let output = args.last().cloned().unwrap_or_default();
                self.insert_file(&output, &bytes);
                Ok(())
            }
            ExecOutcome::Fail(diagnostic) => Err(EngineError::CommandFailed {
                status: "exit status: 1".to_string(),
                diagnostic,
            }),
            ExecOutcome::NoOutput => Ok(()),
        }
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.abort_requested.store(true, Ordering::SeqCst);
        self.abort_signal.notify_one();
    }
}

/// Loader handing out one shared [`FakeEngine`]
pub struct FakeLoader {
    engine: Arc<FakeEngine>,
    pub loads: AtomicUsize,
    failures_left: AtomicUsize,
    unavailable: bool,
    delay: Duration,
}

impl FakeLoader {
    pub fn new(engine: Arc<FakeEngine>) -> Self {
        Self {
            engine,
            loads: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            unavailable: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self, times: usize) -> Self {
        self.failures_left = AtomicUsize::new(times);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> EngineResult<Arc<dyn EncoderEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.unavailable {
            return Err(EngineError::Unavailable("no encoder on this host".to_string()));
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(EngineError::LoadFailed("corrupt encoder module".to_string()));
        }

        let engine: Arc<dyn EncoderEngine> = Arc::clone(&self.engine) as Arc<dyn EncoderEngine>;
        Ok(engine)
    }
}

/// Probe returning fixed metadata and counting calls
pub struct FakeProbe {
    pub metadata: InputMetadata,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(width: u32, height: u32, size_bytes: u64) -> Self {
        Self {
            metadata: InputMetadata::new(width, height, size_bytes).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, _data: &[u8], _filename: &str) -> CompressResult<InputMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone())
    }
}

/// Config with fast progress polling and a fixed thread count
pub fn test_config() -> CompressorConfig {
    let mut config = CompressorConfig::default();
    config.engine.threads = 2;
    config.progress.poll_interval_ms = 20;
    config
}

/// Compressor wired to fakes, with the playback target decoding `decoders`
pub fn compressor_with(
    engine: Arc<FakeEngine>,
    decoders: &[CodecId],
    probe: Arc<FakeProbe>,
) -> Arc<Compressor> {
    let prober: Arc<dyn CapabilityProber> =
        Arc::new(StaticCapabilityProber::new(decoders.iter().copied()));
    let loader = Arc::new(FakeLoader::new(engine));
    DefaultAppContainer::with_ports(test_config(), prober, loader, probe)
        .unwrap()
        .compressor()
}
