//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` binary as the native engine. Working storage is a
//! private temporary directory; entry names in command arguments resolve
//! relative to it. Progress comes from `-progress pipe:1` on stdout,
//! normalized against the input duration parsed from the stderr header.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::error::{EngineError, EngineResult};
use crate::ports::*;

/// Stderr lines kept for failure diagnostics
const DIAGNOSTIC_TAIL_LINES: usize = 12;

/// Resolve an executable from an explicit path or from `PATH`
pub fn locate_binary(configured: Option<&Path>, name: &str) -> EngineResult<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            debug!("Using configured {}: {}", name, path.display());
            return Ok(path.to_path_buf());
        }
        return Err(EngineError::Unavailable(format!(
            "configured {} not found at {}",
            name,
            path.display()
        )));
    }

    which::which(name)
        .map(|path| {
            debug!("Using {} from PATH: {}", name, path.display());
            path
        })
        .map_err(|_| EngineError::Unavailable(format!("{} not found in PATH", name)))
}

/// Loads [`FfmpegEngine`] after verifying the binary responds
pub struct FfmpegLoader {
    ffmpeg_path: Option<PathBuf>,
}

impl FfmpegLoader {
    /// `ffmpeg_path` overrides the `PATH` lookup
    pub fn new(ffmpeg_path: Option<PathBuf>) -> Self {
        Self { ffmpeg_path }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> EngineResult<Arc<dyn EncoderEngine>> {
        let binary = locate_binary(self.ffmpeg_path.as_deref(), "ffmpeg")?;

        let output = Command::new(&binary)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                EngineError::LoadFailed(format!("failed to run {}: {}", binary.display(), e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout.lines().next().unwrap_or_default().to_string();
        if !output.status.success() || !version.starts_with("ffmpeg version") {
            return Err(EngineError::LoadFailed(format!(
                "{} does not appear to be ffmpeg",
                binary.display()
            )));
        }

        let workdir = tempfile::Builder::new()
            .prefix("vidshrink-")
            .tempdir()
            .map_err(|e| {
                EngineError::LoadFailed(format!("failed to create working storage: {}", e))
            })?;

        info!("Loaded {}", version);
        debug!("Working storage at {}", workdir.path().display());

        Ok(Arc::new(FfmpegEngine::new(binary, workdir)))
    }
}

/// Native engine backed by an `ffmpeg` child process per command
pub struct FfmpegEngine {
    binary: PathBuf,
    workdir: TempDir,
    listeners: Mutex<HashMap<u64, ProgressListener>>,
    next_listener: AtomicU64,
    abort_requested: AtomicBool,
    abort_signal: Notify,
}

impl FfmpegEngine {
    pub fn new(binary: PathBuf, workdir: TempDir) -> Self {
        Self {
            binary,
            workdir,
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
            abort_requested: AtomicBool::new(false),
            abort_signal: Notify::new(),
        }
    }

    fn entry_path(&self, name: &str) -> EngineResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some();
        if !valid {
            return Err(EngineError::FileNotFound(name.to_string()));
        }
        Ok(self.workdir.path().join(name))
    }

    fn notify_listeners(&self, fraction: f64) {
        let listeners: Vec<ProgressListener> = match self.listeners.lock() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(fraction);
        }
    }
}

#[async_trait]
impl EncoderEngine for FfmpegEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()> {
        let path = self.entry_path(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        let path = self.entry_path(name)?;
        tokio::fs::read(&path).await.map_err(|e| not_found_or_io(name, e))
    }

    async fn delete_file(&self, name: &str) -> EngineResult<()> {
        let path = self.entry_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))
    }

    fn list_files(&self) -> Vec<String> {
        std::fs::read_dir(self.workdir.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn add_progress_listener(&self, listener: ProgressListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut map) = self.listeners.lock() {
            map.insert(id, listener);
        }
        ListenerId(id)
    }

    fn remove_progress_listener(&self, id: ListenerId) {
        if let Ok(mut map) = self.listeners.lock() {
            map.remove(&id.0);
        }
    }

    async fn exec(&self, args: &[String]) -> EngineResult<()> {
        self.abort_requested.store(false, Ordering::SeqCst);

        let mut child = Command::new(&self.binary)
            .args(["-progress", "pipe:1", "-nostats"])
            .args(args)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::CommandFailed {
                status: "spawn failure".to_string(),
                diagnostic: e.to_string(),
            })?;

        let duration = Arc::new(Mutex::new(None::<f64>));
        let stderr_task = child.stderr.take().map(|stderr| {
            let duration = Arc::clone(&duration);
            tokio::spawn(async move {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(seconds) = parse_duration_line(&line) {
                        if let Ok(mut slot) = duration.lock() {
                            slot.get_or_insert(seconds);
                        }
                    }
                    trace!("ffmpeg: {}", line);
                    if tail.len() == DIAGNOSTIC_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });

        let mut progress_lines = child.stdout.take().map(|stdout| BufReader::new(stdout).lines());
        let mut aborted = false;

        let status = loop {
            tokio::select! {
                line = next_progress_line(&mut progress_lines) => match line {
                    Some(line) => {
                        let total = duration.lock().ok().and_then(|d| *d);
                        if let Some(fraction) = progress_fraction(&line, total) {
                            self.notify_listeners(fraction);
                        }
                    }
                    None => progress_lines = None,
                },
                status = child.wait() => break status?,
                _ = self.abort_signal.notified() => {
                    if self.abort_requested.load(Ordering::SeqCst) && !aborted {
                        warn!("Aborting running ffmpeg process");
                        aborted = true;
                        if let Err(e) = child.start_kill() {
                            warn!("Failed to kill ffmpeg: {}", e);
                        }
                    }
                }
            }
        };

        let diagnostic = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if aborted {
            return Err(EngineError::Aborted);
        }
        if !status.success() {
            return Err(EngineError::CommandFailed {
                status: status.to_string(),
                diagnostic,
            });
        }
        Ok(())
    }

    fn abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
        self.abort_signal.notify_one();
    }
}

type ProgressLines = tokio::io::Lines<BufReader<tokio::process::ChildStdout>>;

/// Next stdout line, or pending forever once stdout is closed
async fn next_progress_line(lines: &mut Option<ProgressLines>) -> Option<String> {
    match lines {
        Some(reader) => reader.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

fn not_found_or_io(name: &str, error: std::io::Error) -> EngineError {
    if error.kind() == std::io::ErrorKind::NotFound {
        EngineError::FileNotFound(name.to_string())
    } else {
        EngineError::Io(error)
    }
}

/// Parse the input duration from an ffmpeg header line
///
/// `  Duration: 00:01:02.50, start: 0.000000, bitrate: 1205 kb/s` gives `62.5`.
pub(crate) fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?.trim();
    parse_timestamp(value).filter(|seconds| *seconds > 0.0)
}

/// `HH:MM:SS(.frac)` to seconds
pub(crate) fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Fraction complete from one `-progress` key=value line
pub(crate) fn progress_fraction(line: &str, total_seconds: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        // Both keys are microseconds despite the name of the latter
        "out_time_us" | "out_time_ms" => {
            let total = total_seconds.filter(|t| *t > 0.0)?;
            let micros: f64 = value.parse().ok()?;
            Some((micros / 1_000_000.0 / total).clamp(0.0, 1.0))
        }
        _ => None,
    }
}
