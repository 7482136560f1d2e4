//! Progress normalization with a synthetic fallback for silent encodes

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::domain::model::{ProgressEvent, ProgressStage};
use crate::ports::ProgressListener;

/// Upper bound of the loading band; native progress starts here
pub const LOADING_CEILING: u8 = 5;
/// Start of the finalizing band; native progress stays below it
pub const FINALIZING_FLOOR: u8 = 95;
pub const COMPLETE: u8 = 100;

/// Subscriber callback for progress events
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Fallback ticker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// How long the percent may stay flat before an estimate is synthesized
    pub poll_interval_ms: u64,
    /// Size of each synthesized step
    pub fallback_step: u8,
    /// Synthesized progress never goes past this percent
    pub fallback_ceiling: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            fallback_step: 1,
            fallback_ceiling: 90,
        }
    }
}

impl ProgressConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Monotonic progress sink shared by the native listener and the fallback ticker
///
/// The filter owns the non-decreasing invariant: an event reaches the
/// subscriber only if its percent is strictly greater than the last one
/// delivered. Delivery happens under the monitor lock, so the subscriber must
/// not call back into the monitor.
#[derive(Clone)]
pub struct ProgressMonitor {
    inner: Arc<Mutex<MonitorInner>>,
    sink: Option<ProgressSink>,
    config: ProgressConfig,
}

struct MonitorInner {
    last_percent: Option<u8>,
    last_stage: ProgressStage,
    last_advance: Instant,
}

impl ProgressMonitor {
    /// Create a new monitor delivering to `sink`
    pub fn new(sink: Option<ProgressSink>, config: ProgressConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorInner {
                last_percent: None,
                last_stage: ProgressStage::Loading,
                last_advance: Instant::now(),
            })),
            sink,
            config,
        }
    }

    /// Monitor without a subscriber
    pub fn silent() -> Self {
        Self::new(None, ProgressConfig::default())
    }

    /// Emit an event if it advances the percent. Returns whether it was delivered.
    pub fn emit(
        &self,
        percent: u8,
        stage: ProgressStage,
        message: impl Into<String>,
        estimated: bool,
    ) -> bool {
        let percent = percent.min(COMPLETE);
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };

        if inner.last_percent.is_some_and(|last| percent <= last) {
            return false;
        }

        inner.last_percent = Some(percent);
        inner.last_stage = stage;
        inner.last_advance = Instant::now();

        let event = ProgressEvent {
            percent,
            stage,
            message: message.into(),
            estimated,
        };
        trace!("Progress {}% ({}) {}", event.percent, event.stage, event.message);
        if let Some(sink) = &self.sink {
            sink(event);
        }
        true
    }

    /// Map a native fraction into the compressing band
    pub fn report_native(&self, fraction: f64) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        self.emit(
            native_percent(fraction),
            ProgressStage::Compressing,
            "Compressing video",
            false,
        )
    }

    /// Listener to attach to the engine for this call
    pub fn native_listener(&self) -> ProgressListener {
        let monitor = self.clone();
        Arc::new(move |fraction| {
            monitor.report_native(fraction);
        })
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.inner.lock().ok().and_then(|inner| inner.last_percent)
    }

    /// Synthesize one estimated step if the percent has been flat for a poll interval
    pub fn tick_fallback(&self) -> bool {
        let next = {
            let Ok(inner) = self.inner.lock() else {
                return false;
            };
            if inner.last_stage != ProgressStage::Compressing
                || inner.last_advance.elapsed() < self.config.poll_interval()
            {
                return false;
            }
            let last = inner.last_percent.unwrap_or(LOADING_CEILING);
            let ceiling = self.config.fallback_ceiling.min(FINALIZING_FLOOR - 1);
            if last >= ceiling {
                return false;
            }
            last.saturating_add(self.config.fallback_step.max(1)).min(ceiling)
        };

        // Re-checked by the filter in case native progress overtook us meanwhile
        self.emit(
            next,
            ProgressStage::Compressing,
            "Compressing video (estimated)",
            true,
        )
    }

    /// Start the fallback ticker; it stops when the returned guard is dropped
    pub fn start_fallback(&self) -> FallbackTicker {
        let monitor = self.clone();
        let interval = self.config.poll_interval();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                monitor.tick_fallback();
            }
        });
        FallbackTicker { handle }
    }
}

/// Running fallback ticker; aborted on drop
pub struct FallbackTicker {
    handle: JoinHandle<()>,
}

impl Drop for FallbackTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Native fraction to public percent, kept strictly inside the 5..95 band
pub fn native_percent(fraction: f64) -> u8 {
    let fraction = fraction.clamp(0.0, 1.0);
    let span = f64::from(FINALIZING_FLOOR - 1 - LOADING_CEILING);
    LOADING_CEILING + (fraction * span).round() as u8
}
