//! Common utilities and helpers

use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod logging;

/// Extensions treated as video input when compressing a directory
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "mkv", "webm", "avi", "wmv", "flv", "mpg", "mpeg", "ts", "mts", "m2ts",
    "3gp",
];

/// Utility functions for vidshrink
pub struct Utils;

impl Utils {
    /// Elapsed time as `1h02m05s`, `4m07s` or `12.4s`
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        match (secs / 3600, secs % 3600 / 60, secs % 60) {
            (0, 0, _) => format!("{:.1}s", duration.as_secs_f64()),
            (0, m, s) => format!("{}m{:02}s", m, s),
            (h, m, s) => format!("{}h{:02}m{:02}s", h, m, s),
        }
    }

    /// Byte count in binary units, e.g. `80.0 MiB`
    pub fn format_file_size(bytes: u64) -> String {
        const STEPS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
        if bytes < 1024 {
            return format!("{} B", bytes);
        }

        let mut value = bytes as f64 / 1024.0;
        let mut unit = STEPS[0];
        for next in &STEPS[1..] {
            if value < 1024.0 {
                break;
            }
            value /= 1024.0;
            unit = *next;
        }
        format!("{:.1} {}", value, unit)
    }

    /// Whether the path has a known video extension
    pub fn is_video_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Where to write an artifact: into `out` if it is a directory, at `out`
    /// itself for a single input, else next to the source
    pub fn output_path(source: &Path, artifact_name: &str, out: Option<&Path>) -> PathBuf {
        match out {
            Some(out) if out.is_dir() => out.join(artifact_name),
            Some(out) => out.to_path_buf(),
            None => source
                .parent()
                .map(|dir| dir.join(artifact_name))
                .unwrap_or_else(|| PathBuf::from(artifact_name)),
        }
    }
}
