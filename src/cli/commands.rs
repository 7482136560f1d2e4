//! Command implementations

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::app::{AppContainer, CompressRequest, DefaultAppContainer};
use crate::cli::args::{CodecsArgs, CompressArgs, PlanArgs};
use crate::config::CompressorConfig;
use crate::domain::model::*;
use crate::engine::{CancellationToken, EncodeCommand, ProgressSink};
use crate::utils::Utils;

/// One progress event as printed by `compress --json`
#[derive(Serialize)]
struct ProgressLine<'a> {
    timestamp: DateTime<Utc>,
    file: &'a str,
    #[serde(flatten)]
    event: &'a ProgressEvent,
}

/// Serializable view of a finished compression
#[derive(Debug, Serialize)]
struct CompressionSummary {
    input: PathBuf,
    output: PathBuf,
    codec: CodecId,
    mime_type: &'static str,
    width: u32,
    height: u32,
    original_bytes: u64,
    compressed_bytes: u64,
    saved_percent: f64,
    elapsed_seconds: f64,
}

/// Execute the compress command
pub async fn compress(args: CompressArgs, config: CompressorConfig) -> Result<()> {
    info!("Starting compress operation");
    info!("Input: {}", args.input.display());

    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        return Err(anyhow::anyhow!(
            "No video files found in {}",
            args.input.display()
        ));
    }

    let batch = args.input.is_dir();
    if batch {
        if let Some(out) = &args.output {
            std::fs::create_dir_all(out)
                .with_context(|| format!("Failed to create output directory {}", out.display()))?;
        }
    }

    let container = DefaultAppContainer::new(config)
        .await
        .context("Failed to set up compressor")?;
    let compressor = container.compressor();
    let options = args.options.to_options();

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling after the current step");
                cancel.cancel();
            }
        })
    };

    let mut failures = 0usize;
    for input in &inputs {
        let outcome = compress_one(
            &compressor,
            input,
            args.output.as_deref(),
            &options,
            args.json,
            &cancel,
        )
        .await;

        match outcome {
            Ok(summary) => print_summary(&summary, args.json)?,
            Err(e) if cancel.is_cancelled() => {
                ctrl_c.abort();
                return Err(e.context("Compression cancelled"));
            }
            Err(e) => {
                failures += 1;
                eprintln!("Failed to compress {}: {:#}", input.display(), e);
            }
        }
    }
    ctrl_c.abort();

    if failures > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} files failed to compress",
            failures,
            inputs.len()
        ));
    }

    info!("Compress operation completed successfully");
    Ok(())
}

async fn compress_one(
    compressor: &Arc<crate::app::Compressor>,
    input: &Path,
    out: Option<&Path>,
    options: &CompressionOptions,
    json: bool,
    cancel: &CancellationToken,
) -> Result<CompressionSummary> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());

    let sink = progress_sink(filename.clone(), json);
    let request = CompressRequest::new(bytes, filename);
    let result = compressor
        .compress(&request, options, Some(sink), cancel)
        .await?;

    let output = Utils::output_path(input, &result.output_filename, out);
    tokio::fs::write(&output, &result.output_bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(CompressionSummary {
        input: input.to_path_buf(),
        output,
        codec: result.codec_id,
        mime_type: result.mime_type,
        width: result.output_width,
        height: result.output_height,
        original_bytes: result.original_size_bytes,
        compressed_bytes: result.compressed_size_bytes,
        saved_percent: result.compression_ratio_percent,
        elapsed_seconds: result.elapsed.as_secs_f64(),
    })
}

/// Progress goes to stderr so stdout carries only results
fn progress_sink(file: String, json: bool) -> ProgressSink {
    Arc::new(move |event: ProgressEvent| {
        let mut stderr = std::io::stderr().lock();
        if json {
            let line = ProgressLine {
                timestamp: Utc::now(),
                file: &file,
                event: &event,
            };
            if let Ok(text) = serde_json::to_string(&line) {
                let _ = writeln!(stderr, "{}", text);
            }
        } else {
            let marker = if event.estimated { "~" } else { " " };
            let _ = writeln!(
                stderr,
                "[{:>3}%{}] {}: {}",
                event.percent, marker, file, event.message
            );
        }
    })
}

fn print_summary(summary: &CompressionSummary, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(summary).context("Failed to serialize result")?
        );
    } else {
        println!(
            "{} -> {} [{} {}x{}] {} -> {} ({:.1}% saved) in {}",
            summary.input.display(),
            summary.output.display(),
            summary.codec,
            summary.width,
            summary.height,
            Utils::format_file_size(summary.original_bytes),
            Utils::format_file_size(summary.compressed_bytes),
            summary.saved_percent,
            Utils::format_duration(Duration::from_secs_f64(summary.elapsed_seconds))
        );
    }
    Ok(())
}

/// A single file, or every video file under a directory in path order
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| Utils::is_video_file(path))
        .filter(|path| !is_own_output(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Skip artifacts from an earlier run in the same directory
fn is_own_output(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with("_compressed"))
        .unwrap_or(false)
}

/// Execute the plan command
pub async fn plan(args: PlanArgs, config: CompressorConfig) -> Result<()> {
    let size_bytes = (args.size_mb * 1024.0 * 1024.0).round() as u64;
    let metadata = InputMetadata::new(args.width, args.height, size_bytes)?;
    let options = args.options.to_options();

    let threads = config.engine.threads;
    let container = DefaultAppContainer::new(config)
        .await
        .context("Failed to set up compressor")?;
    let plan = container
        .compressor()
        .plan(&metadata, &options, args.codec)?;

    let output_name = format!("output.{}", plan.codec.file_extension);
    let ffmpeg_args = EncodeCommand::new(&plan, threads).build("input", &output_name);

    let report = serde_json::json!({
        "input": metadata,
        "options": options,
        "plan": plan,
        "ffmpeg_args": ffmpeg_args,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize plan")?
    );
    Ok(())
}

/// Codec support row printed by the codecs command
#[derive(Serialize)]
struct CodecRow {
    codec: CodecId,
    name: &'static str,
    encoder: &'static str,
    mime_type: &'static str,
    supported: bool,
    selected: bool,
}

/// Execute the codecs command
pub async fn codecs(args: CodecsArgs, config: CompressorConfig) -> Result<()> {
    let container = DefaultAppContainer::new(config)
        .await
        .context("Failed to set up compressor")?;
    let compressor = container.compressor();
    let negotiator = compressor.negotiator();
    let selected = negotiator.negotiate();

    let rows: Vec<CodecRow> = negotiator
        .report()
        .into_iter()
        .map(|(codec, supported)| CodecRow {
            codec: codec.codec_id,
            name: codec.display_name,
            encoder: codec.encoder_name,
            mime_type: codec.container_mime_type,
            supported,
            selected: codec == selected,
        })
        .collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialize codec report")?
        );
    } else {
        println!("{:<12} {:<12} {:<11} {:<10}", "CODEC", "ENCODER", "CONTAINER", "SUPPORTED");
        for row in &rows {
            println!(
                "{:<12} {:<12} {:<11} {:<10}{}",
                row.name,
                row.encoder,
                row.mime_type,
                if row.supported { "yes" } else { "no" },
                if row.selected { "  <- selected" } else { "" }
            );
        }
    }
    Ok(())
}
