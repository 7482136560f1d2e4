//! CLI module for vidshrink
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

/// vidshrink adaptive video compressor
///
/// Negotiates the most efficient codec the playback target can decode, sizes
/// the output to the input, and re-encodes with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "vidshrink")]
#[command(about = "vidshrink - Adaptive video compression")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML with a [vidshrink] table)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress a video file, or every video in a directory
    Compress(args::CompressArgs),
    /// Print the encode plan for given input properties without encoding
    Plan(args::PlanArgs),
    /// Show which codecs the playback target supports and which one is chosen
    Codecs(args::CodecsArgs),
}
