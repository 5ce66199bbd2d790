//! CLI module for Chopper
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Chopper video helper
///
/// Trims a clip without re-encoding, optionally wraps it in an intro and
/// outro and burns in a watermark.
#[derive(Parser, Debug)]
#[command(name = "chopper")]
#[command(about = "Trim, join and watermark video files with ffmpeg")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/chopper/config.toml)
    #[arg(long, global = true, env = "CHOPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that receives finished files
    #[arg(long, global = true)]
    pub output_root: Option<PathBuf>,

    /// Console logging level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// The command to execute; prompts interactively when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prompt for runs until end of input
    Interactive,
    /// Perform a single run described by flags
    Run(args::RunArgs),
    /// Show the stream summary of a media file
    Probe(args::ProbeArgs),
}
