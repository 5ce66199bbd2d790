//! Command implementations

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{AppConfig, ConsolePrompter, InstanceLock};
use crate::app::container::AppContainer;
use crate::cli::args::{ProbeArgs, RunArgs};
use crate::domain::model::{MediaMetadata, RunReport};
use crate::utils::format_hms;

/// Execute the interactive prompt loop
pub async fn interactive(container: &dyn AppContainer, config: &AppConfig) -> Result<()> {
    let _lock = InstanceLock::acquire(&config.output_root)?;
    let interactor = container.encode_interactor();
    let mut prompter = ConsolePrompter::terminal(&config.output_root);

    let summary = interactor.run_session(&mut prompter).await?;
    info!(
        "Session finished: {} run(s) completed, {} failed",
        summary.reports.len(),
        summary.failures.len()
    );
    Ok(())
}

/// Execute a single run described on the command line
pub async fn run(container: &dyn AppContainer, config: &AppConfig, args: RunArgs) -> Result<()> {
    let request = args.to_request()?;
    let _lock = InstanceLock::acquire(&config.output_root)?;
    let interactor = container.encode_interactor();

    interactor.prepare()?;
    let report = interactor
        .execute(&request)
        .await
        .with_context(|| format!("Run for {} failed", request.primary.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Execute the probe command
pub async fn probe(container: &dyn AppContainer, args: ProbeArgs) -> Result<()> {
    let metadata = container
        .probe_port()
        .probe(&args.input)
        .await
        .context("Failed to probe input file")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        print_metadata(&args.input.display().to_string(), &metadata);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for output in &report.outputs {
        println!("{}", output.display());
    }
}

fn print_metadata(path: &str, metadata: &MediaMetadata) {
    let or_none = |value: &str| {
        if value.is_empty() {
            "none".to_string()
        } else {
            value.to_string()
        }
    };

    println!("File:        {}", path);
    println!("Container:   {}", metadata.container_format);
    println!(
        "Duration:    {} ({:.3}s)",
        format_hms(metadata.duration_seconds),
        metadata.duration_seconds
    );
    match (metadata.width, metadata.height) {
        (Some(w), Some(h)) => println!("Resolution:  {}x{}", w, h),
        _ => println!("Resolution:  none"),
    }
    println!("Video codec: {}", or_none(&metadata.video_codec));
    println!("Pixel fmt:   {}", or_none(&metadata.pixel_format));
    println!("Frame rate:  {}", or_none(&metadata.frame_rate));
    println!("Audio codec: {}", or_none(&metadata.audio_codec));
    println!("Sample rate: {}", or_none(&metadata.sample_rate));
}
