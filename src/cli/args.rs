//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::errors::DomainError;
use crate::domain::model::{RunRequest, SecondaryInput, TrimRange};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source video file
    #[arg(short, long)]
    pub input: PathBuf,

    /// In point (HH:MM:SS); defaults to the start of the file
    #[arg(short, long)]
    pub start: Option<String>,

    /// Out point (HH:MM:SS); defaults to the end of the file
    #[arg(short, long)]
    pub end: Option<String>,

    /// Clip or still image placed before the trimmed segment
    #[arg(long)]
    pub intro: Option<PathBuf>,

    /// Clip or still image placed after the trimmed segment
    #[arg(long)]
    pub outro: Option<PathBuf>,

    /// Image overlaid on a watermarked copy of the output
    #[arg(short, long)]
    pub watermark: Option<PathBuf>,

    /// Text appended to the output file stem
    #[arg(long)]
    pub suffix: Option<String>,

    /// Second source that gets the same trim, intro and outro
    #[arg(long)]
    pub secondary: Option<PathBuf>,

    /// Also watermark the second source
    #[arg(long, requires = "secondary")]
    pub watermark_secondary: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Validated request for the orchestrator
    pub fn to_request(&self) -> Result<RunRequest, DomainError> {
        let trim = TrimRange::new(self.start.clone(), self.end.clone())?;
        let mut request = RunRequest::new(&self.input, trim);
        request.intro = self.intro.clone();
        request.outro = self.outro.clone();
        request.watermark = self.watermark.clone();
        request.suffix = self.suffix.clone().filter(|s| !s.trim().is_empty());
        request.secondary = self.secondary.clone().map(|path| SecondaryInput {
            path,
            watermark: self.watermark_secondary,
        });
        Ok(request)
    }
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media file to inspect
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
