// Encode interactor - Orchestrates one trim/concat/watermark run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{NamingRules, MANIFEST_NAME, SCALED_WATERMARK_NAME};
use crate::engine::command::{CommandBuilder, ConcatManifest};
use crate::engine::progress::ProgressCallback;
use crate::ports::*;
use crate::DIAGNOSTIC_TARGET;

/// Where a run writes its files
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    /// Finished outputs
    pub output_root: PathBuf,
    /// In-flight encodes, segments, manifests and cached side clips
    pub working_dir: PathBuf,
}

impl Workspace {
    pub fn new(output_root: impl Into<PathBuf>, working_dir_name: &str) -> Self {
        let output_root = output_root.into();
        let working_dir = output_root.join(working_dir_name);
        Self {
            output_root,
            working_dir,
        }
    }
}

/// Interactor for the encode pipeline
pub struct EncodeInteractor {
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    fs_port: Arc<dyn FsPort>,
    progress: Arc<dyn ProgressCallback>,
    builder: CommandBuilder,
    workspace: Workspace,
}

impl EncodeInteractor {
    /// Create new encode interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        fs_port: Arc<dyn FsPort>,
        progress: Arc<dyn ProgressCallback>,
        builder: CommandBuilder,
        workspace: Workspace,
    ) -> Self {
        Self {
            probe_port,
            execute_port,
            fs_port,
            progress,
            builder,
            workspace,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Session startup: create directories and clear stale artifacts
    pub fn prepare(&self) -> Result<(), DomainError> {
        self.ensure_directories()?;

        for file in self.fs_port.list_files(&self.workspace.working_dir)? {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if NamingRules::is_stale_artifact(&name) {
                debug!("Removing stale artifact {}", file.display());
                self.fs_port.remove_file(&file)?;
            }
        }

        Ok(())
    }

    /// Prompt loop: run every request the source yields.
    ///
    /// A failed run is logged and abandoned; the session carries on with the
    /// next request. Only a failing request source ends the session early.
    /// Waiting on the source blocks, so on a multi-threaded runtime it is moved
    /// off the async worker with `block_in_place`.
    pub async fn run_session(
        &self,
        source: &mut dyn RequestSource,
    ) -> Result<SessionSummary, DomainError> {
        self.prepare()?;
        let mut summary = SessionSummary::default();

        while let Some(request) = next_request_blocking(source)? {
            match self.execute(&request).await {
                Ok(report) => summary.reports.push(report),
                Err(e) if e.is_input_error() => {
                    warn!("{}", e);
                    summary.failures.push(e);
                }
                Err(e) => {
                    error!("Run abandoned: {}", e);
                    summary.failures.push(e);
                }
            }
        }

        Ok(summary)
    }

    /// Execute one run
    pub async fn execute(&self, request: &RunRequest) -> Result<RunReport, DomainError> {
        self.ensure_directories()?;

        for path in request.paths() {
            if !self.fs_port.exists(path) {
                return Err(DomainError::InvalidPath(path.display().to_string()));
            }
        }

        let mut report = RunReport::new();
        info!("Processing {}", request.primary.display());
        self.process_clip(&request.primary, request, request.watermark.as_deref(), &mut report)
            .await?;

        if let Some(secondary) = &request.secondary {
            info!("Processing additional version {}", secondary.path.display());
            let watermark = request.watermark.as_deref().filter(|_| secondary.watermark);
            self.process_clip(&secondary.path, request, watermark, &mut report)
                .await?;
        }

        info!("Run finished with {} output(s)", report.outputs.len());
        Ok(report)
    }

    /// Side material, primary encode and watermark pass for one source file
    async fn process_clip(
        &self,
        source: &Path,
        request: &RunRequest,
        watermark: Option<&Path>,
        report: &mut RunReport,
    ) -> Result<(), DomainError> {
        let metadata = self.probe_port.probe(source).await?;
        debug!(
            "Probed {}: {:?}x{:?} {} {} fps, audio '{}', {:.2}s",
            source.display(),
            metadata.width,
            metadata.height,
            metadata.video_codec,
            metadata.frame_rate,
            metadata.audio_codec,
            metadata.duration_seconds
        );

        let mut intro = None;
        if let Some(path) = &request.intro {
            intro = Some(
                self.normalize_side_clip(SideClip::Intro, path, source, &metadata, report)
                    .await?,
            );
        }
        let mut outro = None;
        if let Some(path) = &request.outro {
            outro = Some(
                self.normalize_side_clip(SideClip::Outro, path, source, &metadata, report)
                    .await?,
            );
        }

        let output_name = self.unclaimed_output_name(source, request.suffix.as_deref(), report);
        let trim = request.trim.resolve(metadata.duration_seconds);
        let (final_output, seconds) = self
            .encode_primary(source, &output_name, trim, &metadata, intro, outro, report)
            .await?;
        report.outputs.push(final_output.clone());

        if let Some(watermark) = watermark {
            let marked = self
                .apply_watermark(&final_output, &output_name, watermark, &metadata, seconds, report)
                .await?;
            report.outputs.push(marked);
        }

        Ok(())
    }

    /// Output name not yet written by this run; a second file sharing the
    /// primary's name gets `_2`, `_3` and so on
    fn unclaimed_output_name(
        &self,
        source: &Path,
        suffix: Option<&str>,
        report: &RunReport,
    ) -> String {
        let base = NamingRules::output_file_name(source, suffix);
        let claimed = |name: &str| {
            report
                .outputs
                .contains(&self.workspace.output_root.join(name))
        };
        if !claimed(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = NamingRules::numbered_file_name(&base, n);
            if !claimed(&candidate) {
                warn!(
                    "{} already written by this run, using {}",
                    base, candidate
                );
                return candidate;
            }
            n += 1;
        }
    }

    /// Re-encode an intro or outro to the primary clip's format.
    ///
    /// An existing normalized file is reused without probing or encoding. The
    /// encode lands under a `.part` name and only a finished file takes the
    /// cache name.
    pub async fn normalize_side_clip(
        &self,
        kind: SideClip,
        side_source: &Path,
        primary_source: &Path,
        target: &MediaMetadata,
        report: &mut RunReport,
    ) -> Result<NormalizedClip, DomainError> {
        let fingerprint = self.builder.normalize_fingerprint(side_source, target);
        let name =
            NamingRules::side_clip_file_name(kind, side_source, primary_source, target, fingerprint);
        let in_flight = self
            .workspace
            .working_dir
            .join(NamingRules::in_flight_file_name(&name));
        let destination = self.workspace.working_dir.join(name);

        if self.fs_port.exists(&destination) {
            info!(
                "Reusing normalized {} {}",
                kind.label(),
                destination.display()
            );
            return Ok(NormalizedClip {
                path: destination,
                seconds: None,
            });
        }

        let source_metadata = self.probe_port.probe(side_source).await?;
        let seconds = self.builder.normalized_duration(&source_metadata);
        let job = EncodeJob::normalize(
            side_source.to_path_buf(),
            in_flight.clone(),
            source_metadata,
            target.clone(),
            seconds,
        );

        info!("Normalizing {} {}", kind.label(), side_source.display());
        self.run_job(&job, report).await?;
        self.fs_port.rename(&in_flight, &destination)?;

        Ok(NormalizedClip {
            path: destination,
            seconds: Some(seconds),
        })
    }

    /// Trim, concatenating side clips when present; returns the published
    /// output and its expected length
    #[allow(clippy::too_many_arguments)]
    async fn encode_primary(
        &self,
        source: &Path,
        output_name: &str,
        trim: ResolvedTrim,
        metadata: &MediaMetadata,
        intro: Option<NormalizedClip>,
        outro: Option<NormalizedClip>,
        report: &mut RunReport,
    ) -> Result<(PathBuf, f64), DomainError> {
        let in_flight = self
            .workspace
            .working_dir
            .join(NamingRules::in_flight_file_name(output_name));
        let final_output = self.workspace.output_root.join(output_name);

        if intro.is_none() && outro.is_none() {
            let job = EncodeJob::plain_trim(source.to_path_buf(), in_flight.clone(), trim, metadata.clone());
            self.run_job(&job, report).await?;
            let published = self.publish(&in_flight, &final_output)?;
            return Ok((published, job.expected_seconds));
        }

        let segment = self
            .workspace
            .working_dir
            .join(NamingRules::segment_file_name(source));
        let manifest = self.workspace.working_dir.join(MANIFEST_NAME);

        let trim_job = EncodeJob::plain_trim(source.to_path_buf(), segment.clone(), trim, metadata.clone());
        let mut expected = trim_job.expected_seconds;
        if let Err(e) = self.run_job(&trim_job, report).await {
            self.discard(&[segment.as_path()]);
            return Err(e);
        }

        let mut segments = Vec::with_capacity(3);
        if let Some(intro) = &intro {
            segments.push(intro.path.clone());
            expected += intro.seconds.unwrap_or(0.0);
        }
        segments.push(segment.clone());
        if let Some(outro) = &outro {
            segments.push(outro.path.clone());
            expected += outro.seconds.unwrap_or(0.0);
        }

        let listing = ConcatManifest::render(&segments);
        debug!(target: DIAGNOSTIC_TARGET, "concat manifest {}:\n{}", manifest.display(), listing);
        self.fs_port.write_string(&manifest, &listing)?;

        let concat_job = EncodeJob::concat(manifest.clone(), in_flight.clone(), metadata.clone(), expected);
        let concatenated = self.run_job(&concat_job, report).await;
        self.discard(&[segment.as_path(), manifest.as_path()]);
        concatenated?;

        let published = self.publish(&in_flight, &final_output)?;
        Ok((published, expected))
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_watermark(
        &self,
        output: &Path,
        output_name: &str,
        watermark: &Path,
        metadata: &MediaMetadata,
        seconds: f64,
        report: &mut RunReport,
    ) -> Result<PathBuf, DomainError> {
        let marked_name = NamingRules::watermarked_file_name(output_name);
        let in_flight = self
            .workspace
            .working_dir
            .join(NamingRules::in_flight_file_name(&marked_name));
        let scaled = self.workspace.working_dir.join(SCALED_WATERMARK_NAME);

        let job = EncodeJob::watermark(
            output.to_path_buf(),
            in_flight.clone(),
            watermark.to_path_buf(),
            scaled.clone(),
            metadata.clone(),
            seconds,
        );

        info!("Applying watermark {}", watermark.display());
        let result = self.run_job(&job, report).await;
        self.discard(&[scaled.as_path()]);
        result?;

        self.publish(&in_flight, &self.workspace.output_root.join(marked_name))
    }

    /// Build and run every command of a job, stopping at the first failure
    async fn run_job(&self, job: &EncodeJob, report: &mut RunReport) -> Result<(), DomainError> {
        let commands = self.builder.build(job)?;

        for command in commands {
            let rendered = command.render();
            debug!(target: DIAGNOSTIC_TARGET, "subprocess call: {}", rendered);
            report.jobs.push(JobRecord {
                kind: job.operation.name().to_string(),
                command: rendered.clone(),
            });

            let result = self
                .execute_port
                .run(
                    &command,
                    job.operation.name(),
                    job.expected_seconds,
                    self.progress.as_ref(),
                )
                .await;

            if let Err(e) = result {
                error!("{} failed: {}", job.operation, e);
                error!(target: DIAGNOSTIC_TARGET, "failed command: {}", rendered);
                self.discard(&[job.output.as_path()]);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Move a finished file from the working directory into the output root
    fn publish(&self, in_flight: &Path, destination: &Path) -> Result<PathBuf, DomainError> {
        if self.fs_port.exists(destination) {
            warn!("Overwriting existing {}", destination.display());
        }
        self.fs_port.rename(in_flight, destination)?;
        info!("Wrote {}", destination.display());
        Ok(destination.to_path_buf())
    }

    fn ensure_directories(&self) -> Result<(), DomainError> {
        self.fs_port.create_dir_all(&self.workspace.output_root)?;
        self.fs_port.create_dir_all(&self.workspace.working_dir)
    }

    /// Best-effort removal of temporary files
    fn discard(&self, paths: &[&Path]) {
        for path in paths {
            if let Err(e) = self.fs_port.remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Blocking wait for the next request, kept off the async workers when the
/// runtime has more than one
fn next_request_blocking(
    source: &mut dyn RequestSource,
) -> Result<Option<RunRequest>, DomainError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| source.next_request())
        }
        _ => source.next_request(),
    }
}

/// Everything a session produced
#[derive(Debug, Default)]
pub struct SessionSummary {
    pub reports: Vec<RunReport>,
    pub failures: Vec<DomainError>,
}

/// A side clip ready for concatenation
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedClip {
    pub path: PathBuf,
    /// Known only when it was encoded during this session
    pub seconds: Option<f64>,
}
