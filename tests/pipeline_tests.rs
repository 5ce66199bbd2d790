use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use chopper_cli::adapters::{FixedRequests, FsLocalAdapter};
use chopper_cli::app::{EncodeInteractor, Workspace};
use chopper_cli::domain::model::*;
use chopper_cli::domain::rules::NamingRules;
use chopper_cli::engine::command::{CommandBuilder, CommandLine, EncoderSettings};
use chopper_cli::engine::progress::{NoopProgress, ProgressCallback};
use chopper_cli::ports::{ExecutePort, ProbePort};
use chopper_cli::DomainError;

/// Scripted ports and fixtures
mod test_utils {
    use super::*;

    /// Probe answering from a fixed table; unknown paths fail
    #[derive(Default)]
    pub struct TableProbe {
        pub entries: HashMap<PathBuf, MediaMetadata>,
        pub probed: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ProbePort for TableProbe {
        async fn probe(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
            self.probed.lock().unwrap().push(path.to_path_buf());
            self.entries
                .get(path)
                .cloned()
                .ok_or_else(|| DomainError::Probe {
                    path: path.display().to_string(),
                    message: "not in table".to_string(),
                })
        }
    }

    pub struct RecordedCall {
        pub label: String,
        pub command: CommandLine,
        /// Manifest contents seen by a concat call
        pub manifest: Option<String>,
        pub expected_seconds: f64,
    }

    /// Records every command and creates its output file; fails on one label
    #[derive(Default)]
    pub struct RecordingExecutor {
        pub calls: Mutex<Vec<RecordedCall>>,
        pub fail_label: Option<&'static str>,
        /// The first call with this label writes a partial file and never returns
        pub stall_label: Mutex<Option<&'static str>>,
    }

    impl RecordingExecutor {
        pub fn failing_on(label: &'static str) -> Self {
            Self {
                fail_label: Some(label),
                ..Default::default()
            }
        }

        pub fn stalling_once_on(label: &'static str) -> Self {
            Self {
                stall_label: Mutex::new(Some(label)),
                ..Default::default()
            }
        }

        pub fn expected_for(&self, label: &str) -> Vec<f64> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.label == label)
                .map(|c| c.expected_seconds)
                .collect()
        }

        pub fn labels(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.label.clone())
                .collect()
        }

        pub fn manifest(&self) -> Option<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find_map(|c| c.manifest.clone())
        }
    }

    #[async_trait]
    impl ExecutePort for RecordingExecutor {
        async fn run(
            &self,
            command: &CommandLine,
            label: &str,
            expected_seconds: f64,
            _progress: &dyn ProgressCallback,
        ) -> Result<(), DomainError> {
            let manifest = if command.args.iter().any(|a| a == "concat") {
                let position = command.args.iter().position(|a| a == "-i").unwrap();
                fs::read_to_string(&command.args[position + 1]).ok()
            } else {
                None
            };
            self.calls.lock().unwrap().push(RecordedCall {
                label: label.to_string(),
                command: command.clone(),
                manifest,
                expected_seconds,
            });

            let stall = {
                let mut stall_label = self.stall_label.lock().unwrap();
                if *stall_label == Some(label) {
                    stall_label.take().is_some()
                } else {
                    false
                }
            };
            if stall {
                fs::write(command.args.last().unwrap(), b"partial").unwrap();
                std::future::pending::<()>().await;
            }

            if self.fail_label == Some(label) {
                return Err(DomainError::EncodeProcess {
                    command: command.render(),
                    status: "exit status: 1".to_string(),
                });
            }

            fs::write(command.args.last().unwrap(), b"encoded").unwrap();
            Ok(())
        }
    }

    pub fn primary_metadata() -> MediaMetadata {
        MediaMetadata {
            width: Some(1920),
            height: Some(1080),
            video_codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            frame_rate: "30/1".to_string(),
            audio_codec: "aac".to_string(),
            sample_rate: "48000".to_string(),
            duration_seconds: 125.0,
            container_format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        }
    }

    /// Same frame size as the primary, different codec, rate and audio
    pub fn hevc_primary_metadata() -> MediaMetadata {
        MediaMetadata {
            video_codec: "hevc".to_string(),
            frame_rate: "25/1".to_string(),
            sample_rate: "44100".to_string(),
            ..primary_metadata()
        }
    }

    pub fn side_metadata(seconds: f64) -> MediaMetadata {
        MediaMetadata {
            width: Some(1280),
            height: Some(720),
            video_codec: "hevc".to_string(),
            pixel_format: "yuv420p".to_string(),
            frame_rate: "25/1".to_string(),
            audio_codec: "mp3".to_string(),
            sample_rate: "44100".to_string(),
            duration_seconds: seconds,
            container_format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        }
    }

    pub struct Fixture {
        pub dir: TempDir,
        pub probe: Arc<TableProbe>,
        pub executor: Arc<RecordingExecutor>,
        pub interactor: EncodeInteractor,
    }

    impl Fixture {
        pub fn new(executor: RecordingExecutor) -> Self {
            let dir = TempDir::new().unwrap();
            let sources = dir.path().join("sources");
            fs::create_dir_all(&sources).unwrap();

            let mut probe = TableProbe::default();
            for (name, metadata) in [
                ("talk.mp4", primary_metadata()),
                ("alt.mp4", primary_metadata()),
                ("hevc.mp4", hevc_primary_metadata()),
                ("vertical/talk.mp4", primary_metadata()),
                ("intro.mov", side_metadata(4.0)),
                ("outro.mov", side_metadata(6.0)),
                ("alternate/intro.mov", side_metadata(2.0)),
            ] {
                let path = sources.join(name);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, b"source").unwrap();
                probe.entries.insert(path, metadata);
            }
            fs::write(sources.join("logo.png"), b"png").unwrap();

            let probe = Arc::new(probe);
            let executor = Arc::new(executor);
            let interactor = EncodeInteractor::new(
                probe.clone(),
                executor.clone(),
                Arc::new(FsLocalAdapter::new()),
                Arc::new(NoopProgress),
                CommandBuilder::new(EncoderSettings::default()),
                Workspace::new(dir.path().join("out"), ".encoding"),
            );

            Self {
                dir,
                probe,
                executor,
                interactor,
            }
        }

        pub fn source(&self, name: &str) -> PathBuf {
            self.dir.path().join("sources").join(name)
        }

        pub fn output(&self, name: &str) -> PathBuf {
            self.interactor.workspace().output_root.join(name)
        }

        pub fn working(&self, name: &str) -> PathBuf {
            self.interactor.workspace().working_dir.join(name)
        }

        /// Cache name of the intro at `name` normalized for `target`
        pub fn intro_cache(&self, name: &str, primary: &str, target: &MediaMetadata) -> String {
            let side = self.source(name);
            let fingerprint = CommandBuilder::new(EncoderSettings::default())
                .normalize_fingerprint(&side, target);
            NamingRules::side_clip_file_name(
                SideClip::Intro,
                &side,
                &self.source(primary),
                target,
                fingerprint,
            )
        }

        pub fn default_intro_cache(&self) -> String {
            self.intro_cache("intro.mov", "talk.mp4", &primary_metadata())
        }

        pub fn request(&self) -> RunRequest {
            RunRequest::new(self.source("talk.mp4"), TrimRange::full())
        }
    }
}

use test_utils::*;

#[tokio::test]
async fn test_plain_trim_without_side_clips() {
    let fixture = Fixture::new(RecordingExecutor::default());

    let report = fixture.interactor.execute(&fixture.request()).await.unwrap();

    assert_eq!(fixture.executor.labels(), vec!["plain-trim"]);
    let calls = fixture.executor.calls.lock().unwrap();
    let args = &calls[0].command.args;
    let ss = args.iter().position(|a| a == "-ss").unwrap();
    assert_eq!(&args[ss..ss + 4], ["-ss", "00:00:00", "-to", "00:02:06"]);
    assert_eq!(
        args.last().unwrap(),
        &fixture.working("talk.part.mp4").to_string_lossy().to_string()
    );

    assert_eq!(report.outputs, vec![fixture.output("talk.mp4")]);
    assert!(fixture.output("talk.mp4").exists());
    assert!(!fixture.working("talk.part.mp4").exists());
    assert!(!fixture.working("listfile.txt").exists());
    assert_eq!(report.jobs.len(), 1);
}

#[tokio::test]
async fn test_explicit_bounds_and_suffix() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.trim = TrimRange::new(Some("00:00:10".into()), Some("00:00:20".into())).unwrap();
    request.suffix = Some("_short".to_string());

    let report = fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(report.outputs, vec![fixture.output("talk_short.mp4")]);
    let calls = fixture.executor.calls.lock().unwrap();
    assert!(calls[0].command.render().contains("-ss 00:00:10 -to 00:00:20"));
}

#[tokio::test]
async fn test_uncached_intro_is_normalized_then_concatenated() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));

    let report = fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["normalize", "plain-trim", "concat"]
    );

    let cache = fixture.default_intro_cache();
    assert!(cache.starts_with("intro_intro_1920x1080_"));
    let manifest = fixture.executor.manifest().unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(&cache));
    assert!(lines[1].contains("talk_segment.mp4"));

    assert_eq!(report.outputs, vec![fixture.output("talk.mp4")]);
    assert!(fixture.working(&cache).exists());
    assert!(!fixture.working(&NamingRules::in_flight_file_name(&cache)).exists());
    assert!(!fixture.working("talk_segment.mp4").exists());
    assert!(!fixture.working("listfile.txt").exists());

    // normalized to the primary format, audio resampled to the primary rate
    let calls = fixture.executor.calls.lock().unwrap();
    let normalize = calls[0].command.render();
    assert!(normalize.contains("scale=1920:1080"));
    assert!(normalize.contains("-c:v libx264"));
    assert!(normalize.contains("-ar 48000"));
}

#[tokio::test]
async fn test_cached_intro_is_reused_without_probe_or_encode() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let cache = fixture.default_intro_cache();
    fs::create_dir_all(fixture.working("")).unwrap();
    fs::write(fixture.working(&cache), b"cached").unwrap();

    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));
    fixture.interactor.prepare().unwrap();
    fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(fixture.executor.labels(), vec!["plain-trim", "concat"]);
    let probed = fixture.probe.probed.lock().unwrap();
    assert!(!probed.contains(&fixture.source("intro.mov")));
    assert_eq!(fs::read(fixture.working(&cache)).unwrap(), b"cached");
}

#[tokio::test]
async fn test_intro_and_outro_bracket_the_segment() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));
    request.outro = Some(fixture.source("outro.mov"));

    fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["normalize", "normalize", "plain-trim", "concat"]
    );
    let manifest = fixture.executor.manifest().unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("intro_intro_"));
    assert!(lines[1].contains("talk_segment.mp4"));
    assert!(lines[2].contains("outro_outro_"));
}

#[tokio::test]
async fn test_failed_normalize_stops_the_run() {
    let fixture = Fixture::new(RecordingExecutor::failing_on("normalize"));
    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));

    let err = fixture.interactor.execute(&request).await.unwrap_err();

    match err {
        DomainError::EncodeProcess { command, .. } => assert!(command.contains("intro.mov")),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(fixture.executor.labels(), vec!["normalize"]);
    assert!(!fixture.output("talk.mp4").exists());
    let cache = fixture.default_intro_cache();
    assert!(!fixture.working(&cache).exists());
    assert!(!fixture.working(&NamingRules::in_flight_file_name(&cache)).exists());
}

#[tokio::test]
async fn test_failed_primary_trim_skips_concat() {
    let fixture = Fixture::new(RecordingExecutor::failing_on("plain-trim"));
    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));

    let err = fixture.interactor.execute(&request).await.unwrap_err();

    match err {
        DomainError::EncodeProcess { command, .. } => {
            assert!(command.contains("-ss 00:00:00 -to 00:02:06"));
            assert!(command.contains("talk_segment.mp4"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(fixture.executor.labels(), vec!["normalize", "plain-trim"]);
    assert!(!fixture.output("talk.mp4").exists());
    assert!(!fixture.working("listfile.txt").exists());
}

#[tokio::test]
async fn test_failed_concat_leaves_no_output() {
    let fixture = Fixture::new(RecordingExecutor::failing_on("concat"));
    let mut request = fixture.request();
    request.outro = Some(fixture.source("outro.mov"));

    let result = fixture.interactor.execute(&request).await;

    assert!(matches!(result, Err(DomainError::EncodeProcess { .. })));
    assert!(!fixture.output("talk.mp4").exists());
    assert!(!fixture.working("talk.part.mp4").exists());
    assert!(!fixture.working("talk_segment.mp4").exists());
    assert!(!fixture.working("listfile.txt").exists());
}

#[tokio::test]
async fn test_watermark_adds_second_output() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.watermark = Some(fixture.source("logo.png"));

    let report = fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["plain-trim", "watermark", "watermark"]
    );
    assert_eq!(
        report.outputs,
        vec![
            fixture.output("talk.mp4"),
            fixture.output("talk_watermarked.mp4")
        ]
    );
    assert!(fixture.output("talk_watermarked.mp4").exists());
    assert!(!fixture.working("watermark_scaled.png").exists());

    let calls = fixture.executor.calls.lock().unwrap();
    assert!(calls[1].command.render().contains("scale=1920:1080"));
    assert!(calls[2].command.render().contains("overlay=0:0"));
}

#[tokio::test]
async fn test_secondary_version_skips_watermark_unless_asked() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.watermark = Some(fixture.source("logo.png"));
    request.secondary = Some(SecondaryInput {
        path: fixture.source("alt.mp4"),
        watermark: false,
    });

    let report = fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["plain-trim", "watermark", "watermark", "plain-trim"]
    );
    assert_eq!(report.outputs.len(), 3);
    assert_eq!(report.outputs[2], fixture.output("alt.mp4"));
}

#[tokio::test]
async fn test_missing_input_is_rejected_before_encoding() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.outro = Some(fixture.source("nowhere.mov"));

    let result = fixture.interactor.execute(&request).await;

    assert!(matches!(result, Err(DomainError::InvalidPath(_))));
    assert!(fixture.executor.labels().is_empty());
}

#[tokio::test]
async fn test_prepare_clears_stale_artifacts_only() {
    let fixture = Fixture::new(RecordingExecutor::default());
    fs::create_dir_all(fixture.working("")).unwrap();
    for name in [
        "listfile.txt",
        "intro.mp4",
        "talk_segment.mp4",
        "talk.part.mp4",
        "intro_logo_1920x1080_0123456789ab.part.mp4",
        "intro_logo_1920x1080_0123456789ab.mp4",
    ] {
        fs::write(fixture.working(name), b"").unwrap();
    }

    fixture.interactor.prepare().unwrap();

    assert!(!fixture.working("listfile.txt").exists());
    assert!(!fixture.working("intro.mp4").exists());
    assert!(!fixture.working("talk_segment.mp4").exists());
    assert!(!fixture.working("talk.part.mp4").exists());
    assert!(!fixture
        .working("intro_logo_1920x1080_0123456789ab.part.mp4")
        .exists());
    assert!(fixture
        .working("intro_logo_1920x1080_0123456789ab.mp4")
        .exists());
}

#[tokio::test]
async fn test_session_continues_after_failed_run() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let broken = RunRequest::new(fixture.source("missing.mp4"), TrimRange::full());
    let mut source = FixedRequests::new(vec![broken, fixture.request()]);

    let summary = fixture.interactor.run_session(&mut source).await.unwrap();

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].is_input_error());
    assert!(fixture.output("talk.mp4").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_on_multi_thread_runtime() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut second = RunRequest::new(fixture.source("alt.mp4"), TrimRange::full());
    second.suffix = Some("_alt".to_string());
    let mut source = FixedRequests::new(vec![fixture.request(), second]);

    let summary = fixture.interactor.run_session(&mut source).await.unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert!(summary.failures.is_empty());
    assert!(fixture.output("talk.mp4").exists());
    assert!(fixture.output("alt_alt.mp4").exists());
}

#[tokio::test]
async fn test_failed_plain_trim_keeps_existing_output() {
    let fixture = Fixture::new(RecordingExecutor::failing_on("plain-trim"));
    fs::create_dir_all(fixture.output("")).unwrap();
    fs::write(fixture.output("talk.mp4"), b"original").unwrap();

    let result = fixture.interactor.execute(&fixture.request()).await;

    assert!(matches!(result, Err(DomainError::EncodeProcess { .. })));
    assert_eq!(fs::read(fixture.output("talk.mp4")).unwrap(), b"original");
    assert!(!fixture.working("talk.part.mp4").exists());
}

#[tokio::test]
async fn test_intro_cache_follows_primary_format() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut first = fixture.request();
    first.intro = Some(fixture.source("intro.mov"));
    fixture.interactor.execute(&first).await.unwrap();

    let mut second = RunRequest::new(fixture.source("hevc.mp4"), TrimRange::full());
    second.intro = Some(fixture.source("intro.mov"));
    fixture.interactor.execute(&second).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["normalize", "plain-trim", "concat", "normalize", "plain-trim", "concat"]
    );
    let h264_cache = fixture.default_intro_cache();
    let hevc_cache = fixture.intro_cache("intro.mov", "hevc.mp4", &hevc_primary_metadata());
    assert_ne!(h264_cache, hevc_cache);
    assert!(fixture.working(&h264_cache).exists());
    assert!(fixture.working(&hevc_cache).exists());

    let calls = fixture.executor.calls.lock().unwrap();
    let second_normalize = calls[3].command.render();
    assert!(second_normalize.contains("-c:v libx265"));
    assert!(second_normalize.contains("-ar 44100"));
}

#[tokio::test]
async fn test_same_named_intros_in_different_folders_get_separate_caches() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut first = fixture.request();
    first.intro = Some(fixture.source("intro.mov"));
    fixture.interactor.execute(&first).await.unwrap();

    let mut second = fixture.request();
    second.intro = Some(fixture.source("alternate/intro.mov"));
    fixture.interactor.execute(&second).await.unwrap();

    assert_eq!(
        fixture
            .executor
            .labels()
            .iter()
            .filter(|l| *l == "normalize")
            .count(),
        2
    );
    let alternate = fixture.intro_cache("alternate/intro.mov", "talk.mp4", &primary_metadata());
    assert_ne!(alternate, fixture.default_intro_cache());
    assert!(fixture.executor.manifest().unwrap().contains(&fixture.default_intro_cache()));
    let calls = fixture.executor.calls.lock().unwrap();
    assert!(calls[5].manifest.as_ref().unwrap().contains(&alternate));
}

#[tokio::test]
async fn test_interrupted_normalize_leaves_no_cache() {
    let fixture = Fixture::new(RecordingExecutor::stalling_once_on("normalize"));
    let mut request = fixture.request();
    request.intro = Some(fixture.source("intro.mov"));
    let cache = fixture.default_intro_cache();
    let partial = fixture.working(&NamingRules::in_flight_file_name(&cache));

    let interrupted =
        tokio::time::timeout(Duration::from_millis(100), fixture.interactor.execute(&request)).await;

    assert!(interrupted.is_err());
    assert!(!fixture.working(&cache).exists());
    assert_eq!(fs::read(&partial).unwrap(), b"partial");

    fixture.interactor.prepare().unwrap();
    assert!(!partial.exists());

    fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        fixture.executor.labels(),
        vec!["normalize", "normalize", "plain-trim", "concat"]
    );
    assert_eq!(fs::read(fixture.working(&cache)).unwrap(), b"encoded");
}

#[tokio::test]
async fn test_secondary_sharing_primary_name_gets_numbered_output() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.watermark = Some(fixture.source("logo.png"));
    request.secondary = Some(SecondaryInput {
        path: fixture.source("vertical/talk.mp4"),
        watermark: true,
    });

    let report = fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(
        report.outputs,
        vec![
            fixture.output("talk.mp4"),
            fixture.output("talk_watermarked.mp4"),
            fixture.output("talk_2.mp4"),
            fixture.output("talk_2_watermarked.mp4"),
        ]
    );
    for output in &report.outputs {
        assert!(output.exists());
    }
}

#[tokio::test]
async fn test_watermark_progress_follows_trimmed_length() {
    let fixture = Fixture::new(RecordingExecutor::default());
    let mut request = fixture.request();
    request.trim = TrimRange::new(Some("00:00:10".into()), Some("00:00:20".into())).unwrap();
    request.watermark = Some(fixture.source("logo.png"));
    fixture.interactor.execute(&request).await.unwrap();

    assert_eq!(fixture.executor.expected_for("watermark"), vec![10.0, 10.0]);

    let with_intro = Fixture::new(RecordingExecutor::default());
    let mut request = with_intro.request();
    request.trim = TrimRange::new(Some("00:00:10".into()), Some("00:00:20".into())).unwrap();
    request.intro = Some(with_intro.source("intro.mov"));
    request.watermark = Some(with_intro.source("logo.png"));
    with_intro.interactor.execute(&request).await.unwrap();

    assert_eq!(with_intro.executor.expected_for("watermark"), vec![14.0, 14.0]);
}
