use std::sync::Arc;

use crate::adapters::{AppConfig, FfmpegAdapter, FfprobeAdapter, FsLocalAdapter};
use crate::app::encode_interactor::EncodeInteractor;
use crate::engine::command::CommandBuilder;
use crate::engine::progress::{ConsoleProgress, NoopProgress, ProgressCallback};
use crate::ports::{ExecutePort, FsPort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn encode_interactor(&self) -> Arc<EncodeInteractor>;
    fn probe_port(&self) -> Arc<dyn ProbePort>;
}

pub struct DefaultAppContainer {
    encode_interactor: Arc<EncodeInteractor>,
    probe_port: Arc<dyn ProbePort>,
}

impl DefaultAppContainer {
    /// Wire the real adapters from configuration; `quiet` disables the progress bar
    pub fn new(config: &AppConfig, quiet: bool) -> Self {
        let probe_port: Arc<dyn ProbePort> = Arc::new(FfprobeAdapter::new(&config.ffprobe_path));
        let execute_port: Arc<dyn ExecutePort> = Arc::new(FfmpegAdapter::new());
        let fs_port: Arc<dyn FsPort> = Arc::new(FsLocalAdapter::new());
        let progress: Arc<dyn ProgressCallback> = if quiet {
            Arc::new(NoopProgress)
        } else {
            Arc::new(ConsoleProgress::new())
        };

        let encode_interactor = Arc::new(EncodeInteractor::new(
            Arc::clone(&probe_port),
            execute_port,
            fs_port,
            progress,
            CommandBuilder::new(config.encoder_settings()),
            config.workspace(),
        ));

        Self {
            encode_interactor,
            probe_port,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn encode_interactor(&self) -> Arc<EncodeInteractor> {
        Arc::clone(&self.encode_interactor)
    }

    fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }
}
