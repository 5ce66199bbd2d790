// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_local;
pub mod probe_ffprobe;
pub mod prompt_console;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegAdapter;
pub use fs_local::{FsLocalAdapter, InstanceLock};
pub use probe_ffprobe::FfprobeAdapter;
pub use prompt_console::{ConsolePrompter, FixedRequests};
pub use toml_config::AppConfig;
pub use tracing_log::init_logging;
