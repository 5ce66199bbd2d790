//! Encoder command construction and progress tracking

pub mod command;
pub mod progress;

pub use command::{CommandBuilder, CommandLine, ConcatManifest, EncoderSettings, NormalizeBranch};
pub use progress::{
    parse_time_marker, ConsoleProgress, LineSplitter, NoopProgress, ProgressCallback,
    ProgressParser,
};
