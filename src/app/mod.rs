// App layer - Use case orchestration

pub mod container;
pub mod encode_interactor;

pub use container::{AppContainer, DefaultAppContainer};
pub use encode_interactor::{EncodeInteractor, NormalizedClip, SessionSummary, Workspace};
