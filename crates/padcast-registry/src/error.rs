use thiserror::Error;

use crate::frame::FrameError;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The source pump thread could not be started.
    #[error("failed to spawn source thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
    /// The source pump is no longer accepting events.
    #[error("source channel closed")]
    SourceClosed,
    /// The source pump thread panicked before it was shut down.
    #[error("source thread panicked")]
    PumpPanicked,
    #[error("frame decode error: {0}")]
    Frame(#[from] FrameError),
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// Convenient result alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;
