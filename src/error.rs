//! Error types for the `paste_guard` crate.
//!
//! Sanitizers and the tree walker never fail: they answer `""` or `None`.
//! Errors only come from configuration and from the async service.

/// All errors that can occur while configuring or driving the engine.
#[derive(Debug, thiserror::Error)]
pub enum PasteGuardError {
    /// The internal channel to the background worker is closed or full.
    #[error("Channel closed or full")]
    ChannelClosed,

    /// The worker dropped a job without answering it.
    #[error("Worker stopped before answering")]
    WorkerStopped,

    /// A widget schema registry could not be loaded.
    #[error("Schema error: {0}")]
    Schema(#[from] serde_json::Error),

    /// The builder configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

/// A type alias for `Result<T, PasteGuardError>`.
pub type Result<T> = std::result::Result<T, PasteGuardError>;
