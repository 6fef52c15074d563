//! Engine and configuration errors
//!
//! Component-level errors live next to their components:
//! [`FrameBufferError`](crate::renderer::FrameBufferError),
//! [`CameraError`](crate::renderer::CameraError) and
//! [`SpriteError`](crate::renderer::SpriteError).

use thiserror::Error;

/// Errors from loading, saving or validating an [`EngineConfig`](crate::core::EngineConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// RON parse or write failure
    #[error("invalid RON config: {0}")]
    Ron(String),
    /// JSON parse or write failure
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// FPS limit outside 1..=1000
    #[error("fps limit {0} is outside 1..=1000")]
    InvalidFpsLimit(u32),
    /// Fixed step of zero
    #[error("fixed delta must be at least 1 ms")]
    InvalidFixedDelta,
    /// Zero-sized frame buffer
    #[error("invalid frame size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

impl From<ron::Error> for ConfigError {
    fn from(error: ron::Error) -> Self {
        Self::Ron(error.to_string())
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(error: ron::error::SpannedError) -> Self {
        Self::Ron(error.to_string())
    }
}

/// Errors from starting or running the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Another engine is running in this process
    #[error("an engine instance is already running")]
    AlreadyRunning,
    /// [`Engine::load`](crate::core::Engine::load) was called twice
    #[error("engine content is already loaded")]
    AlreadyLoaded,
    /// The configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The async runtime could not be built
    #[error("failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),
    /// The host's event pump failed
    #[error("host error: {0}")]
    Host(String),
}
