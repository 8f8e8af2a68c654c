//! Error types for the player core and its audio backends.

use crate::model::Track;
use thiserror::Error;

/// Failures reported by an [`AudioBackend`](crate::backend::AudioBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The audio session or output device could not be opened.
    #[error("audio session error: {0}")]
    Session(String),

    /// A track could not be opened or decoded.
    #[error("load error: {0}")]
    Load(String),

    /// A control call on a loaded track failed.
    #[error("playback error: {0}")]
    Playback(String),
}

impl BackendError {
    pub fn reason(&self) -> &str {
        match self {
            Self::Session(reason) | Self::Load(reason) | Self::Playback(reason) => reason,
        }
    }
}

/// Errors retained by the player and reported through its status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("failed to open audio session: {0}")]
    SessionInit(String),

    #[error("failed to load {track}: {reason}")]
    Load { track: Track, reason: String },

    #[error("backend playback error: {0}")]
    Playback(String),

    /// The transport loop is no longer running.
    #[error("player is shut down")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, PlayerError>;
