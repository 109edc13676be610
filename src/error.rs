//! Error types for tunebox.
//!
//! Every error here is local and recoverable. The view layer decides how to
//! surface it; nothing in the library treats one as fatal.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The name is blank or another playlist already uses it.
    #[error("Playlist name '{0}' is blank or already exists")]
    DuplicateName(String),

    #[error("Playlist '{0}' not found")]
    NotFound(String),

    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Reserved for callers. The core treats navigating or playing an empty
    /// playlist as a no-op rather than an error.
    #[error("Playlist has no tracks")]
    EmptyPlaylist,

    #[error("No active playlist")]
    NoActivePlaylist,

    /// The host declined to start playback (autoplay policy, nothing decoded, ...).
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Volume {0} outside 0.0..=1.0")]
    InvalidVolume(f32),

    #[error("Playback rate {0} must be positive")]
    InvalidRate(f32),

    #[error("Seek fraction {0} outside 0.0..=1.0")]
    InvalidFraction(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Persistence error: {0}")]
    Persist(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
