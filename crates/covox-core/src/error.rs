//! Error types for the Covox player.

use thiserror::Error;

/// Result type alias using the Covox player's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Covox player.
#[derive(Error, Debug)]
pub enum Error {
    // Decode errors (fixed kinds reported by the decoding collaborator)
    #[error("Unrecognised audio format: {0}")]
    UnrecognisedFormat(String),

    #[error("Malformed audio file: {0}")]
    MalformedFile(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("No audio track found: {0}")]
    NoAudioTrack(String),

    // Transcode errors (ffmpeg collaborator)
    #[error("Transcode failed: {0}")]
    Transcode(String),

    // Device errors
    #[error("Invalid port address: {0}")]
    InvalidPortAddress(String),

    #[error("Cannot access port: {0}")]
    PortAccess(String),

    #[error("Port write failed: {0}")]
    PortWrite(String),

    // Playback errors
    #[error("Playback error: {0}")]
    Playback(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error occurred before any playback could start.
    pub const fn is_setup(&self) -> bool {
        matches!(self, Self::InvalidPortAddress(_) | Self::PortAccess(_))
    }

    /// Returns true if this error came from opening or decoding the input.
    pub const fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::UnrecognisedFormat(_)
                | Self::MalformedFile(_)
                | Self::UnsupportedEncoding(_)
                | Self::NoAudioTrack(_)
                | Self::Transcode(_)
                | Self::Io(_)
        )
    }
}
