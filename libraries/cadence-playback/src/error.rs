//! Error types for playback

use cadence_audio::{AudioError, FaultKind, PcmFormat};
use std::time::Duration;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Seek not supported by the source, or target outside the track
    #[error("Illegal seek: {0}")]
    IllegalSeek(String),

    /// Malformed or corrupt audio data
    #[error("Source decode error: {0}")]
    SourceDecodeError(String),

    /// Reset attempted on an exhausted one-shot source
    #[error("Source is not reusable")]
    SourceNotReusable,

    /// Too many consecutive encode failures, or a fatal one
    #[error("Encoder fault ({kind:?}) after {consecutive} consecutive failures: {message}")]
    EncoderFault {
        kind: FaultKind,
        consecutive: u32,
        message: String,
    },

    /// Navigation past the playlist bounds
    #[error("No more tracks")]
    NoMoreTracks,

    /// Command requires an active (playing or paused) engine
    #[error("Not playing")]
    NotPlaying,

    /// Command requires a stopped or idle engine
    #[error("Already playing")]
    AlreadyPlaying,

    /// Engine disconnected or transport unavailable
    #[error("Not connected")]
    NotConnected,

    /// Track or index not in the playlist
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Source produces PCM in another layout than the engine
    #[error("Format mismatch: engine expects {expected}, source produces {found}")]
    FormatMismatch { expected: PcmFormat, found: PcmFormat },

    /// Pre-encoded packets do not cover exactly one engine frame
    #[error("Packet duration mismatch: engine expects {expected:?}, source has {found:?}")]
    PacketDurationMismatch {
        expected: Duration,
        found: Option<Duration>,
    },

    /// A lifecycle hook returned an error or panicked
    #[error("Hook `{hook}` failed: {message}")]
    Hook { hook: &'static str, message: String },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Equalizer, volume, or encoder construction error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    pub(crate) fn seek_out_of_range(target: Duration, length: Duration) -> Self {
        Self::IllegalSeek(format!(
            "{:.3}s outside [0, {:.3}s]",
            target.as_secs_f64(),
            length.as_secs_f64()
        ))
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
