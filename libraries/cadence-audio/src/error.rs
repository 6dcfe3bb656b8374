//! Error types for signal processing and encoding

use crate::encoder::EncoderBackend;
use thiserror::Error;

/// Whether a fault may clear up on the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A single bad frame; the caller may skip it and carry on
    Transient,
    /// The encoder cannot produce any further output
    Fatal,
}

/// Audio processing errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// Equalizer constructed without its numeric backend compiled in
    #[error("Equalizer unavailable: built without the `equalizer` feature")]
    EqualizerUnavailable,

    /// Band parameters out of range
    #[error("Invalid equalizer band {frequency} Hz / {gain_db} dB: {reason}")]
    InvalidBand {
        frequency: f32,
        gain_db: f32,
        reason: &'static str,
    },

    /// A band already exists at this frequency
    #[error("Equalizer band already exists at {0} Hz")]
    DuplicateBand(f32),

    /// No band at this frequency
    #[error("No equalizer band at {0} Hz")]
    BandNotFound(f32),

    /// Volume must be finite and within [0, MAX_VOLUME]
    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),

    /// Requested encoder backend is not compiled in
    #[error("Encoder backend `{0}` unavailable")]
    EncoderUnavailable(EncoderBackend),

    /// Per-frame or construction-time encoder failure
    #[error("Encoder fault ({kind:?}): {message}")]
    Encode { kind: FaultKind, message: String },

    /// PCM layout the stage cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl AudioError {
    /// Shorthand for a transient encode failure
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Encode {
            kind: FaultKind::Transient,
            message: message.into(),
        }
    }

    /// Shorthand for a fatal encode failure
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Encode {
            kind: FaultKind::Fatal,
            message: message.into(),
        }
    }

    /// Fault class, if this is an encoder failure
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Encode { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;
