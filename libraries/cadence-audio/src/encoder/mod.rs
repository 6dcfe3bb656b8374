//! Transport encoders
//!
//! An [`Encoder`] turns one fixed-duration PCM frame into one transport
//! payload. Backends are chosen by [`EncoderBackend`] and resolved once via
//! [`build_encoder`]; a backend not compiled into this build is a hard
//! [`AudioError::EncoderUnavailable`], never a silent fallback.

mod pcm;

#[cfg(feature = "opus")]
mod opus;

pub use pcm::PcmEncoder;

#[cfg(feature = "opus")]
pub use opus::{OpusEncoder, OPUS_SILENCE_FRAME};

use crate::error::{AudioError, Result};
use crate::format::PcmFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// PCM frame to transport payload
pub trait Encoder: Send {
    /// Backend this encoder was built from
    fn backend(&self) -> EncoderBackend;

    /// Encode one interleaved frame into `out` (cleared first)
    ///
    /// Per-frame failures carry [`FaultKind::Transient`](crate::FaultKind)
    /// so the caller can skip the frame and keep count.
    fn encode(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> Result<()>;

    /// Payload that decodes to one frame of silence
    fn silence_frame(&self) -> Vec<u8>;

    /// Drop codec state carried between frames
    fn reset(&mut self) {}
}

/// Available encoder implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderBackend {
    /// Raw s16le passthrough, pure software
    #[default]
    Pcm,
    /// libopus through `audiopus` (feature `opus`)
    Opus,
}

impl EncoderBackend {
    /// Every backend, compiled in or not
    pub const ALL: [Self; 2] = [Self::Pcm, Self::Opus];

    /// Whether this build can construct the backend
    pub fn is_available(self) -> bool {
        match self {
            Self::Pcm => true,
            Self::Opus => cfg!(feature = "opus"),
        }
    }

    /// Backends this build can construct
    pub fn available() -> Vec<Self> {
        Self::ALL.into_iter().filter(|b| b.is_available()).collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pcm => "pcm",
            Self::Opus => "opus",
        }
    }
}

impl std::fmt::Display for EncoderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters shared by all backends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderSettings {
    pub format: PcmFormat,
    pub frame_duration: Duration,
    /// Target bitrate in bits per second (ignored by `pcm`)
    pub bitrate: u32,
}

impl EncoderSettings {
    pub fn new(format: PcmFormat, frame_duration: Duration) -> Self {
        Self {
            format,
            frame_duration,
            bitrate: 128_000,
        }
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Interleaved samples the encoder expects per call
    pub fn frame_len(&self) -> usize {
        self.format.frame_len(self.frame_duration)
    }
}

/// Resolve a backend into a ready encoder
pub fn build_encoder(
    backend: EncoderBackend,
    settings: &EncoderSettings,
) -> Result<Box<dyn Encoder>> {
    if !backend.is_available() {
        return Err(AudioError::EncoderUnavailable(backend));
    }
    settings.format.validate()?;

    debug!(%backend, format = %settings.format, "building encoder");

    match backend {
        EncoderBackend::Pcm => Ok(Box::new(PcmEncoder::new(settings))),
        #[cfg(feature = "opus")]
        EncoderBackend::Opus => Ok(Box::new(OpusEncoder::new(settings)?)),
        #[cfg(not(feature = "opus"))]
        EncoderBackend::Opus => Err(AudioError::EncoderUnavailable(backend)),
    }
}
