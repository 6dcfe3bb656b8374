//! Cadence Audio
//!
//! Signal-level building blocks for the Cadence playback engine:
//! - PCM format description and s16le sample conversion
//! - Graphic equalizer (biquad filter bank) and presets
//! - Linear volume stage with saturating output
//! - Transport encoders resolved once from a backend registry
//!
//! Nothing in this crate spawns threads; the engine in `cadence-playback`
//! drives these stages from its real-time loop.

pub mod effects;
pub mod encoder;
pub mod error;
pub mod format;

pub use effects::{
    EqBand, Equalizer, EqualizerPreset, EqualizerProfile, GraphicEqualizer, SubwooferEqualizer,
    Volume,
};
pub use encoder::{build_encoder, Encoder, EncoderBackend, EncoderSettings};
pub use error::{AudioError, FaultKind, Result};
pub use format::PcmFormat;
