//! Equalizer and gain stages
//!
//! Every stage works on interleaved, normalized f32 samples in place.
//! The engine chains them in a fixed order per frame: track equalizer,
//! track volume, global equalizer, global volume.

mod graphic_eq;
mod subwoofer;
mod volume;

pub use graphic_eq::{
    EqualizerPreset, GraphicEqualizer, DEFAULT_Q, ISO_10_BAND_FREQUENCIES, MAX_BAND_GAIN_DB,
};
pub use subwoofer::{SubwooferEqualizer, SUBWOOFER_FREQUENCIES};
pub use volume::{apply_gain, Volume, MAX_VOLUME};

use serde::{Deserialize, Serialize};

/// Pluggable band-gain transformer
///
/// Implementations may keep filter history between calls; that history
/// belongs to one continuous stream and must be cleared with [`reset`]
/// whenever the stream jumps (seek, source reset, track change).
///
/// [`reset`]: Equalizer::reset
pub trait Equalizer: Send {
    /// Filter interleaved samples in place
    fn process(&mut self, buffer: &mut [f32]);

    /// Clear filter history
    fn reset(&mut self);

    /// Snapshot of the current band layout
    fn profile(&self) -> EqualizerProfile;
}

/// One peaking band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Center frequency (Hz)
    pub frequency: f32,
    /// Gain at the center frequency (dB)
    pub gain_db: f32,
}

impl EqBand {
    pub fn new(frequency: f32, gain_db: f32) -> Self {
        Self { frequency, gain_db }
    }

    /// Band whose gain is given as a linear amplitude factor
    pub fn from_linear(frequency: f32, factor: f32) -> Self {
        Self::new(frequency, linear_to_db(factor))
    }

    /// Gain as a linear amplitude factor
    pub fn linear_gain(&self) -> f32 {
        10.0_f32.powf(self.gain_db / 20.0)
    }
}

/// Read-only description of an equalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerProfile {
    pub name: String,
    pub bands: Vec<EqBand>,
}

/// Linear factor to dB, floored at the maximum band cut
pub(crate) fn linear_to_db(factor: f32) -> f32 {
    if factor <= 0.0 || !factor.is_finite() {
        return -MAX_BAND_GAIN_DB;
    }
    (20.0 * factor.log10()).clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_gain_round_trip() {
        let band = EqBand::from_linear(100.0, 2.0);
        assert!((band.gain_db - 6.0206).abs() < 0.001);
        assert!((band.linear_gain() - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_silent_factor_maps_to_max_cut() {
        assert_eq!(EqBand::from_linear(100.0, 0.0).gain_db, -MAX_BAND_GAIN_DB);
        assert_eq!(EqBand::from_linear(100.0, -1.0).gain_db, -MAX_BAND_GAIN_DB);
    }
}
