//! Subwoofer equalizer: four low bands driven by a single gain

use super::{linear_to_db, EqBand, Equalizer, EqualizerProfile, GraphicEqualizer};
use crate::error::Result;
use crate::format::PcmFormat;

/// Bands moved together by the subwoofer control (Hz)
pub const SUBWOOFER_FREQUENCIES: [f32; 4] = [20.0, 30.0, 40.0, 50.0];

/// Low-end boost/cut with one knob
#[derive(Debug)]
pub struct SubwooferEqualizer {
    inner: GraphicEqualizer,
    gain_db: f32,
}

impl SubwooferEqualizer {
    /// Flat subwoofer equalizer
    pub fn new(format: PcmFormat) -> Result<Self> {
        let bands: Vec<EqBand> = SUBWOOFER_FREQUENCIES
            .iter()
            .map(|&f| EqBand::new(f, 0.0))
            .collect();
        Ok(Self {
            inner: GraphicEqualizer::new(format, &bands)?.with_name("Subwoofer"),
            gain_db: 0.0,
        })
    }

    /// Shared gain (dB)
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Set the shared gain (dB) on all four bands
    pub fn set_gain_db(&mut self, gain_db: f32) -> Result<()> {
        for frequency in SUBWOOFER_FREQUENCIES {
            self.inner.set_gain(frequency, gain_db)?;
        }
        self.gain_db = gain_db;
        Ok(())
    }

    /// Set the shared gain as a linear factor (1.0 = flat)
    ///
    /// Zero or negative factors map to the maximum cut.
    pub fn set_volume(&mut self, factor: f32) -> Result<()> {
        self.set_gain_db(linear_to_db(factor))
    }

    /// Shared gain as a linear factor
    pub fn volume(&self) -> f32 {
        10.0_f32.powf(self.gain_db / 20.0)
    }
}

impl Equalizer for SubwooferEqualizer {
    fn process(&mut self, buffer: &mut [f32]) {
        self.inner.process(buffer);
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn profile(&self) -> EqualizerProfile {
        self.inner.profile()
    }
}

#[cfg(all(test, feature = "equalizer"))]
mod tests {
    use super::*;

    #[test]
    fn test_volume_moves_all_bands() {
        let mut sub = SubwooferEqualizer::new(PcmFormat::STEREO_48K).unwrap();
        sub.set_volume(2.0).unwrap();

        let profile = sub.profile();
        assert_eq!(profile.name, "Subwoofer");
        assert_eq!(profile.bands.len(), 4);
        for band in profile.bands {
            assert!((band.gain_db - 6.0206).abs() < 0.001);
        }
        assert!((sub.volume() - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_out_of_range_gain_rejected() {
        let mut sub = SubwooferEqualizer::new(PcmFormat::STEREO_48K).unwrap();
        assert!(sub.set_gain_db(40.0).is_err());
        assert_eq!(sub.gain_db(), 0.0);
    }
}
