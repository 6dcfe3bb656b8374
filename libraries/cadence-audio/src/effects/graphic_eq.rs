//! Graphic Equalizer
//!
//! Peaking-filter bank with one biquad per band and channel:
//! - Arbitrary band layout, kept sorted by frequency
//! - Per-band gain control (-24 to +24 dB)
//! - 10-band ISO presets
//!
//! The filter math comes from the `biquad` crate, compiled in through the
//! `equalizer` feature. Without it every constructor fails with
//! [`AudioError::EqualizerUnavailable`].

use super::{EqBand, Equalizer, EqualizerProfile};
use crate::error::{AudioError, Result};
use crate::format::PcmFormat;

/// 10-band ISO standard frequencies (Hz)
pub const ISO_10_BAND_FREQUENCIES: [f32; 10] = [
    31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Largest boost or cut a band accepts (dB)
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Octave-wide Q used for every band
pub const DEFAULT_Q: f32 = 1.41;

/// Bands closer than this are the same band (Hz)
const FREQUENCY_EPSILON: f32 = 0.01;

/// Graphic EQ preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqualizerPreset {
    /// Flat - All bands at 0 dB
    #[default]
    Flat,

    /// Bass Boost - Enhanced low frequencies
    BassBoost,

    /// Treble Boost - Enhanced high frequencies
    TrebleBoost,

    /// V-Shape - Boosted lows and highs, reduced mids
    VShape,

    /// Vocal - Enhanced mid frequencies for voice
    Vocal,

    /// Rock - Classic rock music profile
    Rock,

    /// Electronic - Dance/Electronic music profile
    Electronic,

    /// Acoustic - Natural acoustic instrument profile
    Acoustic,
}

impl EqualizerPreset {
    /// Gains for the ISO 10-band layout (dB)
    pub fn gains(&self) -> [f32; 10] {
        match self {
            Self::Flat => [0.0; 10],
            Self::BassBoost => [6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            Self::TrebleBoost => [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0],
            Self::VShape => [5.0, 4.0, 2.0, -1.0, -2.0, -2.0, -1.0, 2.0, 4.0, 5.0],
            Self::Vocal => [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -2.0],
            Self::Rock => [4.0, 3.0, 1.0, 0.0, -1.0, 0.0, 1.0, 3.0, 4.0, 4.0],
            Self::Electronic => [5.0, 4.0, 2.0, 0.0, 1.0, 2.0, 1.0, 3.0, 4.0, 4.0],
            Self::Acoustic => [2.0, 1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0, 1.0],
        }
    }

    /// Band layout for this preset
    pub fn bands(&self) -> Vec<EqBand> {
        ISO_10_BAND_FREQUENCIES
            .iter()
            .zip(self.gains())
            .map(|(&frequency, gain_db)| EqBand::new(frequency, gain_db))
            .collect()
    }

    /// Get preset name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::BassBoost => "Bass Boost",
            Self::TrebleBoost => "Treble Boost",
            Self::VShape => "V-Shape",
            Self::Vocal => "Vocal",
            Self::Rock => "Rock",
            Self::Electronic => "Electronic",
            Self::Acoustic => "Acoustic",
        }
    }
}

// ===== Filter Backend =====

#[cfg(feature = "equalizer")]
mod backend {
    use crate::error::{AudioError, Result};
    use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type};

    /// One peaking biquad for one channel
    pub(super) struct PeakingFilter(DirectForm1<f32>);

    pub(super) fn ensure_available() -> Result<()> {
        Ok(())
    }

    fn coefficients(
        sample_rate: u32,
        frequency: f32,
        gain_db: f32,
        q: f32,
    ) -> Result<Coefficients<f32>> {
        Coefficients::<f32>::from_params(
            Type::PeakingEQ(gain_db),
            (sample_rate as f32).hz(),
            frequency.hz(),
            q,
        )
        .map_err(|_| AudioError::InvalidBand {
            frequency,
            gain_db,
            reason: "rejected by filter design",
        })
    }

    impl PeakingFilter {
        pub(super) fn new(sample_rate: u32, frequency: f32, gain_db: f32, q: f32) -> Result<Self> {
            Ok(Self(DirectForm1::<f32>::new(coefficients(
                sample_rate,
                frequency,
                gain_db,
                q,
            )?)))
        }

        /// Swap coefficients, keeping history so gain changes do not click
        pub(super) fn retune(
            &mut self,
            sample_rate: u32,
            frequency: f32,
            gain_db: f32,
            q: f32,
        ) -> Result<()> {
            self.0
                .update_coefficients(coefficients(sample_rate, frequency, gain_db, q)?);
            Ok(())
        }

        #[inline]
        pub(super) fn run(&mut self, sample: f32) -> f32 {
            self.0.run(sample)
        }

        pub(super) fn reset(&mut self) {
            self.0.reset_state();
        }
    }
}

#[cfg(not(feature = "equalizer"))]
mod backend {
    use crate::error::{AudioError, Result};

    /// Never constructed without a numeric backend
    pub(super) enum PeakingFilter {}

    pub(super) fn ensure_available() -> Result<()> {
        Err(AudioError::EqualizerUnavailable)
    }

    impl PeakingFilter {
        pub(super) fn new(_: u32, _: f32, _: f32, _: f32) -> Result<Self> {
            Err(AudioError::EqualizerUnavailable)
        }

        pub(super) fn retune(&mut self, _: u32, _: f32, _: f32, _: f32) -> Result<()> {
            match *self {}
        }

        pub(super) fn run(&mut self, _: f32) -> f32 {
            match *self {}
        }

        pub(super) fn reset(&mut self) {
            match *self {}
        }
    }
}

use backend::PeakingFilter;

/// One band: its parameters plus a filter per channel
struct Band {
    params: EqBand,
    filters: Vec<PeakingFilter>,
}

impl Band {
    fn new(format: PcmFormat, params: EqBand) -> Result<Self> {
        let filters = (0..format.channels)
            .map(|_| {
                PeakingFilter::new(format.sample_rate, params.frequency, params.gain_db, DEFAULT_Q)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { params, filters })
    }
}

/// Multi-band peaking equalizer
pub struct GraphicEqualizer {
    format: PcmFormat,
    name: String,
    bands: Vec<Band>,
}

impl GraphicEqualizer {
    /// Build an equalizer for `format` with the given bands
    ///
    /// Fails immediately when the numeric backend is missing, even for an
    /// empty band list.
    pub fn new(format: PcmFormat, bands: &[EqBand]) -> Result<Self> {
        backend::ensure_available()?;
        format.validate()?;

        let mut eq = Self {
            format,
            name: "Graphic EQ".to_string(),
            bands: Vec::with_capacity(bands.len()),
        };
        for band in bands {
            eq.add_band(*band)?;
        }
        Ok(eq)
    }

    /// ISO 10-band layout loaded with a preset
    pub fn from_preset(format: PcmFormat, preset: EqualizerPreset) -> Result<Self> {
        Ok(Self::new(format, &preset.bands())?.with_name(preset.name()))
    }

    /// Rename (shown in profiles)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Current bands, ascending by frequency
    pub fn bands(&self) -> Vec<EqBand> {
        self.bands.iter().map(|b| b.params).collect()
    }

    /// Gain of the band at `frequency` (dB)
    pub fn gain(&self, frequency: f32) -> Option<f32> {
        self.find(frequency).map(|i| self.bands[i].params.gain_db)
    }

    /// Insert a band; its filter history starts empty
    pub fn add_band(&mut self, band: EqBand) -> Result<()> {
        self.check(band)?;
        if self.find(band.frequency).is_some() {
            return Err(AudioError::DuplicateBand(band.frequency));
        }

        let index = self
            .bands
            .partition_point(|b| b.params.frequency < band.frequency);
        self.bands.insert(index, Band::new(self.format, band)?);
        Ok(())
    }

    /// Remove the band at `frequency`
    pub fn remove_band(&mut self, frequency: f32) -> Result<EqBand> {
        let index = self
            .find(frequency)
            .ok_or(AudioError::BandNotFound(frequency))?;
        Ok(self.bands.remove(index).params)
    }

    /// Change the gain of an existing band
    pub fn set_gain(&mut self, frequency: f32, gain_db: f32) -> Result<()> {
        let index = self
            .find(frequency)
            .ok_or(AudioError::BandNotFound(frequency))?;
        let params = EqBand::new(self.bands[index].params.frequency, gain_db);
        self.check(params)?;

        let sample_rate = self.format.sample_rate;
        let band = &mut self.bands[index];
        for filter in &mut band.filters {
            filter.retune(sample_rate, params.frequency, gain_db, DEFAULT_Q)?;
        }
        band.params = params;
        Ok(())
    }

    /// Replace every band with a preset layout
    pub fn set_preset(&mut self, preset: EqualizerPreset) -> Result<()> {
        let bands = preset
            .bands()
            .into_iter()
            .map(|b| Band::new(self.format, b))
            .collect::<Result<Vec<_>>>()?;
        self.bands = bands;
        self.name = preset.name().to_string();
        Ok(())
    }

    fn find(&self, frequency: f32) -> Option<usize> {
        self.bands
            .iter()
            .position(|b| (b.params.frequency - frequency).abs() < FREQUENCY_EPSILON)
    }

    fn check(&self, band: EqBand) -> Result<()> {
        let invalid = |reason| AudioError::InvalidBand {
            frequency: band.frequency,
            gain_db: band.gain_db,
            reason,
        };

        if !band.frequency.is_finite() || !band.gain_db.is_finite() {
            return Err(invalid("not finite"));
        }
        if band.frequency <= 0.0 || band.frequency >= self.format.sample_rate as f32 / 2.0 {
            return Err(invalid("frequency outside (0, nyquist)"));
        }
        if band.gain_db.abs() > MAX_BAND_GAIN_DB {
            return Err(invalid("gain beyond +/-24 dB"));
        }
        Ok(())
    }
}

impl Equalizer for GraphicEqualizer {
    fn process(&mut self, buffer: &mut [f32]) {
        if self.bands.is_empty() {
            return;
        }

        let channels = self.format.channels as usize;
        for frame in buffer.chunks_exact_mut(channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                let mut value = *sample;
                for band in &mut self.bands {
                    value = band.filters[channel].run(value);
                }
                // Flush denormals
                *sample = if value.abs() < 1e-20 { 0.0 } else { value };
            }
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            for filter in &mut band.filters {
                filter.reset();
            }
        }
    }

    fn profile(&self) -> EqualizerProfile {
        EqualizerProfile {
            name: self.name.clone(),
            bands: self.bands(),
        }
    }
}

impl std::fmt::Debug for GraphicEqualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicEqualizer")
            .field("format", &self.format)
            .field("name", &self.name)
            .field("bands", &self.bands())
            .finish()
    }
}


#[cfg(all(test, not(feature = "equalizer")))]
mod tests {
    use super::*;

    #[test]
    fn test_construction_fails_without_backend() {
        assert!(matches!(
            GraphicEqualizer::new(PcmFormat::STEREO_48K, &[]),
            Err(AudioError::EqualizerUnavailable)
        ));
    }
}
