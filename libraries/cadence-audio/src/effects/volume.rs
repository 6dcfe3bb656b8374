//! Linear volume stage

use crate::error::{AudioError, Result};

/// Loudest accepted volume (+6 dB)
pub const MAX_VOLUME: f32 = 2.0;

/// Linear gain with mute
///
/// Values above 1.0 amplify; anything pushed past full scale saturates when
/// the frame is quantized back to 16-bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: f32,
    muted: bool,
}

impl Volume {
    /// Create a volume, rejecting NaN, negative, and > MAX_VOLUME
    pub fn new(level: f32) -> Result<Self> {
        Self::check(level)?;
        Ok(Self {
            level,
            muted: false,
        })
    }

    /// Unity gain
    pub const fn unity() -> Self {
        Self {
            level: 1.0,
            muted: false,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) -> Result<()> {
        Self::check(level)?;
        self.level = level;
        Ok(())
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain actually applied
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }

    /// Apply to interleaved samples in place
    pub fn apply(&self, buffer: &mut [f32]) {
        apply_gain(self.gain(), buffer);
    }

    fn check(level: f32) -> Result<()> {
        if level.is_finite() && (0.0..=MAX_VOLUME).contains(&level) {
            Ok(())
        } else {
            Err(AudioError::InvalidVolume(level))
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::unity()
    }
}

/// Multiply samples by `gain`; silence writes exact zeros, unity is a no-op
pub fn apply_gain(gain: f32, buffer: &mut [f32]) {
    if gain == 0.0 {
        buffer.fill(0.0);
        return;
    }
    if gain == 1.0 {
        return;
    }
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}
