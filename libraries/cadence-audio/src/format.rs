//! PCM format description
//!
//! All PCM handled by the engine is interleaved signed 16-bit little endian.
//! Positions are counted in *samples per channel*: one unit covers one
//! sample for every channel, so a stereo stream advances 4 bytes per unit.

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bytes per single-channel sample (s16le)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Interleaved PCM layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Samples per second, per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl PcmFormat {
    /// 48 kHz stereo, the native rate of the Opus transport
    pub const STEREO_48K: Self = Self::new(48_000, 2);

    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Reject layouts no stage in this crate can process
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(AudioError::UnsupportedFormat(format!(
                "sample rate {} Hz outside 8000..=192000",
                self.sample_rate
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} channels (mono or stereo only)",
                self.channels
            )));
        }
        Ok(())
    }

    /// Bytes covering one sample on every channel
    pub fn bytes_per_position(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Samples per channel in one frame of `frame` duration
    pub fn samples_per_frame(&self, frame: Duration) -> usize {
        (u128::from(self.sample_rate) * frame.as_nanos() / 1_000_000_000) as usize
    }

    /// Interleaved sample count in one frame
    pub fn frame_len(&self, frame: Duration) -> usize {
        self.samples_per_frame(frame) * self.channels as usize
    }

    /// Byte size of one frame
    pub fn frame_bytes(&self, frame: Duration) -> usize {
        self.frame_len(frame) * BYTES_PER_SAMPLE
    }

    /// Position (samples per channel) at `offset`, rounded down
    pub fn position_at(&self, offset: Duration) -> u64 {
        (u128::from(self.sample_rate) * offset.as_nanos() / 1_000_000_000) as u64
    }

    /// Time covered by `samples` samples per channel
    pub fn duration_of(&self, samples: u64) -> Duration {
        let nanos = u128::from(samples) * 1_000_000_000 / u128::from(self.sample_rate.max(1));
        Duration::from_nanos(nanos as u64)
    }

    /// Byte offset of a position within a raw PCM stream
    pub fn byte_offset(&self, position: u64) -> u64 {
        position * self.bytes_per_position() as u64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::STEREO_48K
    }
}

impl std::fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz / {} ch / s16le", self.sample_rate, self.channels)
    }
}

// ===== Sample Conversion =====

/// Decode s16le bytes into normalized f32 samples, replacing `out`
pub fn s16le_to_f32(bytes: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0),
    );
}

/// Quantize one normalized sample, saturating instead of wrapping
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Encode normalized samples back into s16le bytes
///
/// Writes `min(samples.len(), out.len() / 2)` samples; out-of-range values
/// saturate to the i16 range.
pub fn f32_to_s16le(samples: &[f32], out: &mut [u8]) {
    for (sample, pair) in samples.iter().zip(out.chunks_exact_mut(BYTES_PER_SAMPLE)) {
        pair.copy_from_slice(&f32_to_i16(*sample).to_le_bytes());
    }
}

/// Reinterpret s16le bytes as samples, replacing `out`
pub fn s16le_to_i16(bytes: &[u8], out: &mut Vec<i16>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
    );
}
