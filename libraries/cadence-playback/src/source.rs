//! Audio source contract
//!
//! A source yields fixed-format s16le PCM one frame at a time. Each source
//! declares up front whether it can be replayed; the engine checks that tag
//! before resetting instead of discovering it through a failed rewind.

use crate::error::Result;
use cadence_audio::PcmFormat;
use std::time::Duration;

/// Whether a source can be rewound to its start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reusability {
    /// Seekable from the start; `reset` and `seek` always work
    Reusable,
    /// Forward-only; `reset` only succeeds before the first read
    OneShot,
}

/// Pluggable PCM producer
///
/// Positions are in samples per channel (see [`cadence_audio::format`]).
/// Format, length and reusability are fixed at construction; resampling to
/// the engine format is the source's job, not the engine's.
pub trait AudioSource: Send {
    /// PCM layout of every frame this source yields
    fn format(&self) -> PcmFormat;

    /// Read the next frame into `buffer`
    ///
    /// Fills the whole buffer unless the stream ends; a trailing partial
    /// frame is zero-padded to the buffer length.
    ///
    /// # Returns
    /// * `Ok(n)` - Bytes written (0 = end of stream)
    /// * `Err(SourceDecodeError)` - This frame is corrupt; the next may be fine
    ///
    /// Runs on the real-time thread with the track's source locked, and no
    /// command is applied until it returns; implementations should not block
    /// for longer than a frame.
    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Jump to `position`
    ///
    /// Must be idempotent. Fails with `IllegalSeek` when the source cannot
    /// seek or `position` lies beyond [`length`](AudioSource::length);
    /// out-of-range targets are never clamped.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// Current read position
    fn position(&self) -> u64;

    /// Total length, when known
    fn length(&self) -> Option<u64>;

    /// Replay capability tag
    fn reusability(&self) -> Reusability;

    /// Rewind to the start
    ///
    /// One-shot sources fail with `SourceNotReusable` once anything has been
    /// read rather than replaying a truncated stream.
    fn reset(&mut self) -> Result<()>;

    fn is_reusable(&self) -> bool {
        self.reusability() == Reusability::Reusable
    }

    /// Frames are already transport payloads and skip the EQ/volume/encoder path
    fn is_pre_encoded(&self) -> bool {
        false
    }

    /// Audio covered by one pre-encoded packet
    ///
    /// The engine only plays pre-encoded sources whose packets match its own
    /// frame duration.
    fn packet_duration(&self) -> Option<Duration> {
        None
    }

    /// Total duration, when the length is known
    fn duration(&self) -> Option<Duration> {
        self.length().map(|len| self.format().duration_of(len))
    }
}
