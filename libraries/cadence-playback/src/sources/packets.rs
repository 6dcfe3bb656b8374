//! Pre-encoded packet source

use crate::error::{PlaybackError, Result};
use crate::source::{AudioSource, Reusability};
use cadence_audio::PcmFormat;
use std::time::Duration;

/// Transport packets that were encoded ahead of time
///
/// Each packet covers exactly one frame; the engine forwards them to the
/// sink untouched, skipping equalizer, volume and encoder.
pub struct PacketSource {
    packets: Vec<Vec<u8>>,
    format: PcmFormat,
    frame_duration: Duration,
    samples_per_packet: u64,
    index: usize,
}

impl PacketSource {
    /// `format` and `frame_duration` describe the decoded audio of each packet
    pub fn new(packets: Vec<Vec<u8>>, format: PcmFormat, frame_duration: Duration) -> Self {
        Self {
            packets,
            format,
            frame_duration,
            samples_per_packet: format.samples_per_frame(frame_duration) as u64,
            index: 0,
        }
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }
}

impl AudioSource for PacketSource {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let Some(packet) = self.packets.get(self.index) else {
            return Ok(0);
        };
        if packet.len() > buffer.len() {
            self.index += 1;
            return Err(PlaybackError::SourceDecodeError(format!(
                "packet of {} bytes exceeds frame buffer of {}",
                packet.len(),
                buffer.len()
            )));
        }
        buffer[..packet.len()].copy_from_slice(packet);
        self.index += 1;
        Ok(packet.len())
    }

    /// Lands on the packet containing `position`
    fn seek(&mut self, position: u64) -> Result<()> {
        let length = self.packets.len() as u64 * self.samples_per_packet;
        if position > length {
            return Err(PlaybackError::seek_out_of_range(
                self.format.duration_of(position),
                self.format.duration_of(length),
            ));
        }
        self.index = (position / self.samples_per_packet.max(1)) as usize;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.index as u64 * self.samples_per_packet
    }

    fn length(&self) -> Option<u64> {
        Some(self.packets.len() as u64 * self.samples_per_packet)
    }

    fn reusability(&self) -> Reusability {
        Reusability::Reusable
    }

    fn reset(&mut self) -> Result<()> {
        self.index = 0;
        Ok(())
    }

    fn is_pre_encoded(&self) -> bool {
        true
    }

    fn packet_duration(&self) -> Option<Duration> {
        Some(self.frame_duration)
    }
}
