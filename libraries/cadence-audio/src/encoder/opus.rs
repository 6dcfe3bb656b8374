//! Opus encoder backed by libopus

use super::{Encoder, EncoderBackend, EncoderSettings};
use crate::error::{AudioError, Result};
use audiopus::coder::Encoder as OpusCoder;
use audiopus::{Application, Bitrate, Channels, SampleRate};
use tracing::warn;

/// Three-byte Opus packet that decodes to silence
pub const OPUS_SILENCE_FRAME: [u8; 3] = [0xF8, 0xFF, 0xFE];

/// Largest packet libopus is asked to produce
const MAX_PACKET_BYTES: usize = 4000;

/// Opus encoder tuned for music
pub struct OpusEncoder {
    coder: OpusCoder,
    sample_rate: SampleRate,
    channels: Channels,
    bitrate: Bitrate,
    frame_len: usize,
    packet: Vec<u8>,
}

impl OpusEncoder {
    pub fn new(settings: &EncoderSettings) -> Result<Self> {
        let sample_rate = match settings.format.sample_rate {
            8_000 => SampleRate::Hz8000,
            12_000 => SampleRate::Hz12000,
            16_000 => SampleRate::Hz16000,
            24_000 => SampleRate::Hz24000,
            48_000 => SampleRate::Hz48000,
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "opus cannot encode at {} Hz",
                    other
                )))
            }
        };
        let channels = match settings.format.channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "opus cannot encode {} channels",
                    other
                )))
            }
        };

        let bitrate = Bitrate::BitsPerSecond(settings.bitrate as i32);
        Ok(Self {
            coder: build_coder(sample_rate, channels, bitrate)?,
            sample_rate,
            channels,
            bitrate,
            frame_len: settings.frame_len(),
            packet: vec![0; MAX_PACKET_BYTES],
        })
    }
}

fn build_coder(sample_rate: SampleRate, channels: Channels, bitrate: Bitrate) -> Result<OpusCoder> {
    let mut coder = OpusCoder::new(sample_rate, channels, Application::Audio)
        .map_err(|e| AudioError::fatal(format!("opus init: {}", e)))?;
    coder
        .set_bitrate(bitrate)
        .map_err(|e| AudioError::fatal(format!("opus bitrate: {}", e)))?;
    Ok(coder)
}

impl Encoder for OpusEncoder {
    fn backend(&self) -> EncoderBackend {
        EncoderBackend::Opus
    }

    fn encode(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> Result<()> {
        if pcm.len() != self.frame_len {
            return Err(AudioError::transient(format!(
                "frame has {} samples, expected {}",
                pcm.len(),
                self.frame_len
            )));
        }

        let written = self
            .coder
            .encode(pcm, &mut self.packet)
            .map_err(|e| AudioError::transient(format!("opus encode: {}", e)))?;

        out.clear();
        out.extend_from_slice(&self.packet[..written]);
        Ok(())
    }

    fn silence_frame(&self) -> Vec<u8> {
        OPUS_SILENCE_FRAME.to_vec()
    }

    /// Start from a fresh libopus encoder so no prediction state leaks
    /// across tracks
    fn reset(&mut self) {
        match build_coder(self.sample_rate, self.channels, self.bitrate) {
            Ok(coder) => self.coder = coder,
            Err(e) => warn!(error = %e, "opus reset failed, keeping encoder state"),
        }
    }
}
