//! Raw s16le passthrough encoder

use super::{Encoder, EncoderBackend, EncoderSettings};
use crate::error::{AudioError, Result};

/// Writes each frame out as little-endian 16-bit PCM
#[derive(Debug, Clone)]
pub struct PcmEncoder {
    frame_len: usize,
}

impl PcmEncoder {
    pub fn new(settings: &EncoderSettings) -> Self {
        Self {
            frame_len: settings.frame_len(),
        }
    }
}

impl Encoder for PcmEncoder {
    fn backend(&self) -> EncoderBackend {
        EncoderBackend::Pcm
    }

    fn encode(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> Result<()> {
        if pcm.len() != self.frame_len {
            return Err(AudioError::transient(format!(
                "frame has {} samples, expected {}",
                pcm.len(),
                self.frame_len
            )));
        }

        out.clear();
        out.reserve(pcm.len() * 2);
        for sample in pcm {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(())
    }

    fn silence_frame(&self) -> Vec<u8> {
        vec![0; self.frame_len * 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::format::PcmFormat;
    use std::time::Duration;

    fn encoder() -> PcmEncoder {
        PcmEncoder::new(&EncoderSettings::new(
            PcmFormat::new(8_000, 1),
            Duration::from_millis(10),
        ))
    }

    #[test]
    fn test_encodes_little_endian() {
        let mut enc = encoder();
        let mut pcm = vec![0i16; 80];
        pcm[0] = 0x0102;
        pcm[1] = -1;

        let mut out = Vec::new();
        enc.encode(&pcm, &mut out).unwrap();
        assert_eq!(out.len(), 160);
        assert_eq!(&out[..4], &[0x02, 0x01, 0xFF, 0xFF]);
    }

    #[test]
    fn test_short_frame_is_transient() {
        let mut enc = encoder();
        let err = enc.encode(&[0; 10], &mut Vec::new()).unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::Transient));
    }
}
