//! WAV file source
//!
//! Uses `hound` for header parsing and sample decoding. Only 16-bit integer
//! PCM is accepted since that is what the engine consumes directly.

use crate::error::{PlaybackError, Result};
use crate::source::{AudioSource, Reusability};
use cadence_audio::PcmFormat;
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// 16-bit PCM WAV source
pub struct WavSource<R: Read> {
    reader: WavReader<R>,
    format: PcmFormat,
    position: u64,
    length: u64,
}

impl WavSource<BufReader<File>> {
    /// Open a WAV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = WavReader::open(path).map_err(decode_error)?;
        Self::from_reader(reader)
    }
}

impl<R: Read + Seek + Send> WavSource<R> {
    /// Parse a WAV stream
    pub fn new(reader: R) -> Result<Self> {
        Self::from_reader(WavReader::new(reader).map_err(decode_error)?)
    }

    fn from_reader(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(PlaybackError::SourceDecodeError(format!(
                "unsupported WAV encoding: {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let format = PcmFormat::new(spec.sample_rate, spec.channels);
        format.validate()?;

        Ok(Self {
            length: u64::from(reader.duration()),
            reader,
            format,
            position: 0,
        })
    }
}

impl<R: Read + Seek + Send> AudioSource for WavSource<R> {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        {
            let mut samples = self.reader.samples::<i16>();
            for pair in buffer.chunks_exact_mut(2) {
                match samples.next() {
                    Some(Ok(sample)) => {
                        pair.copy_from_slice(&sample.to_le_bytes());
                        written += 2;
                    }
                    Some(Err(e)) => return Err(decode_error(e)),
                    None => break,
                }
            }
        }

        if written == 0 {
            return Ok(0);
        }
        buffer[written..].fill(0);

        let advanced = (buffer.len() / self.format.bytes_per_position()) as u64;
        self.position = (self.position + advanced).min(self.length);
        Ok(buffer.len())
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.length {
            return Err(PlaybackError::seek_out_of_range(
                self.format.duration_of(position),
                self.format.duration_of(self.length),
            ));
        }
        self.reader.seek(position as u32)?;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn reusability(&self) -> Reusability {
        Reusability::Reusable
    }

    fn reset(&mut self) -> Result<()> {
        self.seek(0)
    }
}

fn decode_error(e: hound::Error) -> PlaybackError {
    match e {
        hound::Error::IoError(io) => PlaybackError::Io(io),
        other => PlaybackError::SourceDecodeError(other.to_string()),
    }
}
