//! Raw PCM sources

use super::read_padded;
use crate::error::{PlaybackError, Result};
use crate::source::{AudioSource, Reusability};
use cadence_audio::PcmFormat;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Raw s16le PCM over a seekable reader
pub struct PcmSource<R> {
    reader: R,
    format: PcmFormat,
    position: u64,
    length: u64,
}

impl<R: Read + Seek + Send> PcmSource<R> {
    /// Wrap a reader positioned anywhere; length comes from the stream end
    pub fn new(mut reader: R, format: PcmFormat) -> Result<Self> {
        format.validate()?;
        let bytes = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        // Round a trailing partial sample up so it still gets played
        let per_position = format.bytes_per_position() as u64;
        Ok(Self {
            reader,
            format,
            position: 0,
            length: bytes.div_ceil(per_position),
        })
    }
}

impl PcmSource<Cursor<Vec<u8>>> {
    /// In-memory PCM
    pub fn from_bytes(bytes: Vec<u8>, format: PcmFormat) -> Result<Self> {
        Self::new(Cursor::new(bytes), format)
    }
}

impl PcmSource<BufReader<File>> {
    /// Raw PCM file
    pub fn open(path: impl AsRef<Path>, format: PcmFormat) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?), format)
    }
}

impl<R: Read + Seek + Send> AudioSource for PcmSource<R> {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let read = read_padded(&mut self.reader, buffer)?;
        if read == 0 {
            return Ok(0);
        }
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
        self.reader
            .seek(SeekFrom::Start(self.format.byte_offset(position)))?;
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

/// Raw s16le PCM over a forward-only reader (pipe, socket, child stdout)
///
/// Reads go straight to `R` on the engine's real-time thread. A stalled
/// reader stalls the worker with it: commands such as `stop` are only acted
/// on once the read returns. Give blocking readers a timeout (e.g.
/// `TcpStream::set_read_timeout`) or feed them from a buffering thread.
pub struct StreamSource<R> {
    reader: R,
    format: PcmFormat,
    position: u64,
    started: bool,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(reader: R, format: PcmFormat) -> Result<Self> {
        format.validate()?;
        Ok(Self {
            reader,
            format,
            position: 0,
            started: false,
        })
    }
}

impl<R: Read + Send> AudioSource for StreamSource<R> {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.started = true;
        let read = read_padded(&mut self.reader, buffer)?;
        if read == 0 {
            return Ok(0);
        }
        self.position += (buffer.len() / self.format.bytes_per_position()) as u64;
        Ok(buffer.len())
    }

    fn seek(&mut self, _position: u64) -> Result<()> {
        Err(PlaybackError::IllegalSeek(
            "stream source is not seekable".to_string(),
        ))
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn length(&self) -> Option<u64> {
        None
    }

    fn reusability(&self) -> Reusability {
        Reusability::OneShot
    }

    fn reset(&mut self) -> Result<()> {
        if self.started {
            Err(PlaybackError::SourceNotReusable)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MONO_8K: PcmFormat = PcmFormat::new(8_000, 1);

    fn ramp(samples: i16) -> Vec<u8> {
        (0..samples).flat_map(i16::to_le_bytes).collect()
    }

    #[test]
    fn test_pcm_length_and_duration() {
        let source = PcmSource::from_bytes(ramp(4_000), MONO_8K).unwrap();
        assert_eq!(source.length(), Some(4_000));
        assert_eq!(source.duration(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_pcm_reads_then_eof() {
        let mut source = PcmSource::from_bytes(ramp(10), MONO_8K).unwrap();
        let mut buffer = [0u8; 16];

        assert_eq!(source.read_frame(&mut buffer).unwrap(), 16);
        assert_eq!(source.position(), 8);
        assert_eq!(source.read_frame(&mut buffer).unwrap(), 16);
        assert_eq!(&buffer[..4], &[8, 0, 9, 0]);
        assert!(buffer[4..].iter().all(|&b| b == 0));
        assert_eq!(source.position(), 10);
        assert_eq!(source.read_frame(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_pcm_seek_lands_on_offset() {
        let mut source = PcmSource::from_bytes(ramp(100), MONO_8K).unwrap();
        source.seek(42).unwrap();
        source.seek(42).unwrap();

        let mut buffer = [0u8; 2];
        source.read_frame(&mut buffer).unwrap();
        assert_eq!(i16::from_le_bytes(buffer), 42);
    }

    #[test]
    fn test_pcm_seek_out_of_range() {
        let mut source = PcmSource::from_bytes(ramp(100), MONO_8K).unwrap();
        assert!(source.seek(100).is_ok());
        assert!(matches!(source.seek(101), Err(PlaybackError::IllegalSeek(_))));
        // Failed seek leaves position untouched
        assert_eq!(source.position(), 100);
    }

    #[test]
    fn test_pcm_reset_replays_identically() {
        let mut source = PcmSource::from_bytes(ramp(50), MONO_8K).unwrap();
        let mut first = [0u8; 20];
        source.read_frame(&mut first).unwrap();
        source.reset().unwrap();

        let mut second = [0u8; 20];
        source.read_frame(&mut second).unwrap();
        assert_eq!(first, second);
        assert!(source.is_reusable());
    }

    #[test]
    fn test_stream_is_one_shot() {
        let mut source = StreamSource::new(Cursor::new(ramp(20)), MONO_8K).unwrap();
        assert_eq!(source.reusability(), Reusability::OneShot);
        assert!(source.reset().is_ok());
        assert!(matches!(source.seek(0), Err(PlaybackError::IllegalSeek(_))));

        let mut buffer = [0u8; 8];
        source.read_frame(&mut buffer).unwrap();
        assert!(matches!(source.reset(), Err(PlaybackError::SourceNotReusable)));
        assert_eq!(source.length(), None);
    }
}
