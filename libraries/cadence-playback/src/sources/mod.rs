//! Concrete audio sources
//!
//! - [`PcmSource`]: raw s16le from any seekable reader (reusable)
//! - [`StreamSource`]: raw s16le from a forward-only reader (one-shot)
//! - [`WavSource`]: 16-bit WAV files via `hound` (reusable)
//! - [`PacketSource`]: pre-encoded transport packets (reusable)

mod packets;
mod pcm;
mod wav;

pub use packets::PacketSource;
pub use pcm::{PcmSource, StreamSource};
pub use wav::WavSource;

use std::io::{ErrorKind, Read};

/// Fill `buffer` from `reader`, zero-padding a short tail
///
/// Returns the bytes that came from the stream (0 = end of stream); when
/// non-zero the whole buffer is valid.
pub(crate) fn read_padded<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    if filled > 0 {
        buffer[filled..].fill(0);
    }
    Ok(filled)
}
