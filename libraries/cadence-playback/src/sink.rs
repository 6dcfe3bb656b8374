//! Transport sink boundary
//!
//! The engine hands every encoded frame to a [`TransportSink`]; shipping it
//! to a remote endpoint is the host's business.

use crate::error::{PlaybackError, Result};
use crate::track::TrackId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One encoded frame on its way out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Wraps at `u16::MAX`
    pub sequence: u16,
    /// Sample clock; advances by samples-per-frame, wraps at `u32::MAX`
    pub timestamp: u32,
    /// Track the frame was cut from
    pub track: TrackId,
    pub payload: Vec<u8>,
}

/// Consumer of encoded frames
///
/// Called only from the engine's real-time thread; implementations must not
/// block for longer than a fraction of a frame.
pub trait TransportSink: Send {
    /// Deliver one frame
    fn send_frame(&mut self, frame: EncodedFrame) -> Result<()>;

    /// Whether frames can currently be delivered
    fn is_connected(&self) -> bool {
        true
    }

    /// Emission started (`true`) or stopped (`false`)
    fn set_speaking(&mut self, _speaking: bool) {}
}

/// Sequence number and timestamp generator
#[derive(Debug, Clone, Default)]
pub(crate) struct FrameStamp {
    sequence: u16,
    timestamp: u32,
}

impl FrameStamp {
    /// Stamp for the next frame, then advance
    pub(crate) fn next(&mut self, samples_per_frame: u32) -> (u16, u32) {
        let stamp = (self.sequence, self.timestamp);
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples_per_frame);
        stamp
    }
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TransportSink for NullSink {
    fn send_frame(&mut self, _frame: EncodedFrame) -> Result<()> {
        Ok(())
    }
}

/// Forwards frames into a crossbeam channel
///
/// Reports itself disconnected once the receiver is gone, or while
/// [`ChannelSinkControl::set_connected`] says so.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<EncodedFrame>,
    control: ChannelSinkControl,
}

/// Handle for toggling a [`ChannelSink`] from outside the engine
#[derive(Debug, Clone)]
pub struct ChannelSinkControl {
    connected: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
}

impl ChannelSinkControl {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Last speaking state the engine announced
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<EncodedFrame>) {
        let (tx, rx) = unbounded();
        let control = ChannelSinkControl {
            connected: Arc::new(AtomicBool::new(true)),
            speaking: Arc::new(AtomicBool::new(false)),
        };
        (Self { tx, control }, rx)
    }

    pub fn control(&self) -> ChannelSinkControl {
        self.control.clone()
    }
}

impl TransportSink for ChannelSink {
    fn send_frame(&mut self, frame: EncodedFrame) -> Result<()> {
        if !self.control.is_connected() {
            return Err(PlaybackError::NotConnected);
        }
        self.tx.send(frame).map_err(|_| {
            self.control.set_connected(false);
            PlaybackError::NotConnected
        })
    }

    fn is_connected(&self) -> bool {
        self.control.is_connected()
    }

    fn set_speaking(&mut self, speaking: bool) {
        self.control.speaking.store(speaking, Ordering::Release);
    }
}
