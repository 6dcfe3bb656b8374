//! Tracks: a source plus what the host knows about it

use crate::error::{PlaybackError, Result};
use crate::source::{AudioSource, Reusability};
use cadence_audio::{Equalizer, EqualizerProfile, PcmFormat, Volume};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

impl TrackId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub name: String,
    /// Page the track was found on
    pub url: Option<String>,
    /// Direct media URL the source reads from
    pub stream_url: Option<String>,
    pub thumbnail: Option<String>,
    /// Arbitrary host-supplied attributes
    pub attributes: BTreeMap<String, String>,
}

impl TrackMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

struct TrackInner {
    id: TrackId,
    metadata: TrackMetadata,
    format: PcmFormat,
    duration: Option<Duration>,
    reusability: Reusability,
    pre_encoded: bool,
    packet_duration: Option<Duration>,
    source: Mutex<Box<dyn AudioSource>>,
    /// Frames were read since the last successful reset
    consumed: AtomicBool,
    equalizer: Mutex<Option<Box<dyn Equalizer>>>,
    volume: Mutex<Volume>,
}

/// Shared handle to one playable track
///
/// Cloning is cheap and yields the same track; equality is identity. The
/// source is owned by the track and only borrowed by the engine while the
/// track is current, so removing a playing track from the playlist does not
/// cut it off.
#[derive(Clone)]
pub struct Track {
    inner: Arc<TrackInner>,
}

impl Track {
    pub fn new(metadata: TrackMetadata, source: impl AudioSource + 'static) -> Self {
        Self::from_boxed(metadata, Box::new(source))
    }

    pub fn from_boxed(metadata: TrackMetadata, source: Box<dyn AudioSource>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::next(),
                format: source.format(),
                duration: source.duration(),
                reusability: source.reusability(),
                pre_encoded: source.is_pre_encoded(),
                packet_duration: source.packet_duration(),
                metadata,
                source: Mutex::new(source),
                consumed: AtomicBool::new(false),
                equalizer: Mutex::new(None),
                volume: Mutex::new(Volume::unity()),
            }),
        }
    }

    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.metadata.name
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.inner.metadata
    }

    pub fn format(&self) -> PcmFormat {
        self.inner.format
    }

    /// Total duration, if the source knows its length
    pub fn duration(&self) -> Option<Duration> {
        self.inner.duration
    }

    pub fn reusability(&self) -> Reusability {
        self.inner.reusability
    }

    pub fn is_reusable(&self) -> bool {
        self.inner.reusability == Reusability::Reusable
    }

    pub fn is_pre_encoded(&self) -> bool {
        self.inner.pre_encoded
    }

    /// Duration of one pre-encoded packet
    pub fn packet_duration(&self) -> Option<Duration> {
        self.inner.packet_duration
    }

    /// Check the source lines up with an engine's PCM layout and frame length
    ///
    /// Pre-encoded packets are forwarded one per frame slot, so their
    /// duration must equal the engine's frame duration.
    pub fn check_layout(&self, format: PcmFormat, frame_duration: Duration) -> Result<()> {
        if self.format() != format {
            return Err(PlaybackError::FormatMismatch {
                expected: format,
                found: self.format(),
            });
        }
        if self.is_pre_encoded() && self.packet_duration() != Some(frame_duration) {
            return Err(PlaybackError::PacketDurationMismatch {
                expected: frame_duration,
                found: self.packet_duration(),
            });
        }
        Ok(())
    }

    /// Whether starting this track from the top can succeed
    pub fn can_play(&self) -> bool {
        self.is_reusable() || !self.inner.consumed.load(Ordering::Acquire)
    }

    // ===== Per-track Signal Settings =====

    /// Per-track volume multiplier
    pub fn volume(&self) -> f32 {
        self.inner.volume.lock().level()
    }

    pub fn set_volume(&self, level: f32) -> Result<()> {
        self.inner.volume.lock().set_level(level)?;
        Ok(())
    }

    /// Install or clear the per-track equalizer
    pub fn set_equalizer(&self, equalizer: Option<Box<dyn Equalizer>>) {
        *self.inner.equalizer.lock() = equalizer;
    }

    pub fn equalizer(&self) -> Option<EqualizerProfile> {
        self.inner.equalizer.lock().as_ref().map(|eq| eq.profile())
    }

    // ===== Engine Access =====

    pub(crate) fn lock_source(&self) -> MutexGuard<'_, Box<dyn AudioSource>> {
        self.inner.source.lock()
    }

    pub(crate) fn lock_equalizer(&self) -> MutexGuard<'_, Option<Box<dyn Equalizer>>> {
        self.inner.equalizer.lock()
    }

    pub(crate) fn gain(&self) -> f32 {
        self.inner.volume.lock().gain()
    }

    pub(crate) fn mark_consumed(&self) {
        self.inner.consumed.store(true, Ordering::Release);
    }

    /// Rewind to the top before (re)playing
    ///
    /// A fresh source is left alone; a used one is reset, which fails with
    /// `SourceNotReusable` for an exhausted one-shot source.
    pub(crate) fn prepare(&self) -> Result<()> {
        if self.inner.consumed.load(Ordering::Acquire) {
            if !self.is_reusable() {
                return Err(PlaybackError::SourceNotReusable);
            }
            self.lock_source().reset()?;
            self.inner.consumed.store(false, Ordering::Release);
        }
        self.reset_equalizer();
        Ok(())
    }

    /// Reset a reusable source after stop; one-shot sources stay spent
    pub(crate) fn release(&self) -> Result<()> {
        if self.is_reusable() && self.inner.consumed.load(Ordering::Acquire) {
            self.lock_source().reset()?;
            self.inner.consumed.store(false, Ordering::Release);
        }
        Ok(())
    }

    pub(crate) fn reset_equalizer(&self) {
        if let Some(eq) = self.lock_equalizer().as_mut() {
            eq.reset();
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Track {}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.inner.id)
            .field("name", &self.inner.metadata.name)
            .field("duration", &self.inner.duration)
            .field("reusability", &self.inner.reusability)
            .finish()
    }
}
