//! Cadence Playback
//!
//! Real-time playback engine that streams PCM from pluggable sources,
//! runs it through the equalizer/volume path, encodes it, and hands one
//! fixed-duration frame at a time to a transport sink.
//!
//! # Architecture
//!
//! - **Sources**: [`AudioSource`] implementations tagged `Reusable` or `OneShot`
//! - **Tracks**: [`Track`] binds a source to metadata and per-track EQ/volume
//! - **Playlist**: [`Playlist`] is a shared, cursor-carrying track list
//! - **Engine**: [`PlaybackEngine`] owns one real-time worker thread fed by a
//!   single-consumer command channel
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_playback::{EngineConfig, NullSink, PcmSource, PlaybackEngine, Track, TrackMetadata};
//!
//! let config = EngineConfig::default();
//! let engine = PlaybackEngine::new(config.clone(), NullSink)?;
//!
//! let source = PcmSource::open("song.raw", config.format())?;
//! let track = Track::new(TrackMetadata::new("Song"), source);
//! engine.play(&track)?;
//! # Ok::<(), cadence_playback::PlaybackError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod playlist;
pub mod sink;
pub mod source;
pub mod sources;
pub mod track;
pub mod types;

pub use config::EngineConfig;
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use hooks::{HookResult, NoHooks, PlayerHooks};
pub use playlist::{Cursor, Playlist};
pub use sink::{ChannelSink, ChannelSinkControl, EncodedFrame, NullSink, TransportSink};
pub use source::{AudioSource, Reusability};
pub use sources::{PacketSource, PcmSource, StreamSource, WavSource};
pub use track::{Track, TrackId, TrackMetadata};
pub use types::{DisconnectPolicy, DisconnectReason, EndOfPlaylist, EngineState};

pub use cadence_audio::{
    EqBand, Equalizer, EqualizerPreset, EqualizerProfile, GraphicEqualizer, PcmFormat,
    SubwooferEqualizer,
};
