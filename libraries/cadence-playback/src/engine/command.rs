//! Commands sent from caller threads to the real-time thread

use crate::track::Track;
use crate::types::DisconnectReason;
use cadence_audio::Equalizer;
use std::fmt;
use std::time::Duration;

/// One control request, applied at the worker's next safe point
pub(crate) enum EngineCommand {
    Play(Track),
    PlayIndex(usize),
    Pause,
    Resume,
    Stop,
    /// Absolute offset into the current track
    Seek(Duration),
    /// Relative jump backwards
    Rewind(Duration),
    Next,
    Previous,
    SetVolume(f32),
    SetMuted(bool),
    SetEqualizer(Option<Box<dyn Equalizer>>),
    Disconnect(DisconnectReason),
}

impl fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play(track) => f.debug_tuple("Play").field(&track.name()).finish(),
            Self::PlayIndex(index) => f.debug_tuple("PlayIndex").field(index).finish(),
            Self::Pause => f.write_str("Pause"),
            Self::Resume => f.write_str("Resume"),
            Self::Stop => f.write_str("Stop"),
            Self::Seek(offset) => f.debug_tuple("Seek").field(offset).finish(),
            Self::Rewind(amount) => f.debug_tuple("Rewind").field(amount).finish(),
            Self::Next => f.write_str("Next"),
            Self::Previous => f.write_str("Previous"),
            Self::SetVolume(level) => f.debug_tuple("SetVolume").field(level).finish(),
            Self::SetMuted(muted) => f.debug_tuple("SetMuted").field(muted).finish(),
            Self::SetEqualizer(eq) => f
                .debug_tuple("SetEqualizer")
                .field(&eq.as_ref().map(|eq| eq.profile().name))
                .finish(),
            Self::Disconnect(reason) => f.debug_tuple("Disconnect").field(reason).finish(),
        }
    }
}
