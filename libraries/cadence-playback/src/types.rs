//! Shared playback types

use serde::{Deserialize, Serialize};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// No worker thread running
    Idle,
    /// Emitting frames
    Playing,
    /// Worker alive, emission withheld
    Paused,
    /// Worker alive, no current track, playlist cursor retained
    Stopped,
    /// Worker exited for good; every command fails with `NotConnected`
    Terminated,
}

impl EngineState {
    /// Playing or paused
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// What happens after the last track finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfPlaylist {
    /// Stop and let the worker exit
    #[default]
    Stop,
    /// Wrap around to the first track
    Loop,
}

/// Reaction to the transport sink going away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisconnectPolicy {
    /// Hold emission until the sink reconnects
    #[default]
    Wait,
    /// Terminate the engine
    Terminate,
}

/// Why the engine terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called
    Requested,
    /// Last engine handle dropped
    EngineDropped,
    /// Sink reported not connected under `DisconnectPolicy::Terminate`
    TransportLost,
}
