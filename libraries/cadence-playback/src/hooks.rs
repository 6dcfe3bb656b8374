//! Lifecycle hooks
//!
//! Hooks run synchronously on the engine's real-time thread between two
//! frames. They may call back into the engine (including `stop()`); no
//! engine lock is held while a hook runs.

use crate::engine::PlaybackEngine;
use crate::error::PlaybackError;
use crate::track::Track;
use crate::types::DisconnectReason;

/// Outcome of a transition hook
pub type HookResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Host callbacks
///
/// Every method has a no-op default. A transition hook that returns `Err`
/// or panics aborts the track change: the engine stops and reports the
/// failure through [`on_player_error`](PlayerHooks::on_player_error).
pub trait PlayerHooks: Send + Sync + 'static {
    /// Before the first frame of `track` is emitted
    fn before_play_next(&self, _engine: &PlaybackEngine, _track: &Track) -> HookResult {
        Ok(())
    }

    /// After `track` finished or was skipped
    fn after_play_next(&self, _engine: &PlaybackEngine, _track: &Track) -> HookResult {
        Ok(())
    }

    /// Playback hit `error`
    ///
    /// Either a fault that stopped playback, or a seek the source refused
    /// after the command was accepted; the latter leaves the track playing
    /// from where it was.
    fn on_player_error(&self, _engine: &PlaybackEngine, _error: &PlaybackError) {}

    /// The last track finished and the end-of-playlist policy is `Stop`
    fn on_playlist_end(&self, _engine: &PlaybackEngine) {}

    /// The engine terminated
    fn on_disconnect(&self, _engine: &PlaybackEngine, _reason: DisconnectReason) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl PlayerHooks for NoHooks {}

/// Message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
