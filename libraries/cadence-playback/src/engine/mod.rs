//! Playback engine
//!
//! ```text
//!  caller threads                        real-time thread
//!  ──────────────                        ────────────────
//!  play / pause / seek / ...             loop {
//!    lock control (short)                  read frame from current track
//!    validate against logical state        track EQ → track volume
//!    update logical state                  global EQ → global volume
//!    send EngineCommand  ─────────────►    encode → sink
//!    unlock, return                        pace to next boundary,
//!                                            applying commands meanwhile
//!                                        }
//! ```
//!
//! Callers never wait for the worker. Every command is validated and
//! enqueued under one short critical section, so concurrent callers are
//! linearized and see each other's effects immediately; the worker applies
//! them at its next safe point and reconciles the published state once its
//! queue is drained.

mod clock;
mod command;
mod pipeline;
mod worker;

use crate::config::EngineConfig;
use crate::error::{PlaybackError, Result};
use crate::hooks::{NoHooks, PlayerHooks};
use crate::playlist::Playlist;
use crate::sink::TransportSink;
use crate::track::Track;
use crate::types::{DisconnectReason, EngineState};
use cadence_audio::{
    build_encoder, EqBand, Equalizer, EqualizerProfile, GraphicEqualizer, PcmFormat, Volume,
};
use command::EngineCommand;
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use worker::{Parts, Worker};

/// Caller-visible engine state, guarded by one mutex
struct Control {
    /// Logical state: what the engine will be once queued commands apply
    state: EngineState,
    /// Present while a worker thread runs
    sender: Option<Sender<EngineCommand>>,
    /// Commands sent but not yet applied
    in_flight: usize,
    current: Option<Track>,
    volume: f32,
    muted: bool,
    equalizer: Option<EqualizerProfile>,
    /// Sink, encoder, and global signal settings while no worker runs
    parked: Option<Parts>,
}

struct Shared {
    config: EngineConfig,
    format: PcmFormat,
    frame_duration: Duration,
    control: Mutex<Control>,
    playlist: RwLock<Playlist>,
    /// Read position of the current track, in samples per channel
    position: AtomicU64,
    hooks: Arc<dyn PlayerHooks>,
    handles: AtomicUsize,
}

/// Handle to one playback engine
///
/// Cheap to clone; all clones drive the same engine. The engine terminates
/// (firing `on_disconnect(EngineDropped)`) when the last handle created by
/// the host is dropped. A handle stored inside the hooks keeps the engine
/// alive.
pub struct PlaybackEngine {
    shared: Arc<Shared>,
    /// Handles given to hooks are not counted
    counted: bool,
}

impl PlaybackEngine {
    /// Create an engine without hooks
    pub fn new(config: EngineConfig, sink: impl TransportSink + 'static) -> Result<Self> {
        Self::with_hooks(config, sink, NoHooks)
    }

    /// Create an engine
    ///
    /// Validates the configuration and resolves the encoder backend and the
    /// default equalizer up front; an unavailable backend fails here rather
    /// than at the first frame. No thread is started until the first `play`.
    pub fn with_hooks(
        config: EngineConfig,
        sink: impl TransportSink + 'static,
        hooks: impl PlayerHooks,
    ) -> Result<Self> {
        config.validate()?;
        let format = config.format();
        let frame_duration = config.frame_duration();

        let encoder = build_encoder(config.encoder, &config.encoder_settings())?;
        let equalizer = config
            .default_equalizer
            .as_deref()
            .map(|bands| Self::build_equalizer(format, bands))
            .transpose()?;
        let volume = Volume::new(config.default_volume)?;

        info!(
            %format,
            frame_ms = config.frame_duration_ms,
            encoder = %config.encoder,
            "playback engine created"
        );

        let control = Control {
            state: EngineState::Idle,
            sender: None,
            in_flight: 0,
            current: None,
            volume: volume.level(),
            muted: false,
            equalizer: equalizer.as_ref().map(|eq| eq.profile()),
            parked: Some(Parts::new(Box::new(sink), encoder, equalizer, volume)),
        };

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                format,
                frame_duration,
                control: Mutex::new(control),
                playlist: RwLock::new(Playlist::new()),
                position: AtomicU64::new(0),
                hooks: Arc::new(hooks),
                handles: AtomicUsize::new(1),
            }),
            counted: true,
        })
    }

    fn uncounted(shared: &Arc<Shared>) -> Self {
        Self {
            shared: Arc::clone(shared),
            counted: false,
        }
    }

    fn build_equalizer(format: PcmFormat, bands: &[EqBand]) -> Result<Box<dyn Equalizer>> {
        Ok(Box::new(GraphicEqualizer::new(format, bands)?))
    }

    // ===== Transport =====

    /// Start `track` from the top
    ///
    /// Appends the track to the playlist when absent and moves the cursor to
    /// it. Starts the real-time thread if none is running.
    pub fn play(&self, track: &Track) -> Result<()> {
        self.check_track(track)?;

        let mut control = self.shared.control.lock();
        match control.state {
            EngineState::Terminated => return Err(PlaybackError::NotConnected),
            EngineState::Playing | EngineState::Paused => {
                return Err(PlaybackError::AlreadyPlaying)
            }
            EngineState::Idle | EngineState::Stopped => {}
        }

        self.shared.playlist.read().add_if_absent(track);
        self.ensure_worker(&mut control)?;
        Self::send(&mut control, EngineCommand::Play(track.clone()))?;
        control.state = EngineState::Playing;
        control.current = Some(track.clone());
        debug!(track = %track.name(), "play requested");
        Ok(())
    }

    /// Jump to the playlist entry at `index`, from any live state
    pub fn play_track_from_pos(&self, index: usize) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.state == EngineState::Terminated {
            return Err(PlaybackError::NotConnected);
        }

        let track = self
            .shared
            .playlist
            .read()
            .get(index)
            .ok_or(PlaybackError::NoMoreTracks)?;
        self.check_track(&track)?;

        self.ensure_worker(&mut control)?;
        Self::send(&mut control, EngineCommand::PlayIndex(index))?;
        control.state = EngineState::Playing;
        control.current = Some(track);
        Ok(())
    }

    /// Withhold emission; the position is kept
    pub fn pause(&self) -> Result<()> {
        self.command(EngineCommand::Pause, |control| match control.state {
            EngineState::Playing => Ok(EngineState::Paused),
            EngineState::Terminated => Err(PlaybackError::NotConnected),
            _ => Err(PlaybackError::NotPlaying),
        })
    }

    pub fn resume(&self) -> Result<()> {
        self.command(EngineCommand::Resume, |control| match control.state {
            EngineState::Paused => Ok(EngineState::Playing),
            EngineState::Playing => Err(PlaybackError::AlreadyPlaying),
            EngineState::Terminated => Err(PlaybackError::NotConnected),
            _ => Err(PlaybackError::NotPlaying),
        })
    }

    /// Signal the worker to stop and return immediately
    ///
    /// The worker rewinds a reusable source (or discards a one-shot one) at
    /// its next safe point and stays alive for the next `play`. Safe to call
    /// from inside any hook. Of two racing calls, exactly one succeeds; the
    /// other sees `NotPlaying`.
    pub fn stop(&self) -> Result<()> {
        let mut control = self.shared.control.lock();
        Self::require_active(&control)?;
        Self::send(&mut control, EngineCommand::Stop)?;
        control.state = EngineState::Stopped;
        control.current = None;
        debug!("stop requested");
        Ok(())
    }

    /// Jump to `offset` from the start of the current track
    ///
    /// Fails with `IllegalSeek` when the track's length is unknown, since the
    /// target could not be bounds-checked here.
    pub fn seek(&self, offset: Duration) -> Result<()> {
        self.command(EngineCommand::Seek(offset), |control| {
            Self::require_active(control)?;
            let track = Self::seekable_track(control)?;
            let Some(length) = track.duration() else {
                return Err(PlaybackError::IllegalSeek(format!(
                    "length of {} is unknown",
                    track.name()
                )));
            };
            if offset > length {
                return Err(PlaybackError::seek_out_of_range(offset, length));
            }
            Ok(control.state)
        })
    }

    /// Jump back by `amount` from the current position
    pub fn rewind(&self, amount: Duration) -> Result<()> {
        let elapsed = self.position_duration();
        self.command(EngineCommand::Rewind(amount), |control| {
            Self::require_active(control)?;
            Self::seekable_track(control)?;
            if amount > elapsed {
                return Err(PlaybackError::IllegalSeek(format!(
                    "cannot rewind {:.3}s from {:.3}s",
                    amount.as_secs_f64(),
                    elapsed.as_secs_f64()
                )));
            }
            Ok(control.state)
        })
    }

    /// Skip to the next track
    ///
    /// At the last track without looping this ends playback the same way the
    /// track running out would.
    pub fn next_track(&self) -> Result<()> {
        self.command(EngineCommand::Next, |control| {
            Self::require_active(control)?;
            Ok(control.state)
        })
    }

    pub fn previous_track(&self) -> Result<()> {
        let policy = self.shared.config.end_of_playlist;
        let has_previous = self.shared.playlist.read().previous_index(policy).is_some();
        self.command(EngineCommand::Previous, |control| {
            Self::require_active(control)?;
            if !has_previous {
                return Err(PlaybackError::NoMoreTracks);
            }
            Ok(control.state)
        })
    }

    /// Stop for good and fire `on_disconnect(Requested)`
    pub fn disconnect(&self) -> Result<()> {
        self.shutdown(DisconnectReason::Requested)
    }

    // ===== Playlist =====

    pub fn add_track(&self, track: Track) {
        self.shared.playlist.read().add_track(track);
    }

    /// Remove `track`; a playing track keeps playing to its end
    pub fn remove_track(&self, track: &Track) -> Result<Track> {
        self.shared.playlist.read().remove_track(track)
    }

    pub fn remove_track_from_pos(&self, index: usize) -> Result<Track> {
        self.shared.playlist.read().remove_at(index)
    }

    pub fn remove_all_tracks(&self) {
        self.shared.playlist.read().clear();
    }

    /// Replace the whole playlist
    ///
    /// The current track keeps playing; navigation continues from the new
    /// playlist's cursor.
    pub fn set_playlist(&self, playlist: Playlist) {
        debug!(tracks = playlist.len(), "playlist replaced");
        *self.shared.playlist.write() = playlist;
    }

    // ===== Signal Settings =====

    /// Set the global volume (0.0 to 2.0)
    pub fn set_volume(&self, level: f32) -> Result<()> {
        let volume = Volume::new(level)?;

        let mut control = self.shared.control.lock();
        if control.state == EngineState::Terminated {
            return Err(PlaybackError::NotConnected);
        }
        if control.sender.is_some() {
            Self::send(&mut control, EngineCommand::SetVolume(volume.level()))?;
        } else if let Some(parts) = control.parked.as_mut() {
            parts.volume.set_level(volume.level())?;
        }
        control.volume = volume.level();
        Ok(())
    }

    /// Silence output without forgetting the volume level
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.state == EngineState::Terminated {
            return Err(PlaybackError::NotConnected);
        }
        if control.sender.is_some() {
            Self::send(&mut control, EngineCommand::SetMuted(muted))?;
        } else if let Some(parts) = control.parked.as_mut() {
            if muted {
                parts.volume.mute();
            } else {
                parts.volume.unmute();
            }
        }
        control.muted = muted;
        Ok(())
    }

    /// Install or clear the global equalizer
    pub fn set_equalizer(&self, equalizer: Option<Box<dyn Equalizer>>) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.state == EngineState::Terminated {
            return Err(PlaybackError::NotConnected);
        }

        let profile = equalizer.as_ref().map(|eq| eq.profile());
        if control.sender.is_some() {
            Self::send(&mut control, EngineCommand::SetEqualizer(equalizer))?;
        } else if let Some(parts) = control.parked.as_mut() {
            parts.equalizer = equalizer;
        }
        control.equalizer = profile;
        Ok(())
    }

    /// Build a graphic equalizer for the engine format and install it globally
    pub fn set_equalizer_bands(&self, bands: &[EqBand]) -> Result<()> {
        let equalizer = Self::build_equalizer(self.shared.format, bands)?;
        self.set_equalizer(Some(equalizer))
    }

    // ===== Queries =====

    pub fn state(&self) -> EngineState {
        self.shared.control.lock().state
    }

    pub fn current_track(&self) -> Option<Track> {
        self.shared.control.lock().current.clone()
    }

    /// Handle to the live playlist
    pub fn playlist(&self) -> Playlist {
        self.shared.playlist.read().clone()
    }

    /// Position within the current track
    pub fn elapsed(&self) -> Duration {
        if self.shared.control.lock().current.is_none() {
            return Duration::ZERO;
        }
        self.position_duration()
    }

    /// Time left in the current track, if its length is known
    pub fn remaining(&self) -> Option<Duration> {
        let length = self.current_track()?.duration()?;
        Some(length.saturating_sub(self.elapsed()))
    }

    pub fn volume(&self) -> f32 {
        self.shared.control.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.shared.control.lock().muted
    }

    pub fn equalizer(&self) -> Option<EqualizerProfile> {
        self.shared.control.lock().equalizer.clone()
    }

    pub fn format(&self) -> PcmFormat {
        self.shared.format
    }

    pub fn frame_duration(&self) -> Duration {
        self.shared.frame_duration
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    // ===== Internals =====

    fn position_duration(&self) -> Duration {
        self.shared
            .format
            .duration_of(self.shared.position.load(Ordering::Acquire))
    }

    fn check_track(&self, track: &Track) -> Result<()> {
        track.check_layout(self.shared.format, self.shared.frame_duration)?;
        if !track.can_play() {
            return Err(PlaybackError::SourceNotReusable);
        }
        Ok(())
    }

    fn require_active(control: &Control) -> Result<()> {
        match control.state {
            EngineState::Playing | EngineState::Paused => Ok(()),
            EngineState::Terminated => Err(PlaybackError::NotConnected),
            EngineState::Idle | EngineState::Stopped => Err(PlaybackError::NotPlaying),
        }
    }

    fn seekable_track(control: &Control) -> Result<&Track> {
        let track = control.current.as_ref().ok_or(PlaybackError::NotPlaying)?;
        if !track.is_reusable() {
            return Err(PlaybackError::IllegalSeek(format!(
                "{} is not seekable",
                track.name()
            )));
        }
        Ok(track)
    }

    /// Validate, enqueue, and apply the logical transition in one critical section
    fn command(
        &self,
        command: EngineCommand,
        transition: impl FnOnce(&Control) -> Result<EngineState>,
    ) -> Result<()> {
        let mut control = self.shared.control.lock();
        let state = transition(&control)?;
        Self::send(&mut control, command)?;
        control.state = state;
        Ok(())
    }

    fn send(control: &mut Control, command: EngineCommand) -> Result<()> {
        let sender = control.sender.as_ref().ok_or(PlaybackError::NotConnected)?;
        sender
            .send(command)
            .map_err(|_| PlaybackError::NotConnected)?;
        control.in_flight += 1;
        Ok(())
    }

    /// Spawn the real-time thread unless one is running
    fn ensure_worker(&self, control: &mut Control) -> Result<()> {
        if control.sender.is_some() {
            return Ok(());
        }
        let parts = control.parked.take().ok_or(PlaybackError::NotConnected)?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = Worker::new(Self::uncounted(&self.shared), rx, parts);
        if let Err(e) = std::thread::Builder::new()
            .name("cadence-playback".to_string())
            .spawn(move || worker.run())
        {
            control.state = EngineState::Terminated;
            return Err(e.into());
        }

        control.sender = Some(tx);
        control.in_flight = 0;
        Ok(())
    }

    fn shutdown(&self, reason: DisconnectReason) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.state == EngineState::Terminated {
            return Err(PlaybackError::NotConnected);
        }

        if control.sender.is_some() {
            Self::send(&mut control, EngineCommand::Disconnect(reason))?;
            control.state = EngineState::Terminated;
            control.current = None;
            control.sender = None;
            debug!(?reason, "disconnect requested");
            return Ok(());
        }

        control.state = EngineState::Terminated;
        control.current = None;
        let parts = control.parked.take();
        drop(control);
        drop(parts);

        info!(?reason, "playback engine terminated");
        let engine = Self::uncounted(&self.shared);
        let hooks = Arc::clone(&self.shared.hooks);
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            hooks.on_disconnect(&engine, reason);
        })) {
            warn!(
                message = %crate::hooks::panic_message(panic.as_ref()),
                "on_disconnect panicked"
            );
        }
        Ok(())
    }
}

impl Clone for PlaybackEngine {
    fn clone(&self) -> Self {
        self.shared.handles.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
            counted: true,
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if !self.counted {
            return;
        }
        if self.shared.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Already terminated is fine
            let _ = self.shutdown(DisconnectReason::EngineDropped);
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let control = self.shared.control.lock();
        f.debug_struct("PlaybackEngine")
            .field("state", &control.state)
            .field("current", &control.current.as_ref().map(Track::name))
            .field("format", &self.shared.format)
            .finish()
    }
}
