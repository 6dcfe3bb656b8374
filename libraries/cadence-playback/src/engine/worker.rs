//! Real-time worker thread
//!
//! The only place engine state actually changes. Commands are drained at
//! two safe points: while blocked waiting for work (paused, stopped) and
//! during the pacing wait between frames. Hooks are invoked here with no
//! engine lock held.

use super::clock::FrameClock;
use super::command::EngineCommand;
use super::pipeline::SignalPipeline;
use super::{PlaybackEngine, Shared};
use crate::error::PlaybackError;
use crate::hooks::{panic_message, HookResult, PlayerHooks};
use crate::playlist::Playlist;
use crate::sink::{EncodedFrame, FrameStamp, TransportSink};
use crate::track::{Track, TrackId};
use crate::types::{DisconnectPolicy, DisconnectReason, EngineState};
use cadence_audio::{AudioError, Encoder, Equalizer, FaultKind, PcmFormat, Volume};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything that outlives one worker thread
///
/// Parked in the engine while no worker runs, so the next `play` resumes
/// with the same sink, encoder state, and sequence numbering.
pub(crate) struct Parts {
    pub(crate) sink: Box<dyn TransportSink>,
    pub(crate) encoder: Box<dyn Encoder>,
    pub(crate) equalizer: Option<Box<dyn Equalizer>>,
    pub(crate) volume: Volume,
    pub(crate) stamp: FrameStamp,
}

impl Parts {
    pub(crate) fn new(
        sink: Box<dyn TransportSink>,
        encoder: Box<dyn Encoder>,
        equalizer: Option<Box<dyn Equalizer>>,
        volume: Volume,
    ) -> Self {
        Self {
            sink,
            encoder,
            equalizer,
            volume,
            stamp: FrameStamp::default(),
        }
    }
}

enum Flow {
    Continue,
    Exit(DisconnectReason),
}

pub(crate) struct Worker {
    /// Uncounted handle handed to hooks
    engine: PlaybackEngine,
    shared: Arc<Shared>,
    commands: Receiver<EngineCommand>,
    parts: Parts,
    state: EngineState,
    current: Option<Track>,
    format: PcmFormat,
    samples_per_frame: u32,
    clock: FrameClock,
    pipeline: SignalPipeline,
    frame: Vec<u8>,
    payload: Vec<u8>,
    faults: u32,
    /// Track of the last audio frame, stamped on trailing silence
    last_emitted: Option<TrackId>,
}

impl Worker {
    pub(crate) fn new(
        engine: PlaybackEngine,
        commands: Receiver<EngineCommand>,
        parts: Parts,
    ) -> Self {
        let shared = Arc::clone(&engine.shared);
        let format = shared.format;
        let frame = shared.frame_duration;
        let samples_per_frame = u32::try_from(format.samples_per_frame(frame)).unwrap_or(u32::MAX);

        Self {
            engine,
            commands,
            parts,
            state: EngineState::Stopped,
            current: None,
            format,
            samples_per_frame,
            clock: FrameClock::new(frame),
            pipeline: SignalPipeline::new(format.frame_len(frame)),
            frame: vec![0; format.frame_bytes(frame)],
            payload: Vec::new(),
            faults: 0,
            last_emitted: None,
            shared,
        }
    }

    pub(crate) fn run(mut self) {
        info!(format = %self.format, "playback worker started");

        loop {
            let flow = match self.state {
                EngineState::Playing => self.produce_frame(),
                EngineState::Idle => {
                    // Park the parts and exit unless a command is still on its way
                    let shared = Arc::clone(&self.shared);
                    let mut control = shared.control.lock();
                    if control.in_flight == 0 {
                        control.state = EngineState::Idle;
                        control.current = None;
                        control.sender = None;
                        control.parked = Some(self.parts);
                        info!("playback worker retired");
                        return;
                    }
                    drop(control);
                    self.wait_for_command()
                }
                _ => self.wait_for_command(),
            };

            if let Flow::Exit(reason) = flow {
                self.terminate(reason);
                return;
            }
        }
    }

    // ===== Lifecycle =====

    fn terminate(mut self, reason: DisconnectReason) {
        self.clear_current();
        self.enter(EngineState::Terminated);
        {
            let mut control = self.shared.control.lock();
            control.state = EngineState::Terminated;
            control.current = None;
            control.sender = None;
            control.parked = None;
        }
        info!(?reason, "playback worker terminated");
        self.notify("on_disconnect", |hooks, engine| hooks.on_disconnect(engine, reason));
    }

    fn enter(&mut self, state: EngineState) {
        if self.state == state {
            return;
        }
        let was_playing = self.state == EngineState::Playing;
        self.state = state;

        if state == EngineState::Playing {
            self.clock.restart();
            self.parts.sink.set_speaking(true);
        } else if was_playing {
            self.trailing_silence();
            self.parts.sink.set_speaking(false);
        }
        debug!(?state, "worker state");
    }

    /// Mirror worker state into the caller-visible control block
    ///
    /// Skipped while commands are queued: callers already see the state
    /// those commands will produce.
    fn publish(&self) {
        let mut control = self.shared.control.lock();
        if control.in_flight == 0 {
            control.state = self.state;
            control.current = self.current.clone();
        }
    }

    fn acknowledge(&self) {
        let mut control = self.shared.control.lock();
        control.in_flight = control.in_flight.saturating_sub(1);
        if control.in_flight == 0 {
            control.state = self.state;
            control.current = self.current.clone();
        }
    }

    // ===== Commands =====

    fn wait_for_command(&mut self) -> Flow {
        match self.commands.recv() {
            Ok(command) => self.dispatch(command),
            Err(_) => Flow::Exit(DisconnectReason::EngineDropped),
        }
    }

    /// Sleep until `deadline`, applying commands as they arrive
    fn wait_until(&mut self, deadline: Instant) -> Flow {
        loop {
            match self.commands.recv_deadline(deadline) {
                Ok(command) => {
                    if let Flow::Exit(reason) = self.dispatch(command) {
                        return Flow::Exit(reason);
                    }
                    if self.state != EngineState::Playing {
                        return Flow::Continue;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Flow::Continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Flow::Exit(DisconnectReason::EngineDropped)
                }
            }
        }
    }

    fn dispatch(&mut self, command: EngineCommand) -> Flow {
        let flow = self.apply(command);
        self.acknowledge();
        flow
    }

    fn apply(&mut self, command: EngineCommand) -> Flow {
        debug!(?command, "applying command");

        match command {
            EngineCommand::Play(track) => {
                let playlist = self.playlist();
                let index = playlist.add_if_absent(&track);
                if let Err(e) = playlist.select(index) {
                    warn!(error = %e, "could not move cursor to played track");
                }
                self.change_track(Some(track), true);
            }
            EngineCommand::PlayIndex(index) => match self.playlist().select(index) {
                Ok(track) => self.change_track(Some(track), true),
                Err(e) => warn!(index, error = %e, "track vanished before it could start"),
            },
            EngineCommand::Pause => {
                if self.state == EngineState::Playing {
                    self.enter(EngineState::Paused);
                }
            }
            EngineCommand::Resume => {
                if self.state == EngineState::Paused {
                    self.enter(EngineState::Playing);
                }
            }
            EngineCommand::Stop => {
                if self.state.is_active() {
                    info!("playback stopped");
                    self.clear_current();
                    self.enter(EngineState::Stopped);
                }
            }
            EngineCommand::Seek(offset) => self.seek_to(offset),
            EngineCommand::Rewind(amount) => {
                let position = self.shared.position.load(Ordering::Acquire);
                let elapsed = self.format.duration_of(position);
                match elapsed.checked_sub(amount) {
                    Some(target) => self.seek_to(target),
                    None => warn!(?amount, ?elapsed, "rewind past start ignored"),
                }
            }
            EngineCommand::Next => {
                if self.state.is_active() {
                    let next = self.playlist().advance(self.shared.config.end_of_playlist);
                    self.change_track(next, false);
                }
            }
            EngineCommand::Previous => {
                if self.state.is_active() {
                    match self.playlist().retreat(self.shared.config.end_of_playlist) {
                        Some(track) => self.change_track(Some(track), false),
                        None => warn!("no previous track"),
                    }
                }
            }
            EngineCommand::SetVolume(level) => {
                if let Err(e) = self.parts.volume.set_level(level) {
                    warn!(level, error = %e, "volume rejected");
                }
            }
            EngineCommand::SetMuted(true) => self.parts.volume.mute(),
            EngineCommand::SetMuted(false) => self.parts.volume.unmute(),
            EngineCommand::SetEqualizer(equalizer) => self.parts.equalizer = equalizer,
            EngineCommand::Disconnect(reason) => return Flow::Exit(reason),
        }

        Flow::Continue
    }

    fn seek_to(&mut self, offset: Duration) {
        let Some(track) = self.current.clone() else {
            return;
        };
        let position = self.format.position_at(offset);

        track.mark_consumed();
        let result = track.lock_source().seek(position);
        match result {
            Ok(()) => {
                track.reset_equalizer();
                if let Some(eq) = self.parts.equalizer.as_mut() {
                    eq.reset();
                }
                self.shared.position.store(position, Ordering::Release);
                self.clock.restart();
                debug!(?offset, position, "seeked");
            }
            Err(e) => {
                warn!(?offset, error = %e, "seek failed");
                self.notify("on_player_error", |hooks, engine| {
                    hooks.on_player_error(engine, &e);
                });
            }
        }
    }

    // ===== Track Transitions =====

    fn playlist(&self) -> Playlist {
        self.shared.playlist.read().clone()
    }

    /// Finish the current track and start `next`, or end the playlist
    ///
    /// `resume` forces `Playing`; otherwise a paused engine stays paused.
    fn change_track(&mut self, next: Option<Track>, resume: bool) {
        if let Some(previous) = self.current.take() {
            self.shared.position.store(0, Ordering::Release);
            let result = self.transition_hook("after_play_next", &previous, |hooks, engine, t| {
                hooks.after_play_next(engine, t)
            });
            if let Err(e) = previous.release() {
                debug!(track = %previous.name(), error = %e, "finished track not rewound");
            }
            if let Err(e) = result {
                self.escalate(e);
                return;
            }
        }

        match next {
            Some(track) => self.start(track, resume),
            None => self.end_of_playlist(),
        }
    }

    fn start(&mut self, track: Track, resume: bool) {
        let prepared = track
            .check_layout(self.format, self.shared.frame_duration)
            .and_then(|()| track.prepare());
        if let Err(e) = prepared {
            self.escalate(e);
            return;
        }

        self.current = Some(track.clone());
        self.shared.position.store(0, Ordering::Release);
        self.faults = 0;
        self.parts.encoder.reset();
        if let Some(eq) = self.parts.equalizer.as_mut() {
            eq.reset();
        }

        let result = self.transition_hook("before_play_next", &track, |hooks, engine, t| {
            hooks.before_play_next(engine, t)
        });
        if let Err(e) = result {
            self.escalate(e);
            return;
        }

        info!(track = %track.name(), id = %track.id(), "now playing");
        if resume || self.state != EngineState::Paused {
            self.enter(EngineState::Playing);
        }
        self.publish();
    }

    fn end_of_playlist(&mut self) {
        info!("end of playlist");
        self.clear_current();
        self.enter(EngineState::Idle);
        self.publish();
        self.notify("on_playlist_end", |hooks, engine| hooks.on_playlist_end(engine));
    }

    fn clear_current(&mut self) {
        if let Some(track) = self.current.take() {
            if let Err(e) = track.release() {
                debug!(track = %track.name(), error = %e, "track not rewound");
            }
        }
        self.shared.position.store(0, Ordering::Release);
        self.faults = 0;
    }

    /// Stop on an unrecoverable fault and tell the host
    fn escalate(&mut self, error: PlaybackError) {
        error!(error = %error, "playback stopped on error");
        self.clear_current();
        self.enter(EngineState::Stopped);
        self.publish();
        self.notify("on_player_error", |hooks, engine| hooks.on_player_error(engine, &error));
    }

    // ===== Frame Production =====

    fn produce_frame(&mut self) -> Flow {
        if !self.parts.sink.is_connected() {
            return self.transport_lost();
        }
        let Some(track) = self.current.clone() else {
            self.enter(EngineState::Stopped);
            self.publish();
            return Flow::Continue;
        };

        track.mark_consumed();
        let read = {
            let mut source = track.lock_source();
            let read = source.read_frame(&mut self.frame);
            self.shared.position.store(source.position(), Ordering::Release);
            read
        };

        let encoded = match read {
            Ok(0) => Ok(0),
            Ok(n) => self.encode(&track, n).map(|()| n),
            Err(e) => Err(e),
        };

        match encoded {
            Ok(0) => {
                debug!(track = %track.name(), "end of track");
                let next = self.playlist().advance(self.shared.config.end_of_playlist);
                self.change_track(next, false);
                return Flow::Continue;
            }
            Ok(_) => {
                self.faults = 0;
                self.emit(&track);
            }
            Err(e) => {
                if let Some(fault) = self.record_fault(e) {
                    self.escalate(fault);
                    return Flow::Continue;
                }
            }
        }

        let deadline = self.clock.next_deadline();
        self.wait_until(deadline)
    }

    fn encode(&mut self, track: &Track, len: usize) -> crate::error::Result<()> {
        let frame = &self.frame[..len];
        if track.is_pre_encoded() {
            self.payload.clear();
            self.payload.extend_from_slice(frame);
            return Ok(());
        }

        let mut track_eq = track.lock_equalizer();
        let pcm = self.pipeline.process(
            frame,
            track_eq.as_mut(),
            track.gain(),
            self.parts.equalizer.as_mut(),
            self.parts.volume.gain(),
        );
        self.parts.encoder.encode(pcm, &mut self.payload)?;
        Ok(())
    }

    fn emit(&mut self, track: &Track) {
        let payload = std::mem::take(&mut self.payload);
        self.send(track.id(), payload);
        self.last_emitted = Some(track.id());
    }

    fn send(&mut self, track: TrackId, payload: Vec<u8>) {
        let (sequence, timestamp) = self.parts.stamp.next(self.samples_per_frame);
        let frame = EncodedFrame {
            sequence,
            timestamp,
            track,
            payload,
        };
        if let Err(e) = self.parts.sink.send_frame(frame) {
            warn!(sequence, error = %e, "sink rejected frame");
        }
    }

    /// Burst of encoder silence after the last audio frame
    ///
    /// Sent back to back rather than paced; skipped when nothing was emitted
    /// or the transport is gone.
    fn trailing_silence(&mut self) {
        let Some(track) = self.last_emitted.take() else {
            return;
        };
        if !self.parts.sink.is_connected() {
            return;
        }
        let count = self.shared.config.trailing_silence_frames;
        for _ in 0..count {
            let payload = self.parts.encoder.silence_frame();
            self.send(track, payload);
        }
        if count > 0 {
            debug!(count, "trailing silence sent");
        }
    }

    /// Count a per-frame fault; returns the error to escalate once tolerance runs out
    fn record_fault(&mut self, error: PlaybackError) -> Option<PlaybackError> {
        self.faults += 1;
        let consecutive = self.faults;

        if let PlaybackError::Audio(AudioError::Encode { kind, message }) = &error {
            let fatal = *kind == FaultKind::Fatal;
            if fatal || consecutive > self.shared.config.max_consecutive_faults {
                return Some(PlaybackError::EncoderFault {
                    kind: *kind,
                    consecutive,
                    message: message.clone(),
                });
            }
        } else if consecutive > self.shared.config.max_consecutive_faults {
            return Some(error);
        }

        warn!(consecutive, error = %error, "frame skipped");
        None
    }

    fn transport_lost(&mut self) -> Flow {
        match self.shared.config.disconnect_policy {
            DisconnectPolicy::Terminate => {
                warn!("transport lost, terminating");
                Flow::Exit(DisconnectReason::TransportLost)
            }
            DisconnectPolicy::Wait => {
                debug!("transport unavailable, holding emission");
                let deadline = Instant::now() + self.shared.config.reconnect_poll();
                let flow = self.wait_until(deadline);
                self.clock.restart();
                flow
            }
        }
    }

    // ===== Hooks =====

    fn transition_hook(
        &self,
        hook: &'static str,
        track: &Track,
        call: impl FnOnce(&dyn PlayerHooks, &PlaybackEngine, &Track) -> HookResult,
    ) -> crate::error::Result<()> {
        let hooks = Arc::clone(&self.shared.hooks);
        let outcome =
            catch_unwind(AssertUnwindSafe(|| call(hooks.as_ref(), &self.engine, track)));
        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };
        warn!(hook, track = %track.name(), %message, "hook aborted transition");
        Err(PlaybackError::Hook { hook, message })
    }

    fn notify(&self, hook: &'static str, call: impl FnOnce(&dyn PlayerHooks, &PlaybackEngine)) {
        let hooks = Arc::clone(&self.shared.hooks);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| call(hooks.as_ref(), &self.engine))) {
            error!(hook, message = %panic_message(panic.as_ref()), "hook panicked");
        }
    }
}
