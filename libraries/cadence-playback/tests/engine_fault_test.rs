//! Fault escalation, misbehaving hooks, and disconnect handling


use cadence_playback::{
    DisconnectPolicy, DisconnectReason, EngineConfig, EngineState, PlaybackEngine, PlaybackError,
    Playlist, Track, TrackMetadata,
};
use std::time::Duration;
use test_helpers::*;

const SETTLE: Duration = Duration::from_secs(3);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn has_error(log: &[Event], needle: &str) -> bool {
    log.iter()
        .any(|e| matches!(e, Event::Error(message) if message.contains(needle)))
}

// ===== Frame Faults =====

#[test]
fn test_isolated_faults_are_skipped() {
    let h = harness(test_config(), RecordingHooks::default());
    // Every third frame is corrupt; never three in a row
    let source = FaultySource::new(30, |i| i % 3 == 2);
    let track = Track::new(TrackMetadata::new("flaky"), source);

    h.engine.play(&track).unwrap();
    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Idle));

    assert_eq!(drain(&h.frames).len(), 20);
    let log = events(&h.events);
    assert!(!log.iter().any(|e| matches!(e, Event::Error(_))));
    assert_eq!(log.last(), Some(&Event::PlaylistEnd));
}

#[test]
fn test_persistent_faults_escalate_to_stopped() {
    let h = harness(test_config(), RecordingHooks::default());
    let source = FaultySource::new(100, |i| i >= 5);
    let track = Track::new(TrackMetadata::new("broken"), source);

    h.engine.play(&track).unwrap();
    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Stopped));

    // 5 good frames, then 3 tolerated faults before the 4th escalates
    assert_eq!(drain(&h.frames).len(), 5);
    let log = events(&h.events);
    assert!(has_error(&log, "bad frame 8"));
    assert!(!log.contains(&Event::PlaylistEnd));
    assert!(h.engine.current_track().is_none());

    // The worker survived and accepts the next play
    let next = ramp_track("next", ms(50));
    h.engine.play(&next).unwrap();
    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Idle));
}

#[test]
fn test_stop_from_inside_error_hook() {
    let hooks = RecordingHooks {
        stop_on_error: true,
        ..RecordingHooks::default()
    };
    let h = harness(test_config(), hooks);
    let track = Track::new(TrackMetadata::new("broken"), FaultySource::new(100, |_| true));

    h.engine.play(&track).unwrap();
    assert!(wait_for(SETTLE, || {
        events(&h.events)
            .iter()
            .any(|e| matches!(e, Event::StopInHook(_)))
    }));

    // The engine had already stopped itself; the hook's stop is a no-op
    let log = events(&h.events);
    assert!(log.contains(&Event::StopInHook(Err(PlaybackError::NotPlaying.to_string()))));
    assert_eq!(h.engine.state(), EngineState::Stopped);
}

// ===== Hooks =====

#[test]
fn test_failing_before_hook_aborts_transition() {
    let hooks = RecordingHooks {
        fail_before: Some("B"),
        ..RecordingHooks::default()
    };
    let h = harness(test_config(), hooks);
    let a = ramp_track("A", ms(100));
    let b = ramp_track("B", ms(100));
    h.engine.set_playlist(Playlist::from_tracks(vec![a.clone(), b.clone()]));

    h.engine.play(&a).unwrap();
    assert!(wait_for(SETTLE, || has_error(&events(&h.events), "before_play_next")));

    assert_eq!(h.engine.state(), EngineState::Stopped);
    assert!(h.engine.current_track().is_none());
    assert_eq!(drain(&h.frames).len(), 10);
    assert!(events(&h.events).contains(&Event::After("A".into())));
}

#[test]
fn test_panicking_after_hook_does_not_kill_worker() {
    let hooks = RecordingHooks {
        panic_after: Some("A"),
        ..RecordingHooks::default()
    };
    let h = harness(test_config(), hooks);
    let a = ramp_track("A", ms(50));
    let b = ramp_track("B", ms(50));
    h.engine.set_playlist(Playlist::from_tracks(vec![a.clone(), b.clone()]));

    h.engine.play(&a).unwrap();
    assert!(wait_for(SETTLE, || has_error(&events(&h.events), "exploded")));
    assert_eq!(h.engine.state(), EngineState::Stopped);
    assert!(!events(&h.events).contains(&Event::Before("B".into())));

    h.engine.play(&b).unwrap();
    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Idle));
    assert!(events(&h.events).contains(&Event::Before("B".into())));
}

// ===== Disconnect =====

#[test]
fn test_wait_policy_holds_until_reconnect() {
    let h = harness(test_config(), RecordingHooks::default());
    let track = ramp_track("A", ms(300));

    h.engine.play(&track).unwrap();
    assert!(wait_for(SETTLE, || h.frames.len() >= 3));
    h.sink.set_connected(false);
    std::thread::sleep(ms(30));

    let held_frames = h.frames.len();
    let held = h.engine.elapsed();
    std::thread::sleep(ms(120));
    assert_eq!(h.frames.len(), held_frames);
    assert_eq!(h.engine.elapsed(), held);
    assert_eq!(h.engine.state(), EngineState::Playing);

    h.sink.set_connected(true);
    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Idle));

    // At most the frame in flight at the moment of loss is missing
    let frames = drain(&h.frames);
    assert!(frames.len() >= 29, "only {} frames", frames.len());
    let expected = ramp_bytes(2_400);
    assert_eq!(
        frames.last().map(|f| f.payload.as_slice()),
        Some(&expected[2_400 * 2 - FRAME_BYTES..])
    );
}

#[test]
fn test_terminate_policy_ends_engine() {
    let config = EngineConfig {
        disconnect_policy: DisconnectPolicy::Terminate,
        ..test_config()
    };
    let h = harness(config, RecordingHooks::default());
    let track = ramp_track("A", ms(1_000));

    h.engine.play(&track).unwrap();
    assert!(wait_for(SETTLE, || h.frames.len() >= 2));
    h.sink.set_connected(false);

    assert!(wait_for(SETTLE, || h.engine.state() == EngineState::Terminated));
    assert!(events(&h.events).contains(&Event::Disconnect(DisconnectReason::TransportLost)));
    assert!(matches!(h.engine.play(&track), Err(PlaybackError::NotConnected)));
    assert!(matches!(h.engine.set_volume(0.5), Err(PlaybackError::NotConnected)));
}

#[test]
fn test_disconnect_while_playing() {
    let h = harness(test_config(), RecordingHooks::default());
    let track = ramp_track("A", ms(1_000));

    h.engine.play(&track).unwrap();
    h.engine.disconnect().unwrap();
    assert_eq!(h.engine.state(), EngineState::Terminated);
    assert!(matches!(h.engine.disconnect(), Err(PlaybackError::NotConnected)));
    assert!(matches!(h.engine.stop(), Err(PlaybackError::NotConnected)));

    assert!(wait_for(SETTLE, || {
        events(&h.events).contains(&Event::Disconnect(DisconnectReason::Requested))
    }));
    assert!(wait_for(SETTLE, || !h.sink.is_speaking()));
}

#[test]
fn test_disconnect_without_worker_fires_inline() {
    let h = harness(test_config(), RecordingHooks::default());
    h.engine.disconnect().unwrap();
    assert_eq!(
        events(&h.events),
        vec![Event::Disconnect(DisconnectReason::Requested)]
    );
}

#[test]
fn test_dropping_last_handle_terminates() {
    init_tracing();
    let (hooks, log) = RecordingHooks::new();
    let (sink, frames) = cadence_playback::ChannelSink::new();
    let engine = PlaybackEngine::with_hooks(test_config(), sink, hooks).unwrap();
    let track = ramp_track("A", ms(1_000));

    engine.play(&track).unwrap();
    let clone = engine.clone();
    drop(engine);
    assert!(frames.recv_timeout(SETTLE).is_ok());
    assert!(!events(&log).iter().any(|e| matches!(e, Event::Disconnect(_))));

    drop(clone);
    assert!(wait_for(SETTLE, || {
        events(&log).contains(&Event::Disconnect(DisconnectReason::EngineDropped))
    }));
}

#[test]
fn test_construction_rejects_bad_config() {
    init_tracing();
    let config = EngineConfig {
        frame_duration_ms: 25,
        ..test_config()
    };
    assert!(matches!(
        PlaybackEngine::new(config, cadence_playback::NullSink),
        Err(PlaybackError::Config(_))
    ));

    let config = EngineConfig {
        default_volume: 3.0,
        ..test_config()
    };
    assert!(PlaybackEngine::new(config, cadence_playback::NullSink).is_err());
}

#[cfg(not(feature = "opus"))]
#[test]
fn test_unavailable_encoder_fails_at_construction() {
    init_tracing();
    let config = EngineConfig {
        encoder: cadence_audio::EncoderBackend::Opus,
        ..test_config()
    };
    assert!(matches!(
        PlaybackEngine::new(config, cadence_playback::NullSink),
        Err(PlaybackError::Audio(cadence_audio::AudioError::EncoderUnavailable(_)))
    ));
}
