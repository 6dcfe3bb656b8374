//! Signal path tests
//!
//! Drive whole frames through conversion, equalizer, volume and encoder the
//! way the engine does, checking the guarantees callers rely on.

use cadence_audio::effects::apply_gain;
use cadence_audio::format::{f32_to_s16le, s16le_to_f32, s16le_to_i16};
use cadence_audio::{
    build_encoder, EncoderBackend, EncoderSettings, Equalizer, EqualizerPreset, GraphicEqualizer,
    PcmFormat, SubwooferEqualizer, Volume,
};
use proptest::prelude::*;
use std::time::Duration;

// ===== Test Helpers =====

const FRAME: Duration = Duration::from_millis(20);

fn run_gain(bytes: &[u8], gain: f32) -> Vec<u8> {
    let mut samples = Vec::new();
    s16le_to_f32(bytes, &mut samples);
    apply_gain(gain, &mut samples);
    let mut out = vec![0u8; bytes.len()];
    f32_to_s16le(&samples, &mut out);
    out
}

fn frame_of(value: i16, format: PcmFormat) -> Vec<u8> {
    std::iter::repeat(value)
        .take(format.frame_len(FRAME))
        .flat_map(i16::to_le_bytes)
        .collect()
}

// ===== Integration Tests =====

#[test]
fn test_overdrive_saturates_instead_of_wrapping() {
    let format = PcmFormat::STEREO_48K;
    let loud = frame_of(30_000, format);
    let quiet = frame_of(-30_000, format);

    let out = run_gain(&loud, 2.0);
    let mut samples = Vec::new();
    s16le_to_i16(&out, &mut samples);
    assert!(samples.iter().all(|&s| s == i16::MAX));

    let out = run_gain(&quiet, 2.0);
    s16le_to_i16(&out, &mut samples);
    assert!(samples.iter().all(|&s| s == i16::MIN));
}

#[test]
fn test_equalized_frame_encodes_to_full_frame() {
    let format = PcmFormat::STEREO_48K;
    let bytes = frame_of(1_000, format);
    let mut eq = GraphicEqualizer::from_preset(format, EqualizerPreset::Vocal).unwrap();
    let mut sub = SubwooferEqualizer::new(format).unwrap();
    sub.set_volume(1.5).unwrap();

    let mut samples = Vec::new();
    s16le_to_f32(&bytes, &mut samples);
    eq.process(&mut samples);
    sub.process(&mut samples);
    Volume::new(0.5).unwrap().apply(&mut samples);

    let mut pcm_bytes = vec![0u8; bytes.len()];
    f32_to_s16le(&samples, &mut pcm_bytes);
    let mut pcm = Vec::new();
    s16le_to_i16(&pcm_bytes, &mut pcm);

    let mut encoder =
        build_encoder(EncoderBackend::Pcm, &EncoderSettings::new(format, FRAME)).unwrap();
    let mut payload = Vec::new();
    encoder.encode(&pcm, &mut payload).unwrap();
    assert_eq!(payload.len(), format.frame_bytes(FRAME));
}

proptest! {
    #[test]
    fn prop_unity_gain_is_lossless(samples in prop::collection::vec(any::<i16>(), 1..2048)) {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        prop_assert_eq!(run_gain(&bytes, 1.0), bytes);
    }

    #[test]
    fn prop_zero_gain_is_silent_and_same_length(
        samples in prop::collection::vec(any::<i16>(), 1..2048)
    ) {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let out = run_gain(&bytes, 0.0);
        prop_assert_eq!(out.len(), bytes.len());
        prop_assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_output_never_exceeds_range(
        samples in prop::collection::vec(any::<i16>(), 1..512),
        gain in 0.0f32..=2.0,
    ) {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let out = run_gain(&bytes, gain);
        let mut back = Vec::new();
        s16le_to_i16(&out, &mut back);
        for (input, output) in samples.iter().zip(&back) {
            // Same sign (or silence), never wrapped around
            prop_assert!(i32::from(*input) * i32::from(*output) >= 0);
        }
    }
}
