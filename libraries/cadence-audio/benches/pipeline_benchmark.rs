//! Per-frame cost of the signal path
//!
//! Run with: cargo bench -p cadence-audio --bench pipeline_benchmark

use cadence_audio::effects::apply_gain;
use cadence_audio::format::{f32_to_s16le, s16le_to_f32, s16le_to_i16};
use cadence_audio::{
    build_encoder, EncoderBackend, EncoderSettings, Equalizer, EqualizerPreset, GraphicEqualizer,
    PcmFormat,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::f32::consts::PI;
use std::time::Duration;

/// One 20 ms stereo frame of a 1 kHz sine, as s16le
fn sine_frame(format: PcmFormat, frame: Duration) -> Vec<u8> {
    let samples = format.samples_per_frame(frame);
    (0..samples)
        .flat_map(|i| {
            let t = i as f32 / format.sample_rate as f32;
            let v = ((2.0 * PI * 1000.0 * t).sin() * 16000.0) as i16;
            [v, v]
        })
        .flat_map(i16::to_le_bytes)
        .collect()
}

fn bench_frame_pipeline(c: &mut Criterion) {
    let format = PcmFormat::STEREO_48K;
    let frame = Duration::from_millis(20);
    let bytes = sine_frame(format, frame);

    let mut group = c.benchmark_group("frame_pipeline");
    group.throughput(Throughput::Elements(format.samples_per_frame(frame) as u64));

    group.bench_function("volume_only", |b| {
        let mut samples = Vec::new();
        let mut out = vec![0u8; bytes.len()];
        b.iter(|| {
            s16le_to_f32(black_box(&bytes), &mut samples);
            apply_gain(0.8, &mut samples);
            f32_to_s16le(&samples, &mut out);
            black_box(&out);
        });
    });

    group.bench_function("eq_10_band", |b| {
        let mut eq = GraphicEqualizer::from_preset(format, EqualizerPreset::VShape).unwrap();
        let mut samples = Vec::new();
        let mut out = vec![0u8; bytes.len()];
        b.iter(|| {
            s16le_to_f32(black_box(&bytes), &mut samples);
            eq.process(&mut samples);
            apply_gain(0.8, &mut samples);
            f32_to_s16le(&samples, &mut out);
            black_box(&out);
        });
    });

    group.bench_function("pcm_encode", |b| {
        let settings = EncoderSettings::new(format, frame);
        let mut encoder = build_encoder(EncoderBackend::Pcm, &settings).unwrap();
        let mut pcm = Vec::new();
        s16le_to_i16(&bytes, &mut pcm);
        let mut payload = Vec::new();
        b.iter(|| {
            encoder.encode(black_box(&pcm), &mut payload).unwrap();
            black_box(&payload);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_frame_pipeline);
criterion_main!(benches);
