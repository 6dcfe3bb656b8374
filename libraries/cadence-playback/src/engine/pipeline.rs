//! Per-frame signal path
//!
//! Fixed order: track equalizer, track volume, global equalizer, global
//! volume. Quantizing back to 16-bit saturates.

use cadence_audio::effects::apply_gain;
use cadence_audio::format::{f32_to_i16, s16le_to_f32, s16le_to_i16};
use cadence_audio::Equalizer;

/// Scratch buffers reused across frames
#[derive(Debug, Default)]
pub(crate) struct SignalPipeline {
    samples: Vec<f32>,
    pcm: Vec<i16>,
}

impl SignalPipeline {
    pub(crate) fn new(frame_len: usize) -> Self {
        Self {
            samples: Vec::with_capacity(frame_len),
            pcm: Vec::with_capacity(frame_len),
        }
    }

    /// Run one s16le frame through all layers
    pub(crate) fn process(
        &mut self,
        frame: &[u8],
        track_eq: Option<&mut Box<dyn Equalizer>>,
        track_gain: f32,
        global_eq: Option<&mut Box<dyn Equalizer>>,
        global_gain: f32,
    ) -> &[i16] {
        if track_eq.is_none() && global_eq.is_none() && track_gain == 1.0 && global_gain == 1.0 {
            s16le_to_i16(frame, &mut self.pcm);
            return &self.pcm;
        }

        s16le_to_f32(frame, &mut self.samples);
        if let Some(eq) = track_eq {
            eq.process(&mut self.samples);
        }
        apply_gain(track_gain, &mut self.samples);
        if let Some(eq) = global_eq {
            eq.process(&mut self.samples);
        }
        apply_gain(global_gain, &mut self.samples);

        self.pcm.clear();
        self.pcm.extend(self.samples.iter().map(|&s| f32_to_i16(s)));
        &self.pcm
    }
}
