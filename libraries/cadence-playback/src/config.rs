//! Engine configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `CADENCE_*` environment variables
//! (e.g. `CADENCE_FRAME_DURATION_MS=40`, `CADENCE_END_OF_PLAYLIST=loop`).

use crate::error::{PlaybackError, Result};
use crate::types::{DisconnectPolicy, EndOfPlaylist};
use cadence_audio::effects::{MAX_BAND_GAIN_DB, MAX_VOLUME};
use cadence_audio::{EncoderBackend, EncoderSettings, EqBand, PcmFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frame durations the pacing loop and the Opus backend both accept (ms)
pub const SUPPORTED_FRAME_DURATIONS_MS: [u32; 4] = [10, 20, 40, 60];

/// Upper bound on the silence burst sent when emission stops
pub const MAX_TRAILING_SILENCE_FRAMES: u32 = 50;

/// Fixed per-engine settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Duration of one emitted frame
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Global volume at startup, 0.0 to 2.0
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Global equalizer bands at startup
    #[serde(default)]
    pub default_equalizer: Option<Vec<EqBand>>,

    #[serde(default)]
    pub end_of_playlist: EndOfPlaylist,

    #[serde(default)]
    pub encoder: EncoderBackend,

    /// Target bitrate for lossy backends (bits/s)
    #[serde(default = "default_opus_bitrate")]
    pub opus_bitrate: u32,

    /// Consecutive bad frames tolerated before playback stops with an error
    #[serde(default = "default_max_consecutive_faults")]
    pub max_consecutive_faults: u32,

    #[serde(default)]
    pub disconnect_policy: DisconnectPolicy,

    /// How often a waiting engine polls the sink for reconnection
    #[serde(default = "default_reconnect_poll_ms")]
    pub reconnect_poll_ms: u64,

    /// Silence frames sent when emission stops, so receivers fade out
    /// instead of interpolating from the last audio frame
    #[serde(default = "default_trailing_silence_frames")]
    pub trailing_silence_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: default_frame_duration_ms(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            default_volume: default_volume(),
            default_equalizer: None,
            end_of_playlist: EndOfPlaylist::default(),
            encoder: EncoderBackend::default(),
            opus_bitrate: default_opus_bitrate(),
            max_consecutive_faults: default_max_consecutive_faults(),
            disconnect_policy: DisconnectPolicy::default(),
            reconnect_poll_ms: default_reconnect_poll_ms(),
            trailing_silence_frames: default_trailing_silence_frames(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file and environment
    ///
    /// The file is `$CADENCE_CONFIG` if set, else `cadence.toml` in the
    /// working directory; a missing file is not an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("CADENCE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cadence.toml"));
        Self::load_from(Some(&path))
    }

    /// Load from an explicit file (if it exists) plus the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(environment());
        Self::finish(settings)
    }

    /// Parse TOML text (no environment overlay)
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::finish(
            config::Config::builder()
                .add_source(config::File::from_str(text, config::FileFormat::Toml)),
        )
    }

    fn finish(settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_FRAME_DURATIONS_MS.contains(&self.frame_duration_ms) {
            return Err(PlaybackError::Config(format!(
                "frame_duration_ms must be one of {:?}, got {}",
                SUPPORTED_FRAME_DURATIONS_MS, self.frame_duration_ms
            )));
        }

        self.format()
            .validate()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        if !self.default_volume.is_finite() || !(0.0..=MAX_VOLUME).contains(&self.default_volume) {
            return Err(PlaybackError::Config(format!(
                "default_volume must be within [0, {}], got {}",
                MAX_VOLUME, self.default_volume
            )));
        }

        if let Some(bands) = &self.default_equalizer {
            let nyquist = self.sample_rate as f32 / 2.0;
            for band in bands {
                let valid = band.frequency > 0.0
                    && band.frequency < nyquist
                    && band.gain_db.abs() <= MAX_BAND_GAIN_DB;
                if !valid {
                    return Err(PlaybackError::Config(format!(
                        "default_equalizer band {} Hz / {} dB out of range",
                        band.frequency, band.gain_db
                    )));
                }
            }
        }

        if self.max_consecutive_faults == 0 {
            return Err(PlaybackError::Config(
                "max_consecutive_faults must be at least 1".to_string(),
            ));
        }

        if self.reconnect_poll_ms == 0 {
            return Err(PlaybackError::Config(
                "reconnect_poll_ms must be at least 1".to_string(),
            ));
        }

        if self.trailing_silence_frames > MAX_TRAILING_SILENCE_FRAMES {
            return Err(PlaybackError::Config(format!(
                "trailing_silence_frames must be at most {}, got {}",
                MAX_TRAILING_SILENCE_FRAMES, self.trailing_silence_frames
            )));
        }

        Ok(())
    }

    /// Engine PCM layout
    pub fn format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.frame_duration_ms))
    }

    pub fn reconnect_poll(&self) -> Duration {
        Duration::from_millis(self.reconnect_poll_ms)
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings::new(self.format(), self.frame_duration()).with_bitrate(self.opus_bitrate)
    }
}

/// `CADENCE_*` variables; `__` would separate nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix("CADENCE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// Default values
fn default_frame_duration_ms() -> u32 {
    20
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_channels() -> u16 {
    2
}

fn default_volume() -> f32 {
    1.0
}

fn default_opus_bitrate() -> u32 {
    128_000
}

fn default_max_consecutive_faults() -> u32 {
    5
}

fn default_reconnect_poll_ms() -> u64 {
    100
}

fn default_trailing_silence_frames() -> u32 {
    5
}
