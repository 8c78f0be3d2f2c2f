use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::audio::spectrum::{LogShape, SpectrumMode};
use crate::error::ConfigError;

pub const DEFAULT_FRAME_SIZE: usize = 1024;
// 16 ~ 60fps | 32 ~ 30fps | 64 ~ 15fps
pub const DEFAULT_FRAME_DELAY_MS: u64 = 64;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_FFT_BINS: usize = 64;
pub const DEFAULT_PLAY_DELAY_MS: u64 = 10;
pub const DEFAULT_LOG_GAIN: f32 = 15.0;
pub const DEFAULT_LOG_POWER: f32 = 0.8;

/// Top-level file configuration (`musicreader.toml`).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReaderConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    /// Rate used to map playback time to frames. `None` trusts the decoder.
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default = "default_fft_bins")]
    pub fft_bins: usize,
    /// Grace period between a successful load and auto-play.
    #[serde(default = "default_play_delay_ms")]
    pub play_delay_ms: u64,
    #[serde(default = "default_true")]
    pub normalized: bool,
    #[serde(default = "default_true")]
    pub play_on_load: bool,
    #[serde(default)]
    pub spectrum_mode: Option<SpectrumMode>,
    #[serde(default = "default_log_gain")]
    pub log_gain: f32,
    #[serde(default = "default_log_power")]
    pub log_power: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            frame_delay_ms: default_frame_delay_ms(),
            sample_rate: None,
            fft_bins: default_fft_bins(),
            play_delay_ms: default_play_delay_ms(),
            normalized: default_true(),
            play_on_load: default_true(),
            spectrum_mode: None,
            log_gain: default_log_gain(),
            log_power: default_log_power(),
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(ConfigError::FrameSize(self.frame_size));
        }
        let max = self.frame_size / 2;
        if self.fft_bins == 0 || self.fft_bins > max {
            return Err(ConfigError::FftBins { bins: self.fft_bins, max });
        }
        if self.frame_delay_ms == 0 {
            return Err(ConfigError::FrameDelay);
        }
        if !(self.log_gain > 0.0) {
            return Err(ConfigError::LogShape { name: "gain", value: self.log_gain });
        }
        if !(self.log_power > 0.0) {
            return Err(ConfigError::LogShape { name: "power", value: self.log_power });
        }
        Ok(())
    }

    /// Explicit mode if configured, otherwise `Log10` when normalized and `Raw` when not.
    pub fn spectrum_mode(&self) -> SpectrumMode {
        self.spectrum_mode.unwrap_or(if self.normalized {
            SpectrumMode::Log10
        } else {
            SpectrumMode::Raw
        })
    }

    pub fn log_shape(&self) -> LogShape {
        LogShape {
            gain: self.log_gain,
            power: self.log_power,
        }
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn play_delay(&self) -> Duration {
        Duration::from_millis(self.play_delay_ms)
    }

    /// Sample rate the playback mapper should use for a track decoded at `decoded`.
    pub fn mapping_rate(&self, decoded: u32) -> u32 {
        match self.sample_rate {
            Some(rate) => rate,
            None if decoded > 0 => decoded,
            None => DEFAULT_SAMPLE_RATE,
        }
    }
}

fn default_frame_size() -> usize { DEFAULT_FRAME_SIZE }
fn default_frame_delay_ms() -> u64 { DEFAULT_FRAME_DELAY_MS }
fn default_fft_bins() -> usize { DEFAULT_FFT_BINS }
fn default_play_delay_ms() -> u64 { DEFAULT_PLAY_DELAY_MS }
fn default_true() -> bool { true }
fn default_log_gain() -> f32 { DEFAULT_LOG_GAIN }
fn default_log_power() -> f32 { DEFAULT_LOG_POWER }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.frame_size, 1024);
        assert_eq!(cfg.fft_bins, 64);
        assert_eq!(cfg.play_delay_ms, 10);
        assert_eq!(cfg.log_gain, 15.0);
        assert_eq!(cfg.log_power, 0.8);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.spectrum_mode(), SpectrumMode::Log10);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [reader]
            frame_delay_ms = 16
            normalized = false
            sample_rate = 48000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reader.frame_delay_ms, 16);
        assert_eq!(cfg.reader.frame_size, 1024);
        assert_eq!(cfg.reader.spectrum_mode(), SpectrumMode::Raw);
        assert_eq!(cfg.reader.mapping_rate(44100), 48000);
    }

    #[test]
    fn explicit_mode_wins_over_normalized_flag() {
        let cfg: Config = toml::from_str(
            r#"
            [reader]
            spectrum_mode = "natural-log"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reader.spectrum_mode(), SpectrumMode::NaturalLog);
    }

    #[test]
    fn mapping_rate_prefers_decoder_then_default() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.mapping_rate(48000), 48000);
        assert_eq!(cfg.mapping_rate(0), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn rejects_invalid_shapes() {
        let mut cfg = ReaderConfig { frame_size: 1000, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::FrameSize(1000))));

        cfg.frame_size = 256;
        cfg.fft_bins = 129;
        assert!(matches!(cfg.validate(), Err(ConfigError::FftBins { max: 128, .. })));

        cfg.fft_bins = 128;
        cfg.log_gain = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::LogShape { name: "gain", .. })));

        cfg.log_gain = 15.0;
        cfg.frame_delay_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::FrameDelay)));
    }
}
