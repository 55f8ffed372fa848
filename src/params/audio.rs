//! Audio analysis and playback configuration.

use serde::{Deserialize, Serialize};

use crate::signal::FRAME_LEN;

/// Analyser configuration (mirrors a browser analyser node)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT window size (must be power of 2, half of it must equal the frame length)
    pub fft_size: usize,

    /// Time smoothing between successive frames (0.0 = none, 1.0 = frozen)
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (dB)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dB)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.bin_count() != FRAME_LEN {
            return Err(format!(
                "FFT size {} yields {} bins, frames hold {}",
                self.fft_size,
                self.bin_count(),
                FRAME_LEN
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(format!("Smoothing must be in 0..=1, got {}", self.smoothing));
        }
        if self.min_decibels >= self.max_decibels {
            return Err("min_decibels must be below max_decibels".to_string());
        }
        Ok(())
    }
}

/// Background track playback and synthetic fallback tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Track volume applied before every play attempt (0.0 - 1.0)
    pub volume: f32,

    /// Delay before checking that playback really started (milliseconds)
    pub verify_after_ms: u64,

    /// Synthetic frame interval (milliseconds, = 20 Hz)
    pub synthetic_interval_ms: u64,

    /// Synthetic tone frequency (Hz)
    pub tone_hz: f32,

    /// Synthetic tone gain (linear)
    pub tone_gain: f32,

    /// Start the track when the visitor enters the site
    pub autoplay_on_entry: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 0.5,
            verify_after_ms: 1000,
            synthetic_interval_ms: 50,
            tone_hz: 60.0,
            tone_gain: 0.1,
            autoplay_on_entry: true,
        }
    }
}

/// Audio constants (compile-time, match Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per buffer)
    pub const BLOCK_SIZE: usize = 128;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyser_matches_frame_length() {
        let config = AnalyserConfig::default();
        assert_eq!(config.bin_count(), FRAME_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_analyser_rejects_bad_sizes() {
        let config = AnalyserConfig {
            fft_size: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyserConfig {
            fft_size: 1024,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
