//! Parameter definitions with units and documented semantics.
//!
//! All tuning constants are extracted here with:
//! - Units (pixels, milliseconds, Hz, etc.)
//! - Documented ranges and meanings
//! - Serde defaults so a partial TOML file overrides only what it names

mod audio;
mod render;
mod session;
mod visual;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig, PlaybackConfig};
pub use render::{AssetPaths, RenderConfig, SceneConfig};
pub use session::{ms, SessionTimings};
pub use visual::ReactiveMapping;

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete page configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub analyser: AnalyserConfig,
    pub playback: PlaybackConfig,
    pub mapping: ReactiveMapping,
    pub timings: SessionTimings,
    pub render: RenderConfig,
    pub scene: SceneConfig,
    pub assets: AssetPaths,
}

impl PageConfig {
    /// Load a TOML config file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyser.validate().map_err(ConfigError::Invalid)?;
        self.timings.validate().map_err(ConfigError::Invalid)?;
        if self.mapping.bar_stride == 0 {
            return Err(ConfigError::Invalid("bar_stride must be non-zero".to_string()));
        }
        if self.mapping.bar_min_height_px > self.mapping.bar_max_height_px {
            return Err(ConfigError::Invalid(
                "bar_min_height_px exceeds bar_max_height_px".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mapping]\nbar_stride = 4\n\n[scene]\nbar_count = 3").unwrap();

        let config = PageConfig::load(file.path()).unwrap();
        assert_eq!(config.mapping.bar_stride, 4);
        assert_eq!(config.scene.bar_count, 3);
        assert_eq!(config.mapping.bar_max_height_px, 80.0);
        assert_eq!(config.analyser.fft_size, 512);
    }

    #[test]
    fn test_invalid_fft_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analyser]\nfft_size = 300").unwrap();

        let err = PageConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    fn load_str(text: &str) -> Result<PageConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        PageConfig::load(file.path())
    }

    #[test]
    fn test_chance_outside_unit_range_rejected() {
        for text in [
            "[timings]\ntwinkle_chance = 1.5",
            "[timings]\nglitch_chance = -0.1",
            "[timings]\npulse_chance = 2.0",
        ] {
            assert!(matches!(load_str(text), Err(ConfigError::Invalid(_))), "{}", text);
        }
        assert!(load_str("[timings]\ntwinkle_chance = 1.0").is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        for text in [
            "[timings]\ntwinkle_interval_ms = 0",
            "[timings]\nglitch_interval_ms = 0",
            "[timings]\nrainbow_step_ms = 0",
        ] {
            assert!(matches!(load_str(text), Err(ConfigError::Invalid(_))), "{}", text);
        }
    }

    #[test]
    fn test_zero_bar_stride_rejected() {
        let err = load_str("[mapping]\nbar_stride = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PageConfig::load(Path::new("/nonexistent/pulsepage.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
