//! Frequency-domain signal acquisition.
//!
//! A [`SignalSource`] produces one [`FrequencyFrame`] per visualizer tick,
//! either from the live track through an [`Analyser`] or from a
//! [`SyntheticSignal`] when real playback is unavailable.

mod analyser;
mod synthetic;

use thiserror::Error;

pub use analyser::{Analyser, SampleTap};
pub use synthetic::{wall_clock_ms, SyntheticSignal};

/// Bins per frequency frame
pub const FRAME_LEN: usize = 256;

/// Errors raised while reading a frame
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sample tap lock poisoned")]
    TapPoisoned,

    #[error("analyser unavailable: {0}")]
    Unavailable(String),
}

/// One frame of per-bin byte magnitudes
#[derive(Clone, PartialEq, Eq)]
pub struct FrequencyFrame([u8; FRAME_LEN]);

impl FrequencyFrame {
    pub fn zeroed() -> Self {
        Self([0; FRAME_LEN])
    }

    pub fn filled(value: u8) -> Self {
        Self([value; FRAME_LEN])
    }

    pub fn from_fn(f: impl FnMut(usize) -> u8) -> Self {
        Self(std::array::from_fn(f))
    }

    pub fn bins(&self) -> &[u8] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Mean magnitude of this frame
    pub fn intensity(&self) -> f32 {
        intensity(&self.0)
    }
}

impl std::fmt::Debug for FrequencyFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrequencyFrame(mean={:.1})", self.intensity())
    }
}

/// Arithmetic mean of byte magnitudes (0.0 for an empty slice)
pub fn intensity(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / bins.len() as f32
}

/// Where frames come from, chosen once when the visualizer starts
pub enum SignalSource {
    Analyser(Analyser),
    Synthetic(SyntheticSignal),
}

impl SignalSource {
    pub fn next_frame(&mut self) -> Result<FrequencyFrame, SignalError> {
        match self {
            Self::Analyser(analyser) => analyser.next_frame(),
            Self::Synthetic(synthetic) => Ok(synthetic.next_frame()),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

impl std::fmt::Debug for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyser(_) => f.write_str("SignalSource::Analyser"),
            Self::Synthetic(_) => f.write_str("SignalSource::Synthetic"),
        }
    }
}
