//! Pseudo-periodic pseudo-random frames used when no real audio is heard.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

use super::FrequencyFrame;

/// Wall-clock time in milliseconds since the Unix epoch
pub fn wall_clock_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Synthetic frame generator
pub struct SyntheticSignal {
    rng: SmallRng,
}

impl SyntheticSignal {
    /// Seeded from the wall clock
    pub fn from_wall_clock() -> Self {
        Self::with_seed(wall_clock_ms() as u64)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Frame for the current wall-clock time
    pub fn next_frame(&mut self) -> FrequencyFrame {
        self.frame_at(wall_clock_ms())
    }

    /// `bin[i] = rand * 255 * (sin(t * 0.01 + i) * 0.5 + 0.5)`
    pub fn frame_at(&mut self, t_ms: f64) -> FrequencyFrame {
        let phase = t_ms * 0.01;
        FrequencyFrame::from_fn(|i| {
            let envelope = (phase + i as f64).sin() * 0.5 + 0.5;
            let noise: f64 = self.rng.gen();
            (noise * 255.0 * envelope) as u8
        })
    }
}
