//! Timings for one-shot transitions and decorative periodic effects.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session timings (milliseconds) and decorative probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimings {
    /// Landing fade-out before it is removed
    pub landing_fade_ms: u64,

    /// Gap between showing main content and making it visible
    pub reveal_delay_ms: u64,

    /// Stagger between entry animations of content groups
    pub entry_stagger_ms: u64,

    /// Entry transition length
    pub entry_transition_ms: u64,

    /// Entry slide distance (pixels)
    pub entry_offset_px: f32,

    /// Delay before the system cursor is hidden
    pub cursor_hide_delay_ms: u64,

    /// Per-particle delay before floating starts
    pub float_stagger_ms: u64,

    /// Shortest float cycle; the longest adds the same again
    pub float_min_duration_ms: u64,

    /// Ambient twinkle interval
    pub twinkle_interval_ms: u64,

    /// Probability that a particle twinkles per interval
    pub twinkle_chance: f64,

    /// Twinkle length
    pub twinkle_ms: u64,

    /// Glitch/pulse roll interval
    pub glitch_interval_ms: u64,

    /// Probability of a headline glitch per roll
    pub glitch_chance: f64,

    /// Headline glitch length
    pub glitch_ms: u64,

    /// Probability of a social link pulse per roll
    pub pulse_chance: f64,

    /// Social link pulse length
    pub pulse_ms: u64,

    /// Particles spawned per social link hover
    pub hover_burst_count: usize,

    /// Hover particle travel distance (pixels)
    pub hover_burst_distance_px: f32,

    /// Hover particle lifetime
    pub hover_burst_ms: u64,

    /// Clicks that trigger the hue rotation
    pub rainbow_clicks: u32,

    /// Hue rotation step interval
    pub rainbow_step_ms: u64,

    /// Hue rotation step (degrees)
    pub rainbow_step_deg: f32,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            landing_fade_ms: 1000,
            reveal_delay_ms: 100,
            entry_stagger_ms: 200,
            entry_transition_ms: 800,
            entry_offset_px: 30.0,
            cursor_hide_delay_ms: 1000,
            float_stagger_ms: 1000,
            float_min_duration_ms: 4000,
            twinkle_interval_ms: 2000,
            twinkle_chance: 0.3,
            twinkle_ms: 200,
            glitch_interval_ms: 1000,
            glitch_chance: 0.05,
            glitch_ms: 300,
            pulse_chance: 0.02,
            pulse_ms: 600,
            hover_burst_count: 5,
            hover_burst_distance_px: 50.0,
            hover_burst_ms: 800,
            rainbow_clicks: 10,
            rainbow_step_ms: 50,
            rainbow_step_deg: 5.0,
        }
    }
}

impl SessionTimings {
    /// Probabilities must lie in 0..=1 and self-rescheduling intervals must be non-zero
    pub fn validate(&self) -> Result<(), String> {
        let chances = [
            ("twinkle_chance", self.twinkle_chance),
            ("glitch_chance", self.glitch_chance),
            ("pulse_chance", self.pulse_chance),
        ];
        for (name, p) in chances {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{} must be within 0..=1, got {}", name, p));
            }
        }

        let intervals = [
            ("twinkle_interval_ms", self.twinkle_interval_ms),
            ("glitch_interval_ms", self.glitch_interval_ms),
            ("rainbow_step_ms", self.rainbow_step_ms),
        ];
        for (name, interval) in intervals {
            if interval == 0 {
                return Err(format!("{} must be non-zero", name));
            }
        }
        Ok(())
    }
}

/// Millisecond field to `Duration`
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
