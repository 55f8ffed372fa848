//! Intensity-to-style mapping constants.
//!
//! Every reactive element has its own threshold and linear scale. Intensity
//! is the mean byte magnitude of a frame, so all thresholds live in 0..=255.

use serde::{Deserialize, Serialize};

/// Mapping from intensity to visual properties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveMapping {
    /// Frame index step between neighbouring bars
    pub bar_stride: usize,

    /// Resting bar height (pixels)
    pub bar_min_height_px: f32,

    /// Full-scale bar height (pixels)
    pub bar_max_height_px: f32,

    /// Bar value above which the gradient direction flips
    pub bar_swap_threshold: f32,

    /// Profile picture pulse threshold
    pub profile_threshold: f32,

    /// Formula: scale = 1 + I / this
    pub profile_scale_divisor: f32,

    /// Formula: rotation_deg = I * this
    pub profile_rotation_deg_per_unit: f32,

    /// Formula: brightness = 1 + I / this
    pub profile_brightness_divisor: f32,

    /// Formula: saturate = 1 + I / this
    pub profile_saturate_divisor: f32,

    /// Particle glow threshold
    pub particle_threshold: f32,

    /// Formula: glow_px = I / this
    pub particle_glow_divisor: f32,

    /// Headline glow threshold
    pub headline_threshold: f32,

    /// Formula: scale = 1 + I / this
    pub headline_scale_divisor: f32,

    /// Ring glow threshold (also drives the audio button accent)
    pub ring_threshold: f32,

    /// Formula: glow_px = I / this
    pub ring_glow_divisor: f32,

    /// Ring spin period at rest (seconds)
    pub ring_base_period_s: f32,

    /// Fastest ring spin period (seconds)
    pub ring_min_period_s: f32,
}

impl Default for ReactiveMapping {
    fn default() -> Self {
        Self {
            bar_stride: 10,
            bar_min_height_px: 20.0,
            bar_max_height_px: 80.0,
            bar_swap_threshold: 150.0,
            profile_threshold: 100.0,
            profile_scale_divisor: 2550.0,
            profile_rotation_deg_per_unit: 0.02,
            profile_brightness_divisor: 1000.0,
            profile_saturate_divisor: 500.0,
            particle_threshold: 120.0,
            particle_glow_divisor: 10.0,
            headline_threshold: 100.0,
            headline_scale_divisor: 5100.0,
            ring_threshold: 100.0,
            ring_glow_divisor: 8.0,
            ring_base_period_s: 4.0,
            ring_min_period_s: 1.0,
        }
    }
}

impl ReactiveMapping {
    /// Ring spin period for a given intensity (faster when louder)
    pub fn ring_period_s(&self, intensity: f32) -> f32 {
        let span = self.ring_base_period_s - self.ring_min_period_s;
        (self.ring_base_period_s - span * intensity / 255.0).max(self.ring_min_period_s)
    }
}
