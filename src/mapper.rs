//! Maps a frame, its intensity and the sampled palette onto the scene.

use tracing::trace;

use crate::palette::Palette;
use crate::params::ReactiveMapping;
use crate::scene::{
    BarStyle, Gradient, HeadlineStyle, ProfilePulse, ProfileStyle, RingStyle, Scene, Shadow,
};
use crate::signal::FrequencyFrame;

/// Stateless style mapper; every tick rewrites the reactive properties
#[derive(Debug, Clone, Default)]
pub struct StyleMapper {
    mapping: ReactiveMapping,
}

impl StyleMapper {
    pub fn new(mapping: ReactiveMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ReactiveMapping {
        &self.mapping
    }

    /// Value read by bar `index`: `frame[index * stride]`, or the mean when out of range
    pub fn bar_value(&self, frame: &FrequencyFrame, index: usize, intensity: f32) -> f32 {
        index
            .checked_mul(self.mapping.bar_stride)
            .and_then(|i| frame.get(i))
            .map_or(intensity, |v| v as f32)
    }

    /// `clamp(value / 255 * max, min, max)`
    pub fn bar_height(&self, value: f32) -> f32 {
        let m = &self.mapping;
        (value / 255.0 * m.bar_max_height_px).clamp(m.bar_min_height_px, m.bar_max_height_px)
    }

    /// Apply one tick
    pub fn apply(
        &self,
        frame: &FrequencyFrame,
        intensity: f32,
        palette: &Palette,
        scene: &mut Scene,
    ) {
        trace!("Mapping intensity {:.1}", intensity);
        scene.palette = *palette;

        for (index, bar) in scene.bars.iter_mut().enumerate() {
            let value = self.bar_value(frame, index, intensity);
            self.apply_bar(bar, value, palette);
        }

        if let Some(profile) = scene.profile.as_mut() {
            self.apply_profile(profile, intensity);
        }

        let m = &self.mapping;
        let particles_lit = intensity > m.particle_threshold;
        for particle in &mut scene.particles {
            if particles_lit {
                particle.beat_glow =
                    Some(Shadow::new(intensity / m.particle_glow_divisor, palette.accent));
                particle.background = Some(palette.accent);
            } else {
                particle.beat_glow = None;
                particle.background = None;
            }
        }

        if let Some(headline) = scene.headline.as_mut() {
            self.apply_headline(headline, intensity, palette);
        }

        if let Some(ring) = scene.ring.as_mut() {
            self.apply_ring(ring, intensity, palette);
        }

        if let Some(button) = scene.audio_button.as_mut() {
            button.accent = (intensity > m.ring_threshold).then_some(palette.accent);
        }

        scene.hover_particle_color = palette.accent;
    }

    fn apply_bar(&self, bar: &mut BarStyle, value: f32, palette: &Palette) {
        bar.height_px = self.bar_height(value);
        bar.gradient = if value > self.mapping.bar_swap_threshold {
            Gradient::to_top(palette.secondary, palette.primary)
        } else {
            Gradient::to_top(palette.primary, palette.secondary)
        };
    }

    fn apply_profile(&self, profile: &mut ProfileStyle, intensity: f32) {
        let m = &self.mapping;
        profile.pulse = (intensity > m.profile_threshold).then(|| ProfilePulse {
            scale: 1.0 + intensity / m.profile_scale_divisor,
            rotation_deg: intensity * m.profile_rotation_deg_per_unit,
            brightness: 1.0 + intensity / m.profile_brightness_divisor,
            saturate: 1.0 + intensity / m.profile_saturate_divisor,
        });
    }

    fn apply_headline(&self, headline: &mut HeadlineStyle, intensity: f32, palette: &Palette) {
        let m = &self.mapping;
        if intensity > m.headline_threshold {
            headline.text_shadow = vec![
                Shadow::new(5.0, palette.primary),
                Shadow::new(10.0, palette.primary),
                Shadow::new(15.0, palette.secondary),
                Shadow::new(20.0, palette.secondary),
            ];
            headline.scale = 1.0 + intensity / m.headline_scale_divisor;
        } else {
            headline.text_shadow = vec![
                Shadow::new(3.0, palette.primary),
                Shadow::new(6.0, palette.primary),
                Shadow::new(9.0, palette.primary),
            ];
            headline.scale = 1.0;
        }
    }

    fn apply_ring(&self, ring: &mut RingStyle, intensity: f32, palette: &Palette) {
        let m = &self.mapping;
        if intensity > m.ring_threshold {
            ring.gradient =
                Gradient::diagonal(vec![palette.primary, palette.accent, palette.secondary]);
            ring.glow = Some(Shadow::new(intensity / m.ring_glow_divisor, palette.accent));
            ring.pulse_period_s = Some(m.ring_period_s(intensity));
        } else {
            ring.gradient = Gradient::diagonal(vec![palette.primary, palette.secondary]);
            ring.glow = None;
            ring.pulse_period_s = None;
        }
    }
}
