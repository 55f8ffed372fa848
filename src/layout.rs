//! Scene to draw-list conversion.
//!
//! Every element becomes one or more rounded, optionally glowing quads in
//! window pixel coordinates. The draw list is back-to-front.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::f32::consts::TAU;

use crate::palette::Color;
use crate::scene::{Background, EntryStyle, Scene, CURSOR_SIZE_PX};
use crate::session::{HoverTarget, Target};

/// Per-instance data for the quad pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Quad {
    /// Center (pixels, origin top-left)
    pub center: [f32; 2],
    /// Full width and height (pixels)
    pub size: [f32; 2],
    /// Linear RGBA at the bottom (or only) edge
    pub color_a: [f32; 4],
    /// Linear RGBA at the top edge
    pub color_b: [f32; 4],
    /// Corner radius (pixels)
    pub radius: f32,
    /// Glow blur radius (pixels)
    pub glow: f32,
    /// Rotation (radians)
    pub rotation: f32,
    pub _padding: f32,
}

// Content column anchors (fractions of the window height)
const PROFILE_Y: f32 = 0.28;
const HEADLINE_Y: f32 = 0.48;
const LINKS_Y: f32 = 0.6;
const BIO_Y: f32 = 0.7;

const PROFILE_SIZE_PX: f32 = 150.0;
const RING_SIZE_PX: f32 = 170.0;
const LINK_SIZE_PX: f32 = 48.0;
const LINK_SPACING_PX: f32 = 64.0;
const BAR_WIDTH_PX: f32 = 12.0;
const BAR_SPACING_PX: f32 = 20.0;
const PARTICLE_SIZE_PX: f32 = 4.0;
const FLOAT_AMPLITUDE_PX: f32 = 10.0;

struct Painter {
    quads: Vec<Quad>,
    hue: Option<f32>,
}

impl Painter {
    fn tint(&self, color: Color, alpha: f32) -> [f32; 4] {
        let color = match self.hue {
            Some(deg) => color.hue_rotated(deg),
            None => color,
        };
        color.to_linear(alpha)
    }

    #[allow(clippy::too_many_arguments)]
    fn quad(
        &mut self,
        center: [f32; 2],
        size: [f32; 2],
        bottom: Color,
        top: Color,
        alpha: f32,
        radius: f32,
        glow: f32,
        rotation: f32,
    ) {
        if alpha <= 0.0 {
            return;
        }
        let quad = Quad {
            center,
            size,
            color_a: self.tint(bottom, alpha),
            color_b: self.tint(top, alpha),
            radius,
            glow,
            rotation,
            _padding: 0.0,
        };
        self.quads.push(quad);
    }

    fn circle(&mut self, center: [f32; 2], diameter: f32, color: Color, alpha: f32, glow: f32) {
        self.quad(
            center,
            [diameter, diameter],
            color,
            color,
            alpha,
            diameter / 2.0,
            glow,
            0.0,
        );
    }
}

/// Social link centers, used for links and their hover bursts
pub fn link_center(index: usize, count: usize, viewport: (f32, f32)) -> [f32; 2] {
    let (width, height) = viewport;
    let row = (count.saturating_sub(1)) as f32 * LINK_SPACING_PX;
    [
        width / 2.0 - row / 2.0 + index as f32 * LINK_SPACING_PX,
        height * LINKS_Y,
    ]
}

fn entry_shift(entry: &[EntryStyle], group: usize) -> (f32, f32) {
    entry
        .get(group)
        .map_or((1.0, 0.0), |e| (e.opacity, e.offset_y_px))
}

/// Lay out `scene` for a `viewport` (pixels) at animation time `t_s`
pub fn layout(scene: &Scene, viewport: (f32, f32), t_s: f32) -> Vec<Quad> {
    let (width, height) = viewport;
    let full = [width / 2.0, height / 2.0];
    let mut p = Painter {
        quads: Vec::new(),
        hue: scene.hue_rotation_deg,
    };
    let palette = &scene.palette;

    match &scene.background {
        Background::Video => p.quad(
            full,
            [width, height],
            palette.primary.scaled(0.25),
            palette.secondary.scaled(0.25),
            1.0,
            0.0,
            0.0,
            0.0,
        ),
        Background::Gradient(gradient) => p.quad(
            full,
            [width, height],
            gradient.last(),
            gradient.first(),
            1.0,
            0.0,
            0.0,
            0.0,
        ),
    }

    let content_alpha = scene
        .content
        .as_ref()
        .filter(|c| !c.hidden)
        .map_or(0.0, |c| c.opacity);

    if content_alpha > 0.0 {
        // Ambient particles sit behind the content column
        for particle in &scene.particles {
            let float = particle.float_ms.map_or(0.0, |period| {
                (t_s * TAU * 1000.0 / period as f32).sin() * FLOAT_AMPLITUDE_PX
            });
            let center = [
                particle.left_pct / 100.0 * width,
                particle.top_pct / 100.0 * height + float,
            ];
            let color = particle.background.unwrap_or(Color::WHITE);
            let glow = particle.glow().map_or(0.0, |s| s.blur_px);
            p.circle(center, PARTICLE_SIZE_PX, color, content_alpha * 0.6, glow);
        }

        let (alpha, dy) = entry_shift(&scene.entry, 0);
        let alpha = alpha * content_alpha;
        let center = [width / 2.0, height * PROFILE_Y + dy];
        if let Some(ring) = &scene.ring {
            let spin = TAU * t_s / ring.period_s().max(0.001);
            let glow = ring.glow.map_or(0.0, |s| s.blur_px);
            p.quad(
                center,
                [RING_SIZE_PX, RING_SIZE_PX],
                ring.gradient.last(),
                ring.gradient.first(),
                alpha,
                RING_SIZE_PX / 2.0,
                glow,
                spin,
            );
        }
        if let Some(profile) = &scene.profile {
            let size = PROFILE_SIZE_PX * profile.scale();
            let color = Color::LIGHT_GRAY.scaled(profile.brightness());
            p.quad(
                center,
                [size, size],
                color,
                color,
                alpha,
                size / 2.0,
                0.0,
                profile.rotation_deg().to_radians(),
            );
        }

        if let Some(headline) = &scene.headline {
            let (alpha, dy) = entry_shift(&scene.entry, 1);
            let jitter = if headline.glitching { 3.0 } else { 0.0 };
            let glow = headline
                .text_shadow
                .iter()
                .map(|s| s.blur_px)
                .fold(0.0, f32::max);
            p.quad(
                [width / 2.0 + jitter, height * HEADLINE_Y + dy],
                [320.0 * headline.scale, 36.0 * headline.scale],
                Color::WHITE,
                Color::WHITE,
                alpha * content_alpha,
                6.0,
                glow,
                0.0,
            );
        }

        let (alpha, dy) = entry_shift(&scene.entry, 2);
        let links = scene.social_links.len();
        for (index, link) in scene.social_links.iter().enumerate() {
            let [x, y] = link_center(index, links, viewport);
            // translateY(-8px) scale(1.15) rotate(5deg)
            let (size, lift, tilt, color) = if link.hovered {
                (LINK_SIZE_PX * 1.15, -8.0, 5f32.to_radians(), palette.accent)
            } else {
                (LINK_SIZE_PX, 0.0, 0.0, Color::WHITE.scaled(0.9))
            };
            let glow = if link.pulsing { 15.0 } else { 0.0 };
            p.quad(
                [x, y + dy + lift],
                [size, size],
                color,
                color,
                alpha * content_alpha,
                size / 4.0,
                glow,
                tilt,
            );
        }
        for particle in &scene.hover_particles {
            let origin = Vec2::from(link_center(particle.link, links, viewport)) + Vec2::Y * dy;
            let travel = particle.distance_px * particle.progress;
            let center = (origin + Vec2::from_angle(particle.angle_rad) * travel).to_array();
            p.circle(
                center,
                PARTICLE_SIZE_PX,
                particle.color,
                (1.0 - particle.progress) * content_alpha,
                4.0,
            );
        }

        let (alpha, dy) = entry_shift(&scene.entry, 3);
        p.quad(
            [width / 2.0, height * BIO_Y + dy],
            [420.0, 14.0],
            Color::LIGHT_GRAY,
            Color::LIGHT_GRAY,
            alpha * content_alpha * 0.7,
            7.0,
            0.0,
            0.0,
        );

        let row = (scene.bars.len().saturating_sub(1)) as f32 * BAR_SPACING_PX;
        let floor = height - 24.0;
        for (index, bar) in scene.bars.iter().enumerate() {
            let x = width / 2.0 - row / 2.0 + index as f32 * BAR_SPACING_PX;
            p.quad(
                [x, floor - bar.height_px / 2.0],
                [BAR_WIDTH_PX, bar.height_px],
                bar.gradient.first(),
                bar.gradient.last(),
                content_alpha,
                BAR_WIDTH_PX / 4.0,
                0.0,
                0.0,
            );
        }

        if let Some(button) = &scene.audio_button {
            let color = match (button.muted, button.accent) {
                (true, _) => Color::LIGHT_GRAY.scaled(0.5),
                (false, Some(accent)) => accent,
                (false, None) => Color::WHITE,
            };
            p.circle([width - 50.0, height - 50.0], 40.0, color, content_alpha, 0.0);
        }
    }

    if let Some(landing) = scene.landing.as_ref().filter(|l| l.displayed) {
        p.quad(
            full,
            [width, height],
            Color::BLACK,
            Color::BLACK,
            landing.opacity,
            0.0,
            0.0,
            0.0,
        );
        p.quad(
            full,
            [220.0, 56.0],
            Color::WHITE,
            Color::WHITE,
            landing.opacity,
            28.0,
            12.0,
            0.0,
        );
    }

    if let Some(cursor) = scene.cursor.as_ref().filter(|c| c.visible) {
        let half = CURSOR_SIZE_PX / 2.0;
        p.quad(
            [cursor.left_px + half, cursor.top_px + half],
            [CURSOR_SIZE_PX, CURSOR_SIZE_PX],
            Color::WHITE,
            Color::WHITE,
            0.8,
            half,
            6.0,
            0.0,
        );
    }

    p.quads
}

fn within(center: [f32; 2], radius: f32, x: f32, y: f32) -> bool {
    Vec2::from(center).distance_squared(Vec2::new(x, y)) <= radius * radius
}

fn audio_button_center(viewport: (f32, f32)) -> [f32; 2] {
    [viewport.0 - 50.0, viewport.1 - 50.0]
}

/// What a click at `(x, y)` lands on
pub fn click_target(scene: &Scene, viewport: (f32, f32), x: f32, y: f32) -> Target {
    if scene.landing_displayed() {
        return Target::Landing;
    }
    if scene.audio_button.is_some() && within(audio_button_center(viewport), 20.0, x, y) {
        return Target::AudioToggle;
    }
    Target::Page
}

/// Hoverable element under the pointer, if any
pub fn hover_target(scene: &Scene, viewport: (f32, f32), x: f32, y: f32) -> Option<HoverTarget> {
    let content_shown = scene.content.as_ref().is_some_and(|c| !c.hidden);
    if scene.landing_displayed() || !content_shown {
        return None;
    }

    let links = scene.social_links.len();
    if let Some(index) =
        (0..links).find(|&i| within(link_center(i, links, viewport), LINK_SIZE_PX / 2.0, x, y))
    {
        return Some(HoverTarget::SocialLink(index));
    }

    let profile = [viewport.0 / 2.0, viewport.1 * PROFILE_Y];
    if scene.profile.is_some() && within(profile, PROFILE_SIZE_PX / 2.0, x, y) {
        return Some(HoverTarget::Profile);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SceneConfig;
    use crate::scene::Gradient;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn page() -> Scene {
        let mut rng = SmallRng::seed_from_u64(1);
        Scene::page(&SceneConfig::default(), true, &mut rng)
    }

    #[test]
    fn test_landing_covers_hidden_content() {
        let scene = page();
        let quads = layout(&scene, (1280.0, 720.0), 0.0);

        // Background, landing veil, enter button, cursor
        assert_eq!(quads.len(), 4);
        assert_eq!(quads[1].size, [1280.0, 720.0]);
    }

    #[test]
    fn test_bars_follow_heights() {
        let mut scene = page();
        scene.landing = None;
        if let Some(content) = scene.content.as_mut() {
            content.hidden = false;
            content.opacity = 1.0;
        }
        scene.bars[0].height_px = 80.0;

        let quads = layout(&scene, (1280.0, 720.0), 0.0);
        assert!(quads.iter().any(|q| q.size == [BAR_WIDTH_PX, 80.0]));
        assert_eq!(
            quads
                .iter()
                .filter(|q| q.size == [BAR_WIDTH_PX, 20.0])
                .count(),
            scene.bars.len() - 1
        );
    }

    #[test]
    fn test_hue_rotation_tints_everything() {
        let mut scene = page();
        scene.background = Background::Gradient(Gradient::video_fallback());
        let plain = layout(&scene, (800.0, 600.0), 0.0);

        scene.hue_rotation_deg = Some(120.0);
        let rotated = layout(&scene, (800.0, 600.0), 0.0);
        assert_eq!(plain.len(), rotated.len());
        assert_ne!(plain[0].color_a, rotated[0].color_a);
    }

    #[test]
    fn test_hit_testing() {
        let mut scene = page();
        let viewport = (1000.0, 600.0);
        assert_eq!(click_target(&scene, viewport, 950.0, 550.0), Target::Landing);
        assert_eq!(hover_target(&scene, viewport, 500.0, 168.0), None);

        scene.landing = None;
        if let Some(content) = scene.content.as_mut() {
            content.hidden = false;
        }
        assert_eq!(click_target(&scene, viewport, 950.0, 550.0), Target::AudioToggle);
        assert_eq!(click_target(&scene, viewport, 10.0, 10.0), Target::Page);

        let [x, y] = link_center(2, scene.social_links.len(), viewport);
        assert_eq!(
            hover_target(&scene, viewport, x, y),
            Some(HoverTarget::SocialLink(2))
        );
        assert_eq!(
            hover_target(&scene, viewport, 500.0, 168.0),
            Some(HoverTarget::Profile)
        );
    }

    #[test]
    fn test_links_are_centered() {
        let [left, _] = link_center(0, 4, (1000.0, 600.0));
        let [right, y] = link_center(3, 4, (1000.0, 600.0));
        assert!(((left + right) / 2.0 - 500.0).abs() < 1e-3);
        assert!((y - 360.0).abs() < 1e-3);
    }
}
