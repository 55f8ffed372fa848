//! The page's element tree and the style values written onto it.
//!
//! Optional elements are `Option`s (or possibly empty `Vec`s): writers skip
//! whatever is missing. Each style renders to CSS declarations for logging.

use rand::Rng;

use crate::palette::{Color, Palette};
use crate::params::SceneConfig;

/// Content groups revealed one after another after entering
pub const ENTRY_GROUPS: [&str; 4] = [
    ".profile-picture",
    ".username-container",
    ".social-links",
    ".bio-text",
];

/// Custom cursor diameter (pixels)
pub const CURSOR_SIZE_PX: f32 = 20.0;

/// `0 0 <blur>px <color>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub blur_px: f32,
    pub color: Color,
}

impl Shadow {
    pub fn new(blur_px: f32, color: Color) -> Self {
        Self { blur_px, color }
    }

    pub fn to_css(&self) -> String {
        format!("0 0 {}px {}", self.blur_px, self.color.to_css())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientDirection {
    ToTop,
    Diagonal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub direction: GradientDirection,
    pub stops: Vec<Color>,
}

impl Gradient {
    pub fn to_top(from: Color, to: Color) -> Self {
        Self {
            direction: GradientDirection::ToTop,
            stops: vec![from, to],
        }
    }

    pub fn diagonal(stops: Vec<Color>) -> Self {
        Self {
            direction: GradientDirection::Diagonal,
            stops,
        }
    }

    /// Shown when the background video fails
    pub fn video_fallback() -> Self {
        Self::diagonal(vec![
            Color::hex(0x000428),
            Color::hex(0x004e92),
            Color::hex(0x000428),
        ])
    }

    pub fn first(&self) -> Color {
        self.stops.first().copied().unwrap_or(Color::BLACK)
    }

    pub fn last(&self) -> Color {
        self.stops.last().copied().unwrap_or(Color::BLACK)
    }

    pub fn to_css(&self) -> String {
        let direction = match self.direction {
            GradientDirection::ToTop => "to top",
            GradientDirection::Diagonal => "45deg",
        };
        let stops: Vec<String> = self.stops.iter().map(Color::to_css).collect();
        format!("linear-gradient({}, {})", direction, stops.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandingStyle {
    pub displayed: bool,
    pub fading: bool,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentStyle {
    pub hidden: bool,
    pub visible: bool,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Video,
    Gradient(Gradient),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarStyle {
    pub height_px: f32,
    pub gradient: Gradient,
}

impl BarStyle {
    pub fn css(&self) -> String {
        format!(
            "height: {}px; background: {}",
            self.height_px,
            self.gradient.to_css()
        )
    }
}

/// Beat-driven profile transform and filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePulse {
    pub scale: f32,
    pub rotation_deg: f32,
    pub brightness: f32,
    pub saturate: f32,
}

/// Hover filter on the profile picture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverFilter {
    pub brightness: f32,
    pub contrast: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStyle {
    pub pulse: Option<ProfilePulse>,
    pub hover_filter: Option<HoverFilter>,
}

impl ProfileStyle {
    pub fn scale(&self) -> f32 {
        self.pulse.map_or(1.0, |p| p.scale)
    }

    pub fn rotation_deg(&self) -> f32 {
        self.pulse.map_or(0.0, |p| p.rotation_deg)
    }

    /// Effective brightness multiplier (beat filter wins over hover)
    pub fn brightness(&self) -> f32 {
        match (self.pulse, self.hover_filter) {
            (Some(p), _) => p.brightness,
            (None, Some(h)) => h.brightness,
            (None, None) => 1.0,
        }
    }

    pub fn css(&self) -> String {
        let transform = format!(
            "transform: scale({}) rotate({}deg)",
            self.scale(),
            self.rotation_deg()
        );
        let filter = match (self.pulse, self.hover_filter) {
            (Some(p), _) => format!("brightness({}) saturate({})", p.brightness, p.saturate),
            (None, Some(h)) => format!("brightness({}) contrast({})", h.brightness, h.contrast),
            (None, None) => "none".to_string(),
        };
        format!("{}; filter: {}", transform, filter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingStyle {
    pub gradient: Gradient,
    pub glow: Option<Shadow>,
    /// Spin period forced by the beat
    pub pulse_period_s: Option<f32>,
    /// Spin period set by profile hover
    pub hover_period_s: f32,
}

impl RingStyle {
    /// Faster of the beat and hover periods
    pub fn period_s(&self) -> f32 {
        self.pulse_period_s
            .map_or(self.hover_period_s, |p| p.min(self.hover_period_s))
    }

    pub fn css(&self) -> String {
        let glow = self.glow.map_or("none".to_string(), |g| g.to_css());
        format!(
            "background: {}; box-shadow: {}; animation-duration: {}s",
            self.gradient.to_css(),
            glow,
            self.period_s()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineStyle {
    pub text_shadow: Vec<Shadow>,
    pub scale: f32,
    pub glitching: bool,
}

impl HeadlineStyle {
    pub fn css(&self) -> String {
        let shadow = if self.text_shadow.is_empty() {
            "none".to_string()
        } else {
            let layers: Vec<String> = self.text_shadow.iter().map(Shadow::to_css).collect();
            layers.join(", ")
        };
        let animation = if self.glitching {
            "glitch 0.3s ease-in-out"
        } else {
            "none"
        };
        format!(
            "text-shadow: {}; transform: scale({}); animation: {}",
            shadow, self.scale, animation
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStyle {
    pub left_pct: f32,
    pub top_pct: f32,
    pub beat_glow: Option<Shadow>,
    pub background: Option<Color>,
    pub twinkle: Option<Shadow>,
    /// Float cycle length once floating has started
    pub float_ms: Option<u64>,
}

impl ParticleStyle {
    /// Twinkle wins while it lasts, then the beat glow shows through
    pub fn glow(&self) -> Option<Shadow> {
        self.twinkle.or(self.beat_glow)
    }

    pub fn css(&self) -> String {
        let glow = self.glow().map_or("none".to_string(), |g| g.to_css());
        let background = self
            .background
            .map_or("rgba(255, 255, 255, 0.6)".to_string(), |c| c.to_css());
        format!(
            "left: {}%; top: {}%; box-shadow: {}; background: {}",
            self.left_pct, self.top_pct, glow, background
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioButtonStyle {
    pub muted: bool,
    pub accent: Option<Color>,
}

impl AudioButtonStyle {
    pub fn icon(&self) -> &'static str {
        if self.muted {
            "fa-volume-mute"
        } else {
            "fa-volume-up"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialLinkStyle {
    pub hovered: bool,
    pub pulsing: bool,
}

impl SocialLinkStyle {
    pub fn css(&self) -> String {
        let transform = if self.hovered {
            "translateY(-8px) scale(1.15) rotate(5deg)"
        } else {
            "translateY(0) scale(1) rotate(0deg)"
        };
        let animation = if self.pulsing {
            "pulse 0.6s ease-in-out"
        } else {
            "none"
        };
        format!("transform: {}; animation: {}", transform, animation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryStyle {
    pub opacity: f32,
    pub offset_y_px: f32,
}

impl Default for EntryStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            offset_y_px: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorStyle {
    pub left_px: f32,
    pub top_px: f32,
    pub visible: bool,
}

/// Short-lived particle bursting out of a hovered social link
#[derive(Debug, Clone, PartialEq)]
pub struct HoverParticle {
    pub link: usize,
    pub angle_rad: f32,
    pub distance_px: f32,
    /// 0.0 at spawn, 1.0 when finished
    pub progress: f32,
    pub color: Color,
}

/// Every styled element of the page
#[derive(Debug, Clone)]
pub struct Scene {
    pub landing: Option<LandingStyle>,
    pub content: Option<ContentStyle>,
    pub background: Background,
    pub bars: Vec<BarStyle>,
    pub profile: Option<ProfileStyle>,
    pub ring: Option<RingStyle>,
    pub headline: Option<HeadlineStyle>,
    pub particles: Vec<ParticleStyle>,
    pub audio_button: Option<AudioButtonStyle>,
    pub social_links: Vec<SocialLinkStyle>,
    pub entry: Vec<EntryStyle>,
    pub cursor: Option<CursorStyle>,
    pub hover_particles: Vec<HoverParticle>,
    pub hover_particle_color: Color,
    pub hue_rotation_deg: Option<f32>,
    pub system_cursor_hidden: bool,
    /// Last sampled palette, tints the video background
    pub palette: Palette,
}

impl Scene {
    /// Scene with no elements at all
    pub fn empty() -> Self {
        Self {
            landing: None,
            content: None,
            background: Background::Video,
            bars: Vec::new(),
            profile: None,
            ring: None,
            headline: None,
            particles: Vec::new(),
            audio_button: None,
            social_links: Vec::new(),
            entry: Vec::new(),
            cursor: None,
            hover_particles: Vec::new(),
            hover_particle_color: Color::WHITE,
            hue_rotation_deg: None,
            system_cursor_hidden: false,
            palette: Palette::FALLBACK,
        }
    }

    /// The full page at load time: landing shown, content hidden, muted
    pub fn page<R: Rng>(config: &SceneConfig, custom_cursor: bool, rng: &mut R) -> Self {
        let rest = Palette::FALLBACK;
        let particles = (0..config.particle_count)
            .map(|_| ParticleStyle {
                left_pct: rng.gen_range(0.0..100.0),
                top_pct: rng.gen_range(0.0..100.0),
                beat_glow: None,
                background: None,
                twinkle: None,
                float_ms: None,
            })
            .collect();

        Self {
            landing: Some(LandingStyle {
                displayed: true,
                fading: false,
                opacity: 1.0,
            }),
            content: Some(ContentStyle {
                hidden: true,
                visible: false,
                opacity: 0.0,
            }),
            bars: (0..config.bar_count)
                .map(|_| BarStyle {
                    height_px: 20.0,
                    gradient: Gradient::to_top(rest.primary, rest.secondary),
                })
                .collect(),
            profile: Some(ProfileStyle::default()),
            ring: Some(RingStyle {
                gradient: Gradient::diagonal(vec![rest.primary, rest.secondary]),
                glow: None,
                pulse_period_s: None,
                hover_period_s: 4.0,
            }),
            headline: Some(HeadlineStyle {
                text_shadow: Vec::new(),
                scale: 1.0,
                glitching: false,
            }),
            particles,
            audio_button: Some(AudioButtonStyle {
                muted: true,
                accent: None,
            }),
            social_links: vec![SocialLinkStyle::default(); config.social_link_count],
            entry: vec![EntryStyle::default(); ENTRY_GROUPS.len()],
            cursor: custom_cursor.then(|| CursorStyle {
                left_px: -CURSOR_SIZE_PX,
                top_px: -CURSOR_SIZE_PX,
                visible: true,
            }),
            ..Self::empty()
        }
    }

    /// Landing is still on screen
    pub fn landing_displayed(&self) -> bool {
        self.landing.as_ref().is_some_and(|l| l.displayed)
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        let bars: Vec<String> = self
            .bars
            .iter()
            .map(|b| format!("{:.0}", b.height_px))
            .collect();
        let profile = self.profile.as_ref().map_or("-".to_string(), |p| p.css());
        let ring = self.ring.as_ref().map_or(0.0, |r| r.period_s());
        let muted = self.audio_button.as_ref().map_or("-", |b| b.icon());
        format!(
            "bars=[{}] profile=({}) ring={:.2}s audio={} primary={}",
            bars.join(" "),
            profile,
            ring,
            muted,
            self.palette.primary.to_css()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_page_starts_on_landing() {
        let mut rng = SmallRng::seed_from_u64(3);
        let scene = Scene::page(&SceneConfig::default(), true, &mut rng);

        assert!(scene.landing_displayed());
        assert!(scene.content.as_ref().unwrap().hidden);
        assert_eq!(scene.bars.len(), 8);
        assert_eq!(scene.audio_button.as_ref().unwrap().icon(), "fa-volume-mute");
        assert!(scene
            .particles
            .iter()
            .all(|p| (0.0..100.0).contains(&p.left_pct)));
    }

    #[test]
    fn test_gradient_css() {
        let g = Gradient::to_top(Color::WHITE, Color::LIGHT_GRAY);
        assert_eq!(
            g.to_css(),
            "linear-gradient(to top, rgb(255, 255, 255), rgb(204, 204, 204))"
        );
        assert_eq!(
            Gradient::video_fallback().to_css(),
            "linear-gradient(45deg, rgb(0, 4, 40), rgb(0, 78, 146), rgb(0, 4, 40))"
        );
    }

    #[test]
    fn test_ring_period_takes_faster() {
        let mut ring = RingStyle {
            gradient: Gradient::diagonal(vec![]),
            glow: None,
            pulse_period_s: None,
            hover_period_s: 4.0,
        };
        assert_eq!(ring.period_s(), 4.0);
        ring.pulse_period_s = Some(2.5);
        assert_eq!(ring.period_s(), 2.5);
        ring.hover_period_s = 1.0;
        assert_eq!(ring.period_s(), 1.0);
    }

    #[test]
    fn test_profile_filter_precedence() {
        let mut profile = ProfileStyle {
            pulse: None,
            hover_filter: Some(HoverFilter {
                brightness: 1.2,
                contrast: 1.1,
            }),
        };
        assert_eq!(profile.brightness(), 1.2);
        assert!(profile.css().ends_with("brightness(1.2) contrast(1.1)"));

        profile.pulse = Some(ProfilePulse {
            scale: 1.05,
            rotation_deg: 2.0,
            brightness: 1.13,
            saturate: 1.26,
        });
        assert_eq!(profile.brightness(), 1.13);
        assert!(profile.css().starts_with("transform: scale(1.05) rotate(2deg)"));
    }
}
