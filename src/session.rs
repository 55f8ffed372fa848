//! Session and input controller.
//!
//! One [`Session`] owns everything the page needs for its lifetime: the
//! track, the optional audio context, the video, the visualizer loop, the
//! scene and the pending timers. Input events and redraw ticks drive it.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{AudioContext, ContextState, MediaElement};
use crate::mapper::StyleMapper;
use crate::palette::{sample_palette, Color, VideoSource};
use crate::params::{ms, AnalyserConfig, PageConfig, PlaybackConfig, SessionTimings};
use crate::scene::{
    Background, EntryStyle, Gradient, HoverFilter, HoverParticle, Scene, Shadow, CURSOR_SIZE_PX,
};
use crate::signal::{wall_clock_ms, Analyser, SampleTap, SignalSource, SyntheticSignal};
use crate::timers::Timers;
use crate::visualizer::VisualizerLoop;

/// Click targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Landing,
    AudioToggle,
    Page,
}

/// Elements with hover effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTarget {
    SocialLink(usize),
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    Escape,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Click(Target),
    PointerMoved { x: f32, y: f32 },
    Key(Key),
    HoverEnter(HoverTarget),
    HoverLeave(HoverTarget),
    Resized,
    FullscreenChanged(bool),
    VideoFailed,
}

/// Requests for the window shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleFullscreen,
    HideSystemCursor,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    HideLanding,
    RevealContent,
    RevealEntry(usize),
    StartFloat { particle: usize, duration_ms: u64 },
    VerifyPlayback,
    HideSystemCursor,
    Twinkle,
    ClearTwinkle(usize),
    GlitchRoll,
    ClearGlitch,
    ClearPulse(usize),
    RainbowStep,
}

/// Start times of running CSS-style transitions
#[derive(Debug, Default)]
struct Transitions {
    landing_fade: Option<Instant>,
    content_shown: Option<Instant>,
    entry: Vec<Option<Instant>>,
    hover_particles: Vec<Instant>,
}

fn progress(now: Instant, start: Instant, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(start).as_secs_f32();
    (elapsed * 1000.0 / duration_ms as f32).clamp(0.0, 1.0)
}

pub struct Session<M: MediaElement, C: AudioContext, V: VideoSource> {
    media: M,
    context: Option<C>,
    video: V,
    /// Set by the first successful analyser connection, never replaced
    media_tap: Option<SampleTap>,
    visualizer: VisualizerLoop,
    mapper: StyleMapper,
    scene: Scene,
    timers: Timers<Deferred>,
    transitions: Transitions,
    analyser: AnalyserConfig,
    playback: PlaybackConfig,
    timings: SessionTimings,
    rng: SmallRng,
    autoplay: bool,
    has_entered_site: bool,
    is_audio_playing: bool,
    beat_detection: bool,
    click_count: u32,
    hue_rotating: bool,
    last_intensity: f32,
}

impl<M: MediaElement, C: AudioContext, V: VideoSource> Session<M, C, V> {
    pub fn new(config: &PageConfig, media: M, context: Option<C>, video: V, now: Instant) -> Self {
        Self::with_seed(config, media, context, video, now, wall_clock_ms() as u64)
    }

    /// Same as [`Session::new`] with a fixed seed for the decorative randomness
    pub fn with_seed(
        config: &PageConfig,
        media: M,
        context: Option<C>,
        video: V,
        now: Instant,
        seed: u64,
    ) -> Self {
        if context.is_none() {
            warn!("No audio context, reactive features disabled");
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        let scene = Scene::page(&config.scene, config.render.custom_cursor, &mut rng);
        let timings = config.timings.clone();

        let mut timers = Timers::new();
        if config.render.custom_cursor {
            timers.after(now, ms(timings.cursor_hide_delay_ms), Deferred::HideSystemCursor);
        }
        timers.after(now, ms(timings.twinkle_interval_ms), Deferred::Twinkle);
        timers.after(now, ms(timings.glitch_interval_ms), Deferred::GlitchRoll);

        Self {
            media,
            context,
            video,
            media_tap: None,
            visualizer: VisualizerLoop::new(ms(config.playback.synthetic_interval_ms)),
            mapper: StyleMapper::new(config.mapping.clone()),
            transitions: Transitions {
                entry: vec![None; scene.entry.len()],
                ..Default::default()
            },
            scene,
            timers,
            analyser: config.analyser.clone(),
            playback: config.playback.clone(),
            timings,
            rng,
            autoplay: config.playback.autoplay_on_entry,
            has_entered_site: false,
            is_audio_playing: false,
            beat_detection: false,
            click_count: 0,
            hue_rotating: false,
            last_intensity: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn has_entered_site(&self) -> bool {
        self.has_entered_site
    }

    pub fn is_audio_playing(&self) -> bool {
        self.is_audio_playing
    }

    pub fn beat_detection(&self) -> bool {
        self.beat_detection
    }

    pub fn visualizer_running(&self) -> bool {
        self.visualizer.is_running()
    }

    pub fn is_synthetic(&self) -> bool {
        self.visualizer.is_synthetic()
    }

    /// Intensity of the most recently mapped frame
    pub fn last_intensity(&self) -> f32 {
        self.last_intensity
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    /// Handle one input event
    pub fn handle(&mut self, event: InputEvent, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();
        match event {
            InputEvent::Click(target) => {
                self.count_click(now);
                match target {
                    Target::Landing => self.enter_site(now),
                    Target::AudioToggle => self.toggle_audio(now),
                    Target::Page => {}
                }
            }
            InputEvent::PointerMoved { x, y } => {
                if let Some(cursor) = self.scene.cursor.as_mut() {
                    cursor.left_px = x - CURSOR_SIZE_PX / 2.0;
                    cursor.top_px = y - CURSOR_SIZE_PX / 2.0;
                }
            }
            InputEvent::Key(key) => match key {
                Key::Space | Key::Enter => {
                    if self.scene.landing_displayed() {
                        self.enter_site(now);
                    } else {
                        self.toggle_audio(now);
                    }
                }
                Key::Char(c) if c.eq_ignore_ascii_case(&'m') => self.toggle_audio(now),
                Key::Char(c) if c.eq_ignore_ascii_case(&'f') => {
                    commands.push(Command::ToggleFullscreen)
                }
                Key::Escape => commands.push(Command::Quit),
                _ => {}
            },
            InputEvent::HoverEnter(HoverTarget::SocialLink(index)) => {
                if let Some(link) = self.scene.social_links.get_mut(index) {
                    link.hovered = true;
                    self.spawn_hover_burst(index, now);
                }
            }
            InputEvent::HoverLeave(HoverTarget::SocialLink(index)) => {
                if let Some(link) = self.scene.social_links.get_mut(index) {
                    link.hovered = false;
                }
            }
            InputEvent::HoverEnter(HoverTarget::Profile) => self.set_profile_hover(true),
            InputEvent::HoverLeave(HoverTarget::Profile) => self.set_profile_hover(false),
            InputEvent::Resized => {
                for particle in &mut self.scene.particles {
                    particle.left_pct = self.rng.gen_range(0.0..100.0);
                    particle.top_pct = self.rng.gen_range(0.0..100.0);
                }
            }
            InputEvent::FullscreenChanged(on) => debug!("Fullscreen: {}", on),
            InputEvent::VideoFailed => {
                warn!("Background video unavailable, using gradient");
                self.scene.background = Background::Gradient(Gradient::video_fallback());
            }
        }
        commands
    }

    /// Advance timers, transitions and the visualizer to `now`
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Some((due, action)) = self.timers.pop_due(now) {
            self.run_deferred(action, due, &mut commands);
        }
        self.advance_transitions(now);
        self.run_visualizer(now);
        commands
    }

    /// Landing -> main content, at most once per session
    pub fn enter_site(&mut self, now: Instant) {
        if self.has_entered_site {
            debug!("Already entered, ignoring");
            return;
        }
        self.has_entered_site = true;
        info!("Entering site");

        if let Some(landing) = self.scene.landing.as_mut() {
            landing.fading = true;
        }
        self.transitions.landing_fade = Some(now);
        self.timers
            .after(now, ms(self.timings.landing_fade_ms), Deferred::HideLanding);

        if self.autoplay && !self.is_audio_playing {
            self.toggle_audio(now);
        }
    }

    /// Play/pause the background track, falling back to the synthetic signal
    pub fn toggle_audio(&mut self, now: Instant) {
        if self.is_audio_playing {
            self.media.pause();
            self.set_muted(true);
            self.is_audio_playing = false;
            self.beat_detection = false;
            self.visualizer.stop();
            if let Some(context) = self.context.as_mut() {
                context.stop_tone();
            }
            info!("Audio muted");
            return;
        }

        if let Some(context) = self.context.as_mut() {
            if context.state() == ContextState::Suspended {
                if let Err(e) = context.resume() {
                    warn!("Failed to resume audio context: {}", e);
                }
            }
        }

        self.media.set_volume(self.playback.volume);
        self.media.load();

        match self.media.play() {
            Ok(()) => {
                info!("Audio playing");
                self.set_muted(false);
                self.is_audio_playing = true;
                self.on_media_play(now);
                self.timers
                    .after(now, ms(self.playback.verify_after_ms), Deferred::VerifyPlayback);
            }
            Err(e) => {
                warn!("Playback failed, using synthetic signal: {}", e);
                self.start_synthetic(now);
                self.set_muted(false);
                self.is_audio_playing = true;
            }
        }
    }

    /// Route the track to the analyser (once) and start the loop on it
    fn on_media_play(&mut self, now: Instant) {
        let Some(context) = self.context.as_mut() else {
            return;
        };

        if self.media_tap.is_none() {
            match context.connect_media(self.analyser.fft_size) {
                Ok(tap) => {
                    debug!("Track connected to analyser");
                    self.media_tap = Some(tap);
                }
                Err(e) => {
                    warn!("Analyser connection failed: {}", e);
                    self.start_synthetic(now);
                    return;
                }
            }
        }

        if let Some(tap) = self.media_tap.clone() {
            self.beat_detection = true;
            let analyser = Analyser::new(tap, self.analyser.clone());
            self.visualizer.start(SignalSource::Analyser(analyser), now);
        }
    }

    fn start_synthetic(&mut self, now: Instant) {
        let Some(context) = self.context.as_mut() else {
            debug!("No audio context, synthetic signal unavailable");
            return;
        };
        if let Err(e) = context.start_tone(self.playback.tone_hz, self.playback.tone_gain) {
            warn!("Synthetic tone failed: {}", e);
        }

        self.beat_detection = true;
        self.visualizer.start(
            SignalSource::Synthetic(SyntheticSignal::from_wall_clock()),
            now,
        );
        info!("Synthetic signal started");
    }

    fn run_visualizer(&mut self, now: Instant) {
        if !self.beat_detection {
            return;
        }
        match self.visualizer.poll(now) {
            Ok(Some(frame)) => {
                let intensity = frame.intensity();
                let palette = sample_palette(&mut self.video, now);
                self.mapper
                    .apply(&frame, intensity, &palette, &mut self.scene);
                self.last_intensity = intensity;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Signal acquisition failed, switching to synthetic: {}", e);
                self.visualizer.stop();
                self.start_synthetic(now);
            }
        }
    }

    fn run_deferred(&mut self, action: Deferred, at: Instant, commands: &mut Vec<Command>) {
        let t = &self.timings;
        match action {
            Deferred::HideLanding => {
                if let Some(landing) = self.scene.landing.as_mut() {
                    landing.displayed = false;
                    landing.opacity = 0.0;
                }
                if let Some(content) = self.scene.content.as_mut() {
                    content.hidden = false;
                }
                self.timers
                    .after(at, ms(t.reveal_delay_ms), Deferred::RevealContent);
            }
            Deferred::RevealContent => {
                if let Some(content) = self.scene.content.as_mut() {
                    content.visible = true;
                }
                self.transitions.content_shown = Some(at);
                self.start_animations(at);
            }
            Deferred::RevealEntry(index) => {
                if let Some(slot) = self.transitions.entry.get_mut(index) {
                    *slot = Some(at);
                }
            }
            Deferred::StartFloat {
                particle,
                duration_ms,
            } => {
                if let Some(p) = self.scene.particles.get_mut(particle) {
                    p.float_ms = Some(duration_ms);
                }
            }
            Deferred::VerifyPlayback => {
                if !self.is_audio_playing || self.visualizer.is_synthetic() {
                    return;
                }
                if self.media.is_paused() || self.media.current_time() == 0.0 {
                    info!("Track is not advancing, using synthetic signal");
                    self.start_synthetic(at);
                }
            }
            Deferred::HideSystemCursor => {
                self.scene.system_cursor_hidden = true;
                commands.push(Command::HideSystemCursor);
            }
            Deferred::Twinkle => {
                let (chance, twinkle_ms) = (t.twinkle_chance, t.twinkle_ms);
                for index in 0..self.scene.particles.len() {
                    if self.rng.gen_bool(chance) {
                        let blur = self.rng.gen::<f32>() * 20.0;
                        self.scene.particles[index].twinkle = Some(Shadow::new(blur, Color::CYAN));
                        self.timers
                            .after(at, ms(twinkle_ms), Deferred::ClearTwinkle(index));
                    }
                }
                self.timers
                    .after(at, ms(self.timings.twinkle_interval_ms), Deferred::Twinkle);
            }
            Deferred::ClearTwinkle(index) => {
                if let Some(p) = self.scene.particles.get_mut(index) {
                    p.twinkle = None;
                }
            }
            Deferred::GlitchRoll => {
                let (glitch_chance, glitch_ms) = (t.glitch_chance, t.glitch_ms);
                let (pulse_chance, pulse_ms) = (t.pulse_chance, t.pulse_ms);
                if let Some(headline) = self.scene.headline.as_mut() {
                    if self.rng.gen_bool(glitch_chance) {
                        headline.glitching = true;
                        self.timers.after(at, ms(glitch_ms), Deferred::ClearGlitch);
                    }
                }
                for index in 0..self.scene.social_links.len() {
                    if self.rng.gen_bool(pulse_chance) {
                        self.scene.social_links[index].pulsing = true;
                        self.timers.after(at, ms(pulse_ms), Deferred::ClearPulse(index));
                    }
                }
                self.timers
                    .after(at, ms(self.timings.glitch_interval_ms), Deferred::GlitchRoll);
            }
            Deferred::ClearGlitch => {
                if let Some(headline) = self.scene.headline.as_mut() {
                    headline.glitching = false;
                }
            }
            Deferred::ClearPulse(index) => {
                if let Some(link) = self.scene.social_links.get_mut(index) {
                    link.pulsing = false;
                }
            }
            Deferred::RainbowStep => {
                let hue = self.scene.hue_rotation_deg.unwrap_or(0.0) + t.rainbow_step_deg;
                if hue >= 360.0 {
                    self.scene.hue_rotation_deg = None;
                    self.hue_rotating = false;
                    self.click_count = 0;
                } else {
                    self.scene.hue_rotation_deg = Some(hue);
                    self.timers
                        .after(at, ms(t.rainbow_step_ms), Deferred::RainbowStep);
                }
            }
        }
    }

    /// Staggered entry of content groups and particle floating
    fn start_animations(&mut self, at: Instant) {
        let offset = self.timings.entry_offset_px;
        for (index, entry) in self.scene.entry.iter_mut().enumerate() {
            *entry = EntryStyle {
                opacity: 0.0,
                offset_y_px: offset,
            };
            self.timers.after(
                at,
                ms(self.timings.entry_stagger_ms * index as u64),
                Deferred::RevealEntry(index),
            );
        }

        let min = self.timings.float_min_duration_ms;
        for particle in 0..self.scene.particles.len() {
            let duration_ms = min + self.rng.gen_range(0..=min);
            self.timers.after(
                at,
                ms(self.timings.float_stagger_ms * particle as u64),
                Deferred::StartFloat {
                    particle,
                    duration_ms,
                },
            );
        }
    }

    fn advance_transitions(&mut self, now: Instant) {
        let t = &self.timings;

        if let (Some(landing), Some(start)) =
            (self.scene.landing.as_mut(), self.transitions.landing_fade)
        {
            if landing.displayed {
                landing.opacity = 1.0 - progress(now, start, t.landing_fade_ms);
            }
        }

        if let (Some(content), Some(start)) =
            (self.scene.content.as_mut(), self.transitions.content_shown)
        {
            content.opacity = progress(now, start, t.entry_transition_ms);
        }

        for (entry, start) in self.scene.entry.iter_mut().zip(&self.transitions.entry) {
            if let Some(start) = start {
                let p = progress(now, *start, t.entry_transition_ms);
                entry.opacity = p;
                entry.offset_y_px = t.entry_offset_px * (1.0 - p);
            }
        }

        let lifetime = t.hover_burst_ms;
        let mut born = self.transitions.hover_particles.iter();
        self.scene.hover_particles.retain_mut(|particle| {
            let p = born.next().map_or(1.0, |b| progress(now, *b, lifetime));
            particle.progress = p;
            p < 1.0
        });
        self.transitions
            .hover_particles
            .retain(|b| progress(now, *b, lifetime) < 1.0);
    }

    fn spawn_hover_burst(&mut self, link: usize, now: Instant) {
        let color = sample_palette(&mut self.video, now).accent;
        let count = self.timings.hover_burst_count;
        for k in 0..count {
            self.scene.hover_particles.push(HoverParticle {
                link,
                angle_rad: TAU * k as f32 / count as f32,
                distance_px: self.timings.hover_burst_distance_px,
                progress: 0.0,
                color,
            });
            self.transitions.hover_particles.push(now);
        }
    }

    fn set_profile_hover(&mut self, hovered: bool) {
        let (filter, period) = if hovered {
            (
                HoverFilter {
                    brightness: 1.2,
                    contrast: 1.1,
                },
                1.0,
            )
        } else {
            (
                HoverFilter {
                    brightness: 1.0,
                    contrast: 1.0,
                },
                4.0,
            )
        };
        if let Some(profile) = self.scene.profile.as_mut() {
            profile.hover_filter = Some(filter);
        }
        if let Some(ring) = self.scene.ring.as_mut() {
            ring.hover_period_s = period;
        }
    }

    fn set_muted(&mut self, muted: bool) {
        if let Some(button) = self.scene.audio_button.as_mut() {
            button.muted = muted;
        }
    }

    fn count_click(&mut self, now: Instant) {
        self.click_count += 1;
        if self.click_count == self.timings.rainbow_clicks && !self.hue_rotating {
            debug!("Hue rotation started");
            self.hue_rotating = true;
            self.scene.hue_rotation_deg = Some(0.0);
            self.timers
                .after(now, ms(self.timings.rainbow_step_ms), Deferred::RainbowStep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, PlaybackError};
    use crate::palette::{FrameSequence, NoVideo, Palette};
    use std::f32::consts::PI;

    struct FakeMedia {
        paused: bool,
        time: f64,
        reject: bool,
        plays: u32,
        volume: f32,
    }

    impl FakeMedia {
        fn new() -> Self {
            Self {
                paused: true,
                time: 0.0,
                reject: false,
                plays: 0,
                volume: 1.0,
            }
        }
    }

    impl MediaElement for FakeMedia {
        fn load(&mut self) {}

        fn play(&mut self) -> Result<(), PlaybackError> {
            self.plays += 1;
            if self.reject {
                return Err(PlaybackError::Rejected("autoplay blocked".to_string()));
            }
            self.paused = false;
            Ok(())
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
    }

    struct FakeContext {
        state: ContextState,
        resumes: u32,
        connects: u32,
        tap: Option<SampleTap>,
        tone: Option<f32>,
    }

    impl FakeContext {
        fn new() -> Self {
            Self {
                state: ContextState::Suspended,
                resumes: 0,
                connects: 0,
                tap: None,
                tone: None,
            }
        }
    }

    impl AudioContext for FakeContext {
        fn state(&self) -> ContextState {
            self.state
        }

        fn resume(&mut self) -> Result<(), AudioError> {
            self.resumes += 1;
            self.state = ContextState::Running;
            Ok(())
        }

        fn connect_media(&mut self, tap_capacity: usize) -> Result<SampleTap, AudioError> {
            if self.tap.is_some() {
                return Err(AudioError::AlreadyConnected);
            }
            self.connects += 1;
            let tap = SampleTap::new(tap_capacity);
            self.tap = Some(tap.clone());
            Ok(tap)
        }

        fn start_tone(&mut self, frequency_hz: f32, _gain: f32) -> Result<(), AudioError> {
            self.tone = Some(frequency_hz);
            Ok(())
        }

        fn stop_tone(&mut self) {
            self.tone = None;
        }
    }

    type TestSession = Session<FakeMedia, FakeContext, NoVideo>;

    fn session(media: FakeMedia, context: Option<FakeContext>, now: Instant) -> TestSession {
        Session::with_seed(&PageConfig::default(), media, context, NoVideo, now, 7)
    }

    fn muted(s: &TestSession) -> bool {
        s.scene().audio_button.as_ref().is_some_and(|b| b.muted)
    }

    #[test]
    fn test_double_entry_transitions_once() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), Some(FakeContext::new()), t0);

        s.handle(InputEvent::Click(Target::Landing), t0);
        s.handle(InputEvent::Key(Key::Enter), t0 + ms(10));

        assert!(s.has_entered_site());
        assert!(s.is_audio_playing());
        assert_eq!(s.media().plays, 1);

        s.tick(t0 + ms(500));
        let landing = s.scene().landing.as_ref().unwrap();
        assert!(landing.fading);
        assert!((landing.opacity - 0.5).abs() < 0.01);

        s.tick(t0 + ms(1000));
        assert!(!s.scene().landing_displayed());
        assert!(!s.scene().content.as_ref().unwrap().hidden);
        assert!(!s.scene().content.as_ref().unwrap().visible);

        s.tick(t0 + ms(1100));
        assert!(s.scene().content.as_ref().unwrap().visible);
    }

    #[test]
    fn test_entry_animations_are_staggered() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);
        s.enter_site(t0);
        s.tick(t0 + ms(1100));

        s.tick(t0 + ms(1500));
        let entry = &s.scene().entry;
        assert!((entry[0].opacity - 0.5).abs() < 0.01);
        assert!((entry[0].offset_y_px - 15.0).abs() < 0.5);
        assert_eq!(entry[3].opacity, 0.0);
        assert_eq!(entry[3].offset_y_px, 30.0);

        s.tick(t0 + ms(2500));
        for e in &s.scene().entry {
            assert!((e.opacity - 1.0).abs() < 1e-6);
            assert!(e.offset_y_px.abs() < 1e-4);
        }

        s.tick(t0 + ms(1100 + 11 * 1000));
        for p in &s.scene().particles {
            let d = p.float_ms.unwrap();
            assert!((4000..=8000).contains(&d));
        }
    }

    #[test]
    fn test_toggle_off_then_on_resumes_and_connects_once() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), Some(FakeContext::new()), t0);

        s.toggle_audio(t0);
        assert!(s.is_audio_playing());
        assert!(s.beat_detection());
        assert!(s.visualizer_running());
        assert!(!s.is_synthetic());
        assert!(!muted(&s));
        assert_eq!(s.media().volume, 0.5);
        assert_eq!(s.context().unwrap().resumes, 1);

        s.toggle_audio(t0 + ms(10));
        assert!(!s.is_audio_playing());
        assert!(!s.beat_detection());
        assert!(!s.visualizer_running());
        assert!(s.media().is_paused());
        assert!(muted(&s));

        s.toggle_audio(t0 + ms(20));
        assert!(s.is_audio_playing());
        assert!(s.visualizer_running());
        let context = s.context().unwrap();
        assert_eq!(context.connects, 1);
        assert_eq!(context.resumes, 1);
    }

    #[test]
    fn test_stalled_track_falls_back_to_synthetic() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), Some(FakeContext::new()), t0);

        s.toggle_audio(t0);
        s.tick(t0 + ms(500));
        assert!(!s.is_synthetic());

        s.tick(t0 + ms(1000));
        assert!(s.is_synthetic());
        assert_eq!(s.context().unwrap().tone, Some(60.0));

        for step in 0..5 {
            s.tick(t0 + ms(1000 + step * 50));
            assert!(s.last_intensity() > 0.0);
        }
    }

    #[test]
    fn test_advancing_track_keeps_analyser() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), Some(FakeContext::new()), t0);

        s.toggle_audio(t0);
        s.media_mut().time = 0.5;

        let samples: Vec<f32> = (0..512)
            .map(|n| (2.0 * PI * 32.0 * n as f32 / 512.0).sin())
            .collect();
        if let Some(tap) = s.context().and_then(|c| c.tap.as_ref()) {
            tap.extend(&samples);
        }

        s.tick(t0 + ms(1000));
        assert!(!s.is_synthetic());
        assert!(s.last_intensity() > 0.0);
        assert_eq!(s.context().unwrap().tone, None);
    }

    #[test]
    fn test_rejected_play_uses_synthetic() {
        let t0 = Instant::now();
        let mut media = FakeMedia::new();
        media.reject = true;
        let mut s = session(media, Some(FakeContext::new()), t0);

        s.toggle_audio(t0);
        assert!(s.is_audio_playing());
        assert!(s.is_synthetic());
        assert!(!muted(&s));
        assert_eq!(s.context().unwrap().tone, Some(60.0));

        s.toggle_audio(t0 + ms(100));
        assert!(!s.visualizer_running());
        assert_eq!(s.context().unwrap().tone, None);
    }

    #[test]
    fn test_without_context_nothing_reacts() {
        let t0 = Instant::now();
        let mut s: TestSession = session(FakeMedia::new(), None, t0);

        s.toggle_audio(t0);
        assert!(s.is_audio_playing());
        assert!(!s.beat_detection());

        s.tick(t0 + ms(1000));
        assert!(!s.visualizer_running());
        assert_eq!(s.last_intensity(), 0.0);
        assert!(s.scene().bars.iter().all(|b| b.height_px == 20.0));
    }

    #[test]
    fn test_keyboard_shortcuts() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), Some(FakeContext::new()), t0);

        s.handle(InputEvent::Key(Key::Space), t0);
        assert!(s.has_entered_site());
        assert!(s.is_audio_playing());

        s.handle(InputEvent::Key(Key::Char('M')), t0 + ms(10));
        assert!(!s.is_audio_playing());

        assert_eq!(
            s.handle(InputEvent::Key(Key::Char('f')), t0),
            vec![Command::ToggleFullscreen]
        );
        assert_eq!(s.handle(InputEvent::Key(Key::Escape), t0), vec![Command::Quit]);
        assert!(s.handle(InputEvent::Key(Key::Other), t0).is_empty());
    }

    #[test]
    fn test_system_cursor_hidden_after_delay() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);

        assert!(!s.tick(t0 + ms(999)).contains(&Command::HideSystemCursor));
        assert!(s.tick(t0 + ms(1000)).contains(&Command::HideSystemCursor));
        assert!(s.scene().system_cursor_hidden);

        s.handle(InputEvent::PointerMoved { x: 110.0, y: 60.0 }, t0);
        let cursor = s.scene().cursor.as_ref().unwrap();
        assert_eq!((cursor.left_px, cursor.top_px), (100.0, 50.0));
    }

    #[test]
    fn test_ten_clicks_rotate_hue_once() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);

        for _ in 0..9 {
            s.handle(InputEvent::Click(Target::Page), t0);
        }
        assert_eq!(s.scene().hue_rotation_deg, None);

        s.handle(InputEvent::Click(Target::Page), t0);
        assert_eq!(s.scene().hue_rotation_deg, Some(0.0));

        s.tick(t0 + ms(100));
        assert_eq!(s.scene().hue_rotation_deg, Some(10.0));

        s.tick(t0 + ms(72 * 50));
        assert_eq!(s.scene().hue_rotation_deg, None);

        for _ in 0..10 {
            s.handle(InputEvent::Click(Target::Page), t0 + ms(4000));
        }
        assert_eq!(s.scene().hue_rotation_deg, Some(0.0));
    }

    #[test]
    fn test_hover_burst_expires() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);

        s.handle(InputEvent::HoverEnter(HoverTarget::SocialLink(0)), t0);
        s.handle(InputEvent::HoverEnter(HoverTarget::SocialLink(99)), t0);
        assert_eq!(s.scene().hover_particles.len(), 5);
        assert!(s.scene().social_links[0].hovered);

        s.tick(t0 + ms(400));
        assert_eq!(s.scene().hover_particles.len(), 5);
        assert!((s.scene().hover_particles[0].progress - 0.5).abs() < 0.01);

        s.tick(t0 + ms(800));
        assert!(s.scene().hover_particles.is_empty());

        s.handle(InputEvent::HoverLeave(HoverTarget::SocialLink(0)), t0);
        assert!(!s.scene().social_links[0].hovered);
    }

    #[test]
    fn test_hover_burst_takes_video_accent() {
        let t0 = Instant::now();
        let frame = image::RgbaImage::from_pixel(4, 4, image::Rgba([40, 80, 120, 255]));
        let video = FrameSequence::new(vec![frame], 24.0);
        let mut s = Session::with_seed(
            &PageConfig::default(),
            FakeMedia::new(),
            None::<FakeContext>,
            video,
            t0,
            7,
        );

        s.handle(InputEvent::HoverEnter(HoverTarget::SocialLink(1)), t0);

        let expected = Palette::from_average(40, 80, 120).accent;
        assert_ne!(expected, Color::WHITE);
        assert!(!s.scene().hover_particles.is_empty());
        assert!(s.scene().hover_particles.iter().all(|p| p.color == expected));
    }

    #[test]
    fn test_profile_hover_speeds_up_ring() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);

        s.handle(InputEvent::HoverEnter(HoverTarget::Profile), t0);
        assert_eq!(s.scene().ring.as_ref().unwrap().period_s(), 1.0);
        let filter = s.scene().profile.as_ref().unwrap().hover_filter.unwrap();
        assert_eq!(filter.brightness, 1.2);

        s.handle(InputEvent::HoverLeave(HoverTarget::Profile), t0);
        assert_eq!(s.scene().ring.as_ref().unwrap().period_s(), 4.0);
    }

    #[test]
    fn test_video_failure_shows_gradient() {
        let t0 = Instant::now();
        let mut s = session(FakeMedia::new(), None, t0);

        s.handle(InputEvent::VideoFailed, t0);
        assert!(matches!(s.scene().background, Background::Gradient(_)));
    }
}
