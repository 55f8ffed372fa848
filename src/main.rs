//! pulsepage - an audio-reactive personal landing page
//!
//! The background track drives the page: bars, profile picture, ring and
//! particles pulse with the music, tinted by the background video.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key as LogicalKey, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

use pulsepage::audio::{AudioEngine, BackgroundAudio};
use pulsepage::cli::Args;
use pulsepage::layout::{click_target, hover_target, layout};
use pulsepage::palette::FrameSequence;
use pulsepage::params::{AssetPaths, PageConfig};
use pulsepage::rendering::RenderSystem;
use pulsepage::session::{Command, HoverTarget, InputEvent, Key, Session, Target};

type PageSession = Session<BackgroundAudio, AudioEngine, FrameSequence>;

/// Track, audio context and video wired into a fresh session
fn build_session(config: &PageConfig) -> PageSession {
    let now = Instant::now();
    let assets = &config.assets;

    let (media, context) = match AudioEngine::new() {
        Ok(engine) => (engine.media_element(assets.music_path()), Some(engine)),
        Err(e) => {
            warn!("Audio unavailable: {}", e);
            (BackgroundAudio::detached(assets.music_path()), None)
        }
    };

    let (video, video_failed) = match FrameSequence::load(&assets.video_dir(), assets.video_fps) {
        Ok(video) => (video, false),
        Err(e) => {
            debug!("Background video: {}", e);
            (FrameSequence::new(Vec::new(), assets.video_fps), true)
        }
    };

    let mut session = Session::new(config, media, context, video, now);
    if video_failed {
        session.handle(InputEvent::VideoFailed, now);
    }
    session
}

/// Touch every asset once so missing files show up early
fn preload_assets(assets: &AssetPaths) {
    match hound::WavReader::open(assets.music_path()) {
        Ok(reader) => debug!(
            "Preloaded {} ({} samples)",
            assets.music_path().display(),
            reader.len()
        ),
        Err(e) => debug!("Preload {} failed: {}", assets.music_path().display(), e),
    }
    match image::open(assets.profile_path()) {
        Ok(img) => debug!(
            "Preloaded {} ({}x{})",
            assets.profile_path().display(),
            img.width(),
            img.height()
        ),
        Err(e) => debug!("Preload {} failed: {}", assets.profile_path().display(), e),
    }
}

fn map_key(key: &LogicalKey) -> Key {
    match key {
        LogicalKey::Named(NamedKey::Space) => Key::Space,
        LogicalKey::Named(NamedKey::Enter) => Key::Enter,
        LogicalKey::Named(NamedKey::Escape) => Key::Escape,
        LogicalKey::Character(text) => text.chars().next().map_or(Key::Other, Key::Char),
        _ => Key::Other,
    }
}

/// Main application state
struct App {
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    session: PageSession,
    config: PageConfig,
    pointer: (f32, f32),
    hovered: Option<HoverTarget>,
    start_time: Instant,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: PageConfig) -> Self {
        Self {
            window: None,
            render_system: None,
            session: build_session(&config),
            config,
            pointer: (0.0, 0.0),
            hovered: None,
            start_time: Instant::now(),
            failure: None,
        }
    }

    fn viewport(&self) -> (f32, f32) {
        self.render_system.as_ref().map_or(
            (
                self.config.render.window_width as f32,
                self.config.render.window_height as f32,
            ),
            RenderSystem::size,
        )
    }

    fn dispatch(&mut self, event: InputEvent, event_loop: &ActiveEventLoop) {
        let commands = self.session.handle(event, Instant::now());
        self.run_commands(commands, event_loop);
    }

    fn run_commands(&mut self, commands: Vec<Command>, event_loop: &ActiveEventLoop) {
        for command in commands {
            match command {
                Command::Quit => event_loop.exit(),
                Command::HideSystemCursor => {
                    if let Some(window) = &self.window {
                        window.set_cursor_visible(false);
                    }
                }
                Command::ToggleFullscreen => {
                    let Some(window) = self.window.clone() else {
                        continue;
                    };
                    let entering = window.fullscreen().is_none();
                    window.set_fullscreen(entering.then_some(Fullscreen::Borderless(None)));
                    self.dispatch(InputEvent::FullscreenChanged(entering), event_loop);
                }
            }
        }
    }

    fn pointer_moved(&mut self, x: f32, y: f32, event_loop: &ActiveEventLoop) {
        self.pointer = (x, y);
        self.dispatch(InputEvent::PointerMoved { x, y }, event_loop);

        let target = hover_target(self.session.scene(), self.viewport(), x, y);
        if target != self.hovered {
            if let Some(previous) = self.hovered {
                self.dispatch(InputEvent::HoverLeave(previous), event_loop);
            }
            if let Some(next) = target {
                self.dispatch(InputEvent::HoverEnter(next), event_loop);
            }
            self.hovered = target;
        }
    }

    /// Advance the session and draw a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let commands = self.session.tick(Instant::now());
        self.run_commands(commands, event_loop);

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let time_s = self.start_time.elapsed().as_secs_f32();
        let quads = layout(self.session.scene(), render_system.size(), time_s);

        match render_system.render(&quads) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = render_system.size();
                render_system.resize(width as u32, height as u32);
            }
            Err(e) => warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.config.render.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.failure = Some(anyhow!(e).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => self.render_system = Some(render_system),
            Err(e) => {
                self.failure = Some(anyhow!(e).context("failed to initialise rendering"));
                event_loop.exit();
                return;
            }
        }

        info!("pulsepage is running (click or press space to enter, ESC to quit)");
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
                self.dispatch(InputEvent::Resized, event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x as f32, position.y as f32, event_loop);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = self.pointer;
                let target = click_target(self.session.scene(), self.viewport(), x, y);
                self.dispatch(InputEvent::Click(target), event_loop);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        repeat: false,
                        logical_key,
                        ..
                    },
                ..
            } => {
                self.dispatch(InputEvent::Key(map_key(&logical_key)), event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }
}

/// Windowless run: enter the site, tick at ~60 Hz and log the scene
fn run_headless(config: &PageConfig, seconds: f32) -> Result<()> {
    let duration =
        Duration::try_from_secs_f32(seconds).context("--headless expects a non-negative duration")?;
    let mut session = build_session(config);

    let start = Instant::now();
    session.handle(InputEvent::Click(Target::Landing), start);
    info!("Headless run for {:.1}s", seconds);

    let mut next_log = start;
    loop {
        let now = Instant::now();
        if now.duration_since(start) >= duration {
            break;
        }
        if session.tick(now).contains(&Command::Quit) {
            break;
        }
        if now >= next_log {
            info!("{}", session.scene().summary());
            next_log += Duration::from_secs(1);
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    info!(
        "Headless run finished (audio playing: {}, synthetic: {})",
        session.is_audio_playing(),
        session.is_synthetic()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsepage=info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config().context("failed to load configuration")?;
    preload_assets(&config.assets);

    if let Some(seconds) = args.headless {
        return run_headless(&config, seconds);
    }

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
