//! Audio playback and analyser routing.
//!
//! The session talks to audio through two seams: a [`MediaElement`] (the
//! background track) and an [`AudioContext`] (output graph, analyser
//! connection, synthetic tone). [`AudioEngine`] implements both over cpal.

mod synthesis;
mod system;

use thiserror::Error;

use crate::signal::SampleTap;

// Re-export public types
pub use synthesis::tone_composition;
pub use system::{AudioEngine, BackgroundAudio};

/// Errors raised by the audio context
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to get audio config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause audio stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),

    #[error("glicol engine init failed: {0}")]
    Synth(String),

    #[error("media element is already connected to the analyser")]
    AlreadyConnected,

    #[error("audio context is closed")]
    Closed,

    #[error("audio state lock poisoned")]
    Poisoned,
}

/// Errors raised by the background track
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no playable track loaded ({0})")]
    NotLoaded(String),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Lifecycle of the output graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// The background track
pub trait MediaElement {
    /// Make sure the resource is decoded (best-effort, errors surface on `play`)
    fn load(&mut self);

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Playback position (seconds)
    fn current_time(&self) -> f64;

    fn set_volume(&mut self, volume: f32);
}

/// The output graph the track and tone play through
pub trait AudioContext {
    fn state(&self) -> ContextState;

    /// Resume a suspended graph without rebuilding it
    fn resume(&mut self) -> Result<(), AudioError>;

    /// Route the track into a new analyser tap. Allowed once per context.
    fn connect_media(&mut self, tap_capacity: usize) -> Result<SampleTap, AudioError>;

    fn start_tone(&mut self, frequency_hz: f32, gain: f32) -> Result<(), AudioError>;

    fn stop_tone(&mut self);
}
