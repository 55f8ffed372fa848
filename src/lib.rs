//! pulsepage library - audio-reactive landing page

pub mod audio;
pub mod cli;
pub mod layout;
pub mod mapper;
pub mod palette;
pub mod params;
pub mod rendering;
pub mod scene;
pub mod session;
pub mod signal;
pub mod timers;
pub mod visualizer;
