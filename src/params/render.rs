//! Rendering, scene and asset configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Window title
    pub title: String,

    /// Draw the custom cursor and hide the system one
    pub custom_cursor: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            title: "pulsepage".to_string(),
            custom_cursor: true,
        }
    }
}

/// Element counts of the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Beat bars under the bio
    pub bar_count: usize,

    /// Floating background particles
    pub particle_count: usize,

    /// Social links in the link row
    pub social_link_count: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            bar_count: 8,
            particle_count: 12,
            social_link_count: 4,
        }
    }
}

/// Asset locations, relative to the asset root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Asset root directory
    pub root: PathBuf,

    /// Background track (WAV)
    pub music: PathBuf,

    /// Directory of background video frames
    pub video_frames: PathBuf,

    /// Profile picture
    pub profile: PathBuf,

    /// Video frame rate (FPS)
    pub video_fps: f32,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            music: PathBuf::from("background-music.wav"),
            video_frames: PathBuf::from("background-video"),
            profile: PathBuf::from("profile.jpg"),
            video_fps: 24.0,
        }
    }
}

impl AssetPaths {
    pub fn music_path(&self) -> PathBuf {
        self.root.join(&self.music)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join(&self.video_frames)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.root.join(&self.profile)
    }

    /// Replace the asset root, keeping relative names
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = root.to_path_buf();
        self
    }
}
