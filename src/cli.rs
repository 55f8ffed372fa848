//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::params::{ConfigError, PageConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pulsepage")]
#[command(about = "Audio-reactive personal landing page", long_about = None)]
pub struct Args {
    /// TOML config file (missing keys keep their defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Asset directory (music, video frames, profile picture)
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Run without a window for this long (seconds), logging the scene
    #[arg(long, value_name = "SECONDS")]
    pub headless: Option<f32>,

    /// Keep the system cursor instead of drawing the custom one
    #[arg(long)]
    pub no_custom_cursor: bool,

    /// Do not start the music when entering the site
    #[arg(long)]
    pub no_autoplay: bool,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<PageConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PageConfig::load(path)?,
            None => PageConfig::default(),
        };

        if let Some(root) = &self.assets {
            config.assets = config.assets.with_root(root);
        }
        if self.no_custom_cursor {
            config.render.custom_cursor = false;
        }
        if self.no_autoplay {
            config.playback.autoplay_on_entry = false;
        }
        Ok(config)
    }
}
