//! Colors and the dominant palette sampled from the background video.

use image::{imageops, imageops::FilterType, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Longest side of the sampling thumbnail (pixels)
pub const SAMPLE_SIZE: u32 = 100;

/// Errors raised by video frame sources
#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("failed to read video frames from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode video frame: {0}")]
    Decode(#[from] image::ImageError),

    #[error("no video frames in {0}")]
    Empty(PathBuf),
}

/// sRGB color with CSS channel values (0-255, fractional allowed)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255.0, 255.0, 255.0);
    pub const LIGHT_GRAY: Color = Color::rgb(204.0, 204.0, 204.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 255.0, 255.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`
    pub fn hex(value: u32) -> Self {
        Self::rgb(
            ((value >> 16) & 0xff) as f32,
            ((value >> 8) & 0xff) as f32,
            (value & 0xff) as f32,
        )
    }

    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    /// Multiply channels, as a CSS `brightness()` filter does
    pub fn scaled(&self, factor: f32) -> Self {
        Self::rgb(
            (self.r * factor).clamp(0.0, 255.0),
            (self.g * factor).clamp(0.0, 255.0),
            (self.b * factor).clamp(0.0, 255.0),
        )
    }

    /// CSS `hue-rotate()` filter matrix
    pub fn hue_rotated(&self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let m = [
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ];
        let apply = |row: [f32; 3]| {
            (row[0] * self.r + row[1] * self.g + row[2] * self.b).clamp(0.0, 255.0)
        };
        Self::rgb(apply(m[0]), apply(m[1]), apply(m[2]))
    }

    /// Linear-light RGBA for an sRGB render target
    pub fn to_linear(&self, alpha: f32) -> [f32; 4] {
        [
            srgb_to_linear(self.r / 255.0),
            srgb_to_linear(self.g / 255.0),
            srgb_to_linear(self.b / 255.0),
            alpha,
        ]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Three tints derived from the average color of a video frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
}

impl Palette {
    /// Used while no video frame can be read
    pub const FALLBACK: Palette = Palette {
        primary: Color::WHITE,
        secondary: Color::LIGHT_GRAY,
        accent: Color::WHITE,
    };

    /// Tints keep the page close to black and white while following the video
    pub fn from_average(r: u32, g: u32, b: u32) -> Self {
        let tint = |base: f32, divisor: f32| {
            Color::rgb(
                (base + r as f32 / divisor).min(255.0),
                (base + g as f32 / divisor).min(255.0),
                (base + b as f32 / divisor).min(255.0),
            )
        };
        Self {
            primary: tint(200.0, 5.0),
            secondary: tint(150.0, 3.0),
            accent: tint(180.0, 4.0),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Anything that can hand out the current video frame
pub trait VideoSource {
    /// `Ok(None)` while no frame is being decoded yet
    fn frame(&mut self, now: Instant) -> Result<Option<&RgbaImage>, PaletteError>;
}

/// Video that never produces frames
#[derive(Debug, Default)]
pub struct NoVideo;

impl VideoSource for NoVideo {
    fn frame(&mut self, _now: Instant) -> Result<Option<&RgbaImage>, PaletteError> {
        Ok(None)
    }
}

/// Directory of still frames played back in a loop
pub struct FrameSequence {
    frames: Vec<RgbaImage>,
    fps: f32,
    started: Option<Instant>,
}

impl FrameSequence {
    pub fn new(frames: Vec<RgbaImage>, fps: f32) -> Self {
        Self {
            frames,
            fps: fps.max(0.001),
            started: None,
        }
    }

    /// Load every decodable image in `dir`, ordered by file name
    pub fn load(dir: &Path, fps: f32) -> Result<Self, PaletteError> {
        let entries = fs::read_dir(dir).map_err(|source| PaletteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match image::open(path) {
                Ok(img) => frames.push(img.to_rgba8()),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        if frames.is_empty() {
            return Err(PaletteError::Empty(dir.to_path_buf()));
        }

        info!("Video: {} frames @ {} fps", frames.len(), fps);
        Ok(Self::new(frames, fps))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl VideoSource for FrameSequence {
    fn frame(&mut self, now: Instant) -> Result<Option<&RgbaImage>, PaletteError> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started).as_secs_f32();
        let index = (elapsed * self.fps) as usize % self.frames.len();
        Ok(self.frames.get(index))
    }
}

/// Sample the current video frame, falling back to black and white
pub fn sample_palette<V: VideoSource + ?Sized>(video: &mut V, now: Instant) -> Palette {
    match video.frame(now) {
        Ok(Some(frame)) if frame.width() > 0 && frame.height() > 0 => average_palette(frame),
        Ok(_) => Palette::FALLBACK,
        Err(e) => {
            debug!("Palette sampling failed: {}", e);
            Palette::FALLBACK
        }
    }
}

/// Average a frame downscaled to at most [`SAMPLE_SIZE`] per side
pub fn average_palette(frame: &RgbaImage) -> Palette {
    let width = frame.width().min(SAMPLE_SIZE);
    let height = frame.height().min(SAMPLE_SIZE);

    let thumb;
    let pixels = if width == frame.width() && height == frame.height() {
        frame
    } else {
        thumb = imageops::resize(frame, width, height, FilterType::Nearest);
        &thumb
    };

    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for px in pixels.pixels() {
        r += px[0] as u64;
        g += px[1] as u64;
        b += px[2] as u64;
    }
    let count = (pixels.width() as u64 * pixels.height() as u64).max(1);

    Palette::from_average((r / count) as u32, (g / count) as u32, (b / count) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_solid_color_converges_regardless_of_resolution() {
        let expected = Palette::from_average(40, 120, 255);
        for (w, h) in [(1, 1), (64, 48), (100, 100), (1920, 1080)] {
            assert_eq!(average_palette(&solid(w, h, [40, 120, 255])), expected);
        }
    }

    #[test]
    fn test_small_frame_sampled_at_own_size() {
        // Stretching 3x1 to 100x100 would weight the pixels 33/34/33
        let frame = RgbaImage::from_fn(3, 1, |x, _| {
            if x == 2 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        assert_eq!(average_palette(&frame), Palette::from_average(85, 85, 85));
    }

    #[test]
    fn test_offsets_and_clamp() {
        let palette = Palette::from_average(255, 0, 100);
        assert_eq!(palette.primary, Color::rgb(251.0, 200.0, 220.0));
        assert_eq!(palette.secondary, Color::rgb(235.0, 150.0, 150.0 + 100.0 / 3.0));
        assert_eq!(palette.accent, Color::rgb(243.75, 180.0, 205.0));

        let white = Palette::from_average(255, 255, 255);
        assert!(white.secondary.r <= 255.0);
        assert_eq!(white.primary, Color::rgb(251.0, 251.0, 251.0));
    }

    #[test]
    fn test_no_frames_uses_fallback() {
        assert_eq!(sample_palette(&mut NoVideo, Instant::now()), Palette::FALLBACK);
        assert_eq!(Palette::FALLBACK.secondary.to_css(), "rgb(204, 204, 204)");
    }

    #[test]
    fn test_sequence_advances_with_time() {
        let mut video = FrameSequence::new(
            vec![solid(4, 4, [0, 0, 0]), solid(4, 4, [255, 255, 255])],
            2.0,
        );
        let t0 = Instant::now();

        let first = sample_palette(&mut video, t0);
        let second = sample_palette(&mut video, t0 + std::time::Duration::from_millis(600));
        assert_eq!(first, Palette::from_average(0, 0, 0));
        assert_eq!(second, Palette::from_average(255, 255, 255));
    }

    #[test]
    fn test_load_missing_dir() {
        let err = FrameSequence::load(Path::new("/nonexistent/frames"), 24.0).err();
        assert!(matches!(err, Some(PaletteError::Io { .. })));
    }

    #[test]
    fn test_load_dir_of_frames() {
        let dir = tempfile::tempdir().unwrap();
        solid(8, 8, [10, 20, 30]).save(dir.path().join("0001.png")).unwrap();
        solid(8, 8, [30, 20, 10]).save(dir.path().join("0002.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let video = FrameSequence::load(dir.path(), 24.0).unwrap();
        assert_eq!(video.len(), 2);
    }

    #[test]
    fn test_hue_rotation_full_turn_is_identity() {
        let c = Color::rgb(200.0, 40.0, 90.0);
        let rotated = c.hue_rotated(360.0);
        assert!((rotated.r - c.r).abs() < 0.5);
        assert!((rotated.g - c.g).abs() < 0.5);
        assert!((rotated.b - c.b).abs() < 0.5);
    }
}
