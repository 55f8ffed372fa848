//! cpal output engine: background track, analyser tap and synthetic tone.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::synthesis::tone_composition;
use super::{AudioContext, AudioError, ContextState, MediaElement, PlaybackError};
use crate::params::audio_constants::BLOCK_SIZE;
use crate::signal::SampleTap;

/// Decoded background track (stereo frames)
struct Track {
    frames: Vec<[f32; 2]>,
    sample_rate: u32,
}

/// State shared between the UI thread and the audio callback
struct Mixer {
    device_rate: u32,
    track: Option<Track>,
    /// Read position in track frames (fractional for resampling)
    position: f64,
    paused: bool,
    volume: f32,
    tap: Option<SampleTap>,
    tone: Option<Engine<BLOCK_SIZE>>,
    tone_block: [f32; BLOCK_SIZE],
    tone_cursor: usize,
    scratch: Vec<f32>,
}

impl Mixer {
    fn new(device_rate: u32) -> Self {
        Self {
            device_rate,
            track: None,
            position: 0.0,
            paused: true,
            volume: 1.0,
            tap: None,
            tone: None,
            tone_block: [0.0; BLOCK_SIZE],
            tone_cursor: BLOCK_SIZE,
            scratch: Vec::new(),
        }
    }

    fn connect_tap(&mut self, capacity: usize) -> Result<SampleTap, AudioError> {
        if self.tap.is_some() {
            return Err(AudioError::AlreadyConnected);
        }
        let tap = SampleTap::new(capacity);
        self.tap = Some(tap.clone());
        Ok(tap)
    }

    fn current_time(&self) -> f64 {
        self.track
            .as_ref()
            .map_or(0.0, |t| self.position / t.sample_rate as f64)
    }

    /// Next track frame, linearly resampled to the device rate
    fn next_track_frame(&mut self) -> [f32; 2] {
        let Some(track) = self.track.as_ref() else {
            return [0.0; 2];
        };
        let len = track.frames.len();
        if self.paused || len == 0 {
            return [0.0; 2];
        }

        let index = self.position as usize % len;
        let frac = (self.position - self.position.floor()) as f32;
        let a = track.frames[index];
        let b = track.frames[(index + 1) % len];
        let out = [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
        ];

        // Loop the track
        self.position += track.sample_rate as f64 / self.device_rate as f64;
        if self.position >= len as f64 {
            self.position -= len as f64;
        }
        out
    }

    fn next_tone_sample(&mut self) -> f32 {
        let Some(engine) = self.tone.as_mut() else {
            return 0.0;
        };
        if self.tone_cursor >= BLOCK_SIZE {
            let (buffers, _) = engine.next_block(vec![]);
            for i in 0..BLOCK_SIZE {
                self.tone_block[i] = buffers[0][i];
            }
            self.tone_cursor = 0;
        }
        let sample = self.tone_block[self.tone_cursor];
        self.tone_cursor += 1;
        sample
    }

    /// Fill an interleaved output buffer
    fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = data.len() / channels;
        self.scratch.clear();

        for frame in 0..frames {
            let [l, r] = self.next_track_frame();
            let (l, r) = (l * self.volume, r * self.volume);
            let tone = self.next_tone_sample();

            // Safety limiter: hard clip to ±1.0
            let left = (l + tone).clamp(-1.0, 1.0);
            let right = (r + tone).clamp(-1.0, 1.0);

            for c in 0..channels {
                data[frame * channels + c] = if c % 2 == 0 { left } else { right };
            }

            if self.tap.is_some() {
                self.scratch.push((l + r) * 0.5);
            }
        }

        if let Some(tap) = &self.tap {
            tap.extend(&self.scratch);
        }
    }
}

/// Decode a WAV file into stereo frames
fn decode_wav(path: &Path) -> Result<Track, PlaybackError> {
    let decode_err = |source| PlaybackError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = hound::WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_err)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(decode_err)?
        }
    };

    let frames = raw
        .chunks(channels)
        .map(|c| [c[0], if c.len() > 1 { c[1] } else { c[0] }])
        .collect();

    Ok(Track {
        frames,
        sample_rate: spec.sample_rate.max(1),
    })
}

/// Output graph on the default cpal device
pub struct AudioEngine {
    mixer: Arc<Mutex<Mixer>>,

    /// Audio output stream (kept alive)
    stream: cpal::Stream,

    state: ContextState,
}

impl AudioEngine {
    /// Build the output stream; the context starts suspended
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate)));
        let mixer_cb = Arc::clone(&mixer);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match mixer_cb.lock() {
                Ok(mut mixer) => mixer.render(data, channels),
                Err(_) => data.fill(0.0),
            },
            |err| warn!("Audio stream error: {}", err),
            None,
        )?;
        stream.pause()?;

        Ok(Self {
            mixer,
            stream,
            state: ContextState::Suspended,
        })
    }

    /// Background track element playing through this context
    pub fn media_element(&self, path: impl Into<PathBuf>) -> BackgroundAudio {
        BackgroundAudio::new(Arc::clone(&self.mixer), path.into())
    }

    /// Stop output for good
    pub fn close(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!("Pausing stream on close failed: {}", e);
        }
        self.state = ContextState::Closed;
    }
}

impl AudioContext for AudioEngine {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            ContextState::Closed => Err(AudioError::Closed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.stream.play()?;
                self.state = ContextState::Running;
                debug!("Audio context resumed");
                Ok(())
            }
        }
    }

    fn connect_media(&mut self, tap_capacity: usize) -> Result<SampleTap, AudioError> {
        let mut mixer = self.mixer.lock().map_err(|_| AudioError::Poisoned)?;
        mixer.connect_tap(tap_capacity)
    }

    fn start_tone(&mut self, frequency_hz: f32, gain: f32) -> Result<(), AudioError> {
        let mut mixer = self.mixer.lock().map_err(|_| AudioError::Poisoned)?;

        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(mixer.device_rate as usize);
        engine.update_with_code(&tone_composition(frequency_hz, gain));
        engine
            .update()
            .map_err(|e| AudioError::Synth(format!("{:?}", e)))?;

        mixer.tone = Some(engine);
        mixer.tone_cursor = BLOCK_SIZE;
        Ok(())
    }

    fn stop_tone(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.tone = None;
        }
    }
}

/// The background track, decoded lazily on `load`
pub struct BackgroundAudio {
    mixer: Arc<Mutex<Mixer>>,
    path: PathBuf,
    load_error: Option<String>,
}

impl BackgroundAudio {
    fn new(mixer: Arc<Mutex<Mixer>>, path: PathBuf) -> Self {
        Self {
            mixer,
            path,
            load_error: None,
        }
    }

    /// Decode with `decode` unless a track is already installed.
    /// The mixer is only locked around the checks, never during decoding.
    fn load_with(&mut self, decode: impl FnOnce(&Path) -> Result<Track, PlaybackError>) {
        match self.mixer.lock() {
            Ok(mixer) if mixer.track.is_some() => return,
            Ok(_) => {}
            Err(_) => return,
        }

        let track = match decode(&self.path) {
            Ok(track) => track,
            Err(e) => {
                warn!("{}", e);
                self.load_error = Some(e.to_string());
                return;
            }
        };

        info!(
            "Track: {} ({} frames @ {}Hz)",
            self.path.display(),
            track.frames.len(),
            track.sample_rate
        );
        let Ok(mut mixer) = self.mixer.lock() else {
            return;
        };
        if mixer.track.is_none() {
            mixer.track = Some(track);
        }
        self.load_error = None;
    }

    /// Track with no output graph behind it (position never advances)
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(Mutex::new(Mixer::new(48_000))), path.into())
    }
}

impl MediaElement for BackgroundAudio {
    fn load(&mut self) {
        self.load_with(decode_wav);
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut mixer = self
            .mixer
            .lock()
            .map_err(|_| PlaybackError::Rejected("audio state lock poisoned".to_string()))?;
        if mixer.track.is_none() {
            let reason = self
                .load_error
                .clone()
                .unwrap_or_else(|| format!("{} not loaded", self.path.display()));
            return Err(PlaybackError::NotLoaded(reason));
        }
        mixer.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.paused = true;
        }
    }

    fn is_paused(&self) -> bool {
        self.mixer.lock().map_or(true, |m| m.paused)
    }

    fn current_time(&self) -> f64 {
        self.mixer.lock().map_or(0.0, |m| m.current_time())
    }

    fn set_volume(&mut self, volume: f32) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.volume = volume.clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer_with_track(frames: Vec<[f32; 2]>, rate: u32, device_rate: u32) -> Mixer {
        let mut mixer = Mixer::new(device_rate);
        mixer.track = Some(Track {
            frames,
            sample_rate: rate,
        });
        mixer
    }

    #[test]
    fn test_paused_mixer_is_silent() {
        let mut mixer = mixer_with_track(vec![[0.5, 0.5]; 64], 48000, 48000);
        let mut out = [1.0f32; 16];
        mixer.render(&mut out, 2);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.current_time(), 0.0);
    }

    #[test]
    fn test_playing_mixer_advances_and_feeds_tap() {
        let mut mixer = mixer_with_track(vec![[0.5, 0.25]; 64], 48000, 48000);
        let tap = mixer.connect_tap(8).unwrap();
        mixer.paused = false;
        mixer.volume = 0.5;

        let mut out = [0.0f32; 8];
        mixer.render(&mut out, 2);

        assert_eq!(&out[..2], &[0.25, 0.125]);
        assert!(mixer.current_time() > 0.0);

        let mut seen = [0.0f32; 4];
        tap.snapshot(&mut seen).unwrap();
        assert_eq!(seen, [0.1875; 4]);
    }

    #[test]
    fn test_connect_once() {
        let mut mixer = Mixer::new(48000);
        assert!(mixer.connect_tap(16).is_ok());
        assert!(matches!(
            mixer.connect_tap(16),
            Err(AudioError::AlreadyConnected)
        ));
    }

    #[test]
    fn test_resamples_to_device_rate() {
        let mut mixer = mixer_with_track(vec![[0.0, 0.0], [1.0, 1.0]], 24000, 48000);
        mixer.paused = false;

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, 2);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_track_loops() {
        let mut mixer = mixer_with_track(vec![[0.1, 0.1]; 4], 48000, 48000);
        mixer.paused = false;

        let mut out = [0.0f32; 20];
        mixer.render(&mut out, 2);
        assert!(mixer.position < 4.0);
        assert!(out.iter().all(|&s| (s - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_decode_wav_and_play() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..800 {
            writer.write_sample(16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = decode_wav(&path).unwrap();
        assert_eq!(track.frames.len(), 800);
        assert_eq!(track.frames[0], [0.5, 0.5]);

        let mixer = Arc::new(Mutex::new(Mixer::new(8000)));
        let mut media = BackgroundAudio::new(Arc::clone(&mixer), path);
        media.load();
        assert!(media.play().is_ok());
        assert!(!media.is_paused());
        media.pause();
        assert!(media.is_paused());
    }

    #[test]
    fn test_mixer_unlocked_while_decoding() {
        let mixer = Arc::new(Mutex::new(Mixer::new(48000)));
        let mut media = BackgroundAudio::new(Arc::clone(&mixer), PathBuf::from("music.wav"));

        let mut decoded = false;
        media.load_with(|_| {
            decoded = true;
            assert!(mixer.try_lock().is_ok());
            Ok(Track {
                frames: vec![[0.0, 0.0]; 16],
                sample_rate: 48000,
            })
        });

        assert!(decoded);
        assert!(media.play().is_ok());

        // Already installed: no second decode
        media.load_with(|_| panic!("track decoded twice"));
    }

    #[test]
    fn test_missing_file_rejects_play() {
        let mixer = Arc::new(Mutex::new(Mixer::new(48000)));
        let mut media = BackgroundAudio::new(mixer, PathBuf::from("/nonexistent/track.wav"));
        media.load();
        assert!(matches!(media.play(), Err(PlaybackError::NotLoaded(_))));
        assert!(media.is_paused());
        assert_eq!(media.current_time(), 0.0);
    }
}
