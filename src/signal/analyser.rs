//! FFT analyser producing byte magnitudes from the live track.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use super::{FrequencyFrame, SignalError, FRAME_LEN};
use crate::params::AnalyserConfig;

/// Shared buffer of the most recent mono samples routed to the analyser.
///
/// Filled by the audio callback, read by the analyser on the UI thread.
#[derive(Clone, Debug)]
pub struct SampleTap {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append samples, dropping the oldest beyond capacity
    pub fn extend(&self, samples: &[f32]) {
        // A poisoned tap is reported on the reading side
        let Ok(mut buf) = self.samples.lock() else {
            return;
        };
        buf.extend(samples.iter().copied());
        let excess = buf.len().saturating_sub(self.capacity);
        buf.drain(..excess);
    }

    /// Copy the latest `out.len()` samples into `out`, zero-padding the front
    pub fn snapshot(&self, out: &mut [f32]) -> Result<(), SignalError> {
        let buf = self.samples.lock().map_err(|_| SignalError::TapPoisoned)?;
        let available = buf.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        for (dst, src) in out[pad..].iter_mut().zip(buf.iter().skip(buf.len() - available)) {
            *dst = *src;
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Analyser node: windowed FFT, time smoothing, dB-to-byte mapping
pub struct Analyser {
    tap: SampleTap,
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new(tap: SampleTap, config: AnalyserConfig) -> Self {
        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let window = (0..size).map(|i| blackman_window(i, size)).collect();

        Self {
            tap,
            fft,
            window,
            samples: vec![0.0; size],
            buffer: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; config.bin_count()],
            config,
        }
    }

    /// Analyse the latest tap contents
    pub fn next_frame(&mut self) -> Result<FrequencyFrame, SignalError> {
        self.tap.snapshot(&mut self.samples)?;
        Ok(self.analyse_current())
    }

    /// Analyse an explicit block of samples (length must equal the FFT size)
    pub fn analyse(&mut self, samples: &[f32]) -> FrequencyFrame {
        let n = self.samples.len().min(samples.len());
        self.samples[..n].copy_from_slice(&samples[..n]);
        self.samples[n..].fill(0.0);
        self.analyse_current()
    }

    fn analyse_current(&mut self) -> FrequencyFrame {
        let size = self.config.fft_size;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(self.samples[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing;
        let range = self.config.max_decibels - self.config.min_decibels;
        let scale = 255.0 / range;

        FrequencyFrame::from_fn(|k| {
            if k >= self.smoothed.len() {
                return 0;
            }
            let magnitude = self.buffer[k].norm() / size as f32;
            self.smoothed[k] = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            let db = 20.0 * self.smoothed[k].max(f32::MIN_POSITIVE).log10();
            ((db - self.config.min_decibels) * scale).clamp(0.0, 255.0) as u8
        })
    }

    pub fn bin_count(&self) -> usize {
        FRAME_LEN.min(self.smoothed.len())
    }
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
