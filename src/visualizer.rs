//! Cooperative visualizer loop, polled once per displayed frame.
//!
//! Running the loop means the next poll may yield a frame; stopping it is the
//! only cancellation. The analyser is read on every poll, the synthetic
//! generator on a fixed interval.

use std::time::{Duration, Instant};

use crate::signal::{FrequencyFrame, SignalError, SignalSource};

#[derive(Debug)]
pub enum LoopState {
    Idle,
    Running {
        source: SignalSource,
        next_due: Instant,
    },
}

#[derive(Debug)]
pub struct VisualizerLoop {
    state: LoopState,
    synthetic_interval: Duration,
}

impl VisualizerLoop {
    pub fn new(synthetic_interval: Duration) -> Self {
        Self {
            state: LoopState::Idle,
            synthetic_interval,
        }
    }

    /// Enter `running`, replacing any current source
    pub fn start(&mut self, source: SignalSource, now: Instant) {
        self.state = LoopState::Running {
            source,
            next_due: now,
        };
    }

    /// Back to `idle`
    pub fn stop(&mut self) {
        self.state = LoopState::Idle;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(&self.state, LoopState::Running { source, .. } if source.is_synthetic())
    }

    /// Produce the frame due at `now`, if any
    pub fn poll(&mut self, now: Instant) -> Result<Option<FrequencyFrame>, SignalError> {
        let LoopState::Running { source, next_due } = &mut self.state else {
            return Ok(None);
        };
        if now < *next_due {
            return Ok(None);
        }

        let frame = source.next_frame()?;
        *next_due = if source.is_synthetic() {
            now + self.synthetic_interval
        } else {
            now
        };
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalyserConfig;
    use crate::signal::{Analyser, SampleTap, SyntheticSignal};

    #[test]
    fn test_idle_loop_yields_nothing() {
        let mut vis = VisualizerLoop::new(Duration::from_millis(50));
        assert!(!vis.is_running());
        assert!(vis.poll(Instant::now()).unwrap().is_none());
    }

    #[test]
    fn test_synthetic_runs_on_interval() {
        let mut vis = VisualizerLoop::new(Duration::from_millis(50));
        let t0 = Instant::now();
        vis.start(SignalSource::Synthetic(SyntheticSignal::with_seed(1)), t0);
        assert!(vis.is_synthetic());

        assert!(vis.poll(t0).unwrap().is_some());
        assert!(vis.poll(t0 + Duration::from_millis(16)).unwrap().is_none());
        assert!(vis.poll(t0 + Duration::from_millis(50)).unwrap().is_some());
    }

    #[test]
    fn test_analyser_runs_every_poll() {
        let config = AnalyserConfig::default();
        let analyser = Analyser::new(SampleTap::new(config.fft_size), config);
        let mut vis = VisualizerLoop::new(Duration::from_millis(50));
        let t0 = Instant::now();
        vis.start(SignalSource::Analyser(analyser), t0);

        assert!(vis.poll(t0).unwrap().is_some());
        assert!(vis.poll(t0 + Duration::from_millis(1)).unwrap().is_some());
        assert!(!vis.is_synthetic());
    }

    #[test]
    fn test_stop_ends_the_loop() {
        let mut vis = VisualizerLoop::new(Duration::from_millis(50));
        let t0 = Instant::now();
        vis.start(SignalSource::Synthetic(SyntheticSignal::with_seed(1)), t0);
        vis.stop();

        assert!(!vis.is_running());
        assert!(vis.poll(t0 + Duration::from_secs(1)).unwrap().is_none());
    }
}
