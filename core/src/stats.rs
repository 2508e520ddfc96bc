//! Scheduler-owned observability counters, exposed read-only to the
//! host. Grounded on the teacher's `RateMeter`
//! (`shared/src/meter.rs`): a sliding window over timestamped samples
//! that yields a rolling rate, reused here for the emitted-frame rate.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Sample {
    at: Instant,
}

/// Rolling emission-rate estimator over a trailing time window.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    samples: VecDeque<Sample>,
}

impl RateMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    pub fn record(&mut self) {
        let now = Instant::now();
        self.samples.push_back(Sample { at: now });
        while let Some(oldest) = self.samples.front() {
            if now.duration_since(oldest.at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Frames per second observed within the trailing window.
    pub fn rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.len() as f64 / self.window.as_secs_f64()
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Mux-wide counters the scheduler updates once per tick and the host
/// reads at any time.
#[derive(Debug, Default)]
pub struct MuxStats {
    pub frames_emitted: u64,
    pub underruns: u64,
    pub reader_faults: u64,
    pub sink_faults: u64,
    frame_rate: RateMeter,
}

impl MuxStats {
    pub fn record_frame_emitted(&mut self) {
        self.frames_emitted += 1;
        self.frame_rate.record();
    }

    pub fn record_underrun(&mut self) {
        self.underruns += 1;
    }

    pub fn record_reader_fault(&mut self) {
        self.reader_faults += 1;
    }

    pub fn record_sink_fault(&mut self) {
        self.sink_faults += 1;
    }

    pub fn frames_per_second(&self) -> f64 {
        self.frame_rate.rate()
    }
}
