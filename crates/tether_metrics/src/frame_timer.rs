//! Wall-clock cost of whole frames, as opposed to the per-system split.

use super::ring_buffer::RingBuffer;
use crate::FrameStats;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    started: Option<Instant>,
    window: RingBuffer<Duration>,
    frames: u64,
}

impl FrameTimer {
    /// Keep the last `window` frames for the rolling figures.
    pub fn new(window: usize) -> Self {
        Self {
            started: None,
            window: RingBuffer::new(window),
            frames: 0,
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the frame opened by `begin`. Without a matching `begin` nothing
    /// is recorded.
    pub fn end(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.window.push(elapsed);
        self.frames += 1;
        elapsed
    }

    /// Frames closed since creation, not just the ones in the window.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stats(&self) -> FrameStats {
        let average = self.window.average();
        let (fastest, slowest) = self.window.min_max();
        let secs = average.as_secs_f64();
        FrameStats {
            fps: if secs > 0.0 { 1.0 / secs } else { 0.0 },
            average,
            fastest,
            slowest,
        }
    }
}
