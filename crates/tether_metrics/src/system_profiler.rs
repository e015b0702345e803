//! Per-system frame timings
//!
//! Systems are reported in the order they were first timed, which matches
//! the order the world updates them.

use super::ring_buffer::RingBuffer;
use crate::SystemTiming;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const HISTORY: usize = 120;

pub struct SystemProfiler {
    order: Vec<String>,
    frame: HashMap<String, Duration>,
    history: HashMap<String, RingBuffer<Duration>>,
    frame_total: Duration,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            frame: HashMap::new(),
            history: HashMap::new(),
            frame_total: Duration::ZERO,
        }
    }

    /// Start a new frame; per-frame accumulators are cleared, history is kept.
    pub fn begin_frame(&mut self) {
        for (name, elapsed) in self.frame.drain() {
            self.history
                .entry(name)
                .or_insert_with(|| RingBuffer::new(HISTORY))
                .push(elapsed);
        }
        self.frame_total = Duration::ZERO;
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn record(&mut self, name: &str, elapsed: Duration) {
        if !self.frame.contains_key(name) && !self.history.contains_key(name) {
            self.order.push(name.to_string());
        }
        *self.frame.entry(name.to_string()).or_insert(Duration::ZERO) += elapsed;
        self.frame_total += elapsed;
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.frame.get(name).copied().unwrap_or(Duration::ZERO)
    }

    pub fn frame_total(&self) -> Duration {
        self.frame_total
    }

    pub fn report(&self) -> Vec<SystemTiming> {
        let total = self.frame_total.as_secs_f64();
        self.order
            .iter()
            .map(|name| {
                let last_frame = self.get_timing(name);
                let average = self
                    .history
                    .get(name)
                    .map(|h| h.average())
                    .unwrap_or(last_frame);
                let share = if total > 0.0 {
                    last_frame.as_secs_f64() / total * 100.0
                } else {
                    0.0
                };
                SystemTiming {
                    name: name.clone(),
                    last_frame,
                    average,
                    share,
                }
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.order.clear();
        self.frame.clear();
        self.history.clear();
        self.frame_total = Duration::ZERO;
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}
