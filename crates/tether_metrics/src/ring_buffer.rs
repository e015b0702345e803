//! Sliding window of the most recent samples.

use std::time::Duration;

pub struct RingBuffer<T> {
    slots: Vec<T>,
    limit: usize,
    next: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// A window of at least one sample.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            slots: Vec::with_capacity(limit),
            limit,
            next: 0,
        }
    }

    /// Append `sample`, overwriting the oldest one once the window is full.
    pub fn push(&mut self, sample: T) {
        match self.slots.get_mut(self.next) {
            Some(slot) => *slot = sample,
            None => self.slots.push(sample),
        }
        self.next = (self.next + 1) % self.limit;
    }

    pub fn latest(&self) -> Option<T> {
        let last = self.next.checked_sub(1).unwrap_or(self.limit - 1);
        self.slots.get(last).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl RingBuffer<Duration> {
    pub fn average(&self) -> Duration {
        match self.slots.len() {
            0 => Duration::ZERO,
            n => self.slots.iter().sum::<Duration>() / n as u32,
        }
    }

    /// Shortest and longest sample, or zeros for an empty window.
    pub fn min_max(&self) -> (Duration, Duration) {
        self.slots
            .iter()
            .fold(None, |acc: Option<(Duration, Duration)>, &sample| {
                Some(match acc {
                    None => (sample, sample),
                    Some((lo, hi)) => (lo.min(sample), hi.max(sample)),
                })
            })
            .unwrap_or_default()
    }
}
