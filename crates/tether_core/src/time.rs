//! Deterministic frame clock
//!
//! Frame time is accumulated and consumed in fixed ticks (60 Hz by default),
//! capped per frame so a long stall cannot spiral.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
pub const DEFAULT_MAX_STEPS: u32 = 5;

pub struct FrameClock {
    fixed_dt: f32,
    max_steps: u32,
    accumulator: f32,
    dt: f32,
    steps: u32,
    time_scale: f32,
    run_time: f32,
    tick_count: u64,
}

impl FrameClock {
    pub fn new(tick_rate_hz: u32, max_steps: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate_hz.max(1) as f32,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
            dt: 0.0,
            steps: 0,
            time_scale: 1.0,
            run_time: 0.0,
            tick_count: 0,
        }
    }

    /// Feed one frame's wall time and return how many fixed steps it covers.
    pub fn advance(&mut self, frame: Duration) -> u32 {
        self.dt = frame.as_secs_f32() * self.time_scale;
        self.accumulator += self.dt;
        self.steps = 0;
        while self.accumulator >= self.fixed_dt && self.steps < self.max_steps {
            self.accumulator -= self.fixed_dt;
            self.steps += 1;
            self.tick_count += 1;
        }
        if self.steps == self.max_steps {
            // Drop the backlog we could not simulate.
            self.accumulator = self.accumulator.min(self.fixed_dt);
        }
        self.steps
    }

    /// Scaled duration of the last frame in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Fixed steps produced by the last `advance`.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Seconds spent in the running game state.
    pub fn run_time(&self) -> f32 {
        self.run_time
    }

    pub(crate) fn add_run_time(&mut self) {
        self.run_time += self.dt;
    }

    pub(crate) fn reset_run_time(&mut self) {
        self.run_time = 0.0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ, DEFAULT_MAX_STEPS)
    }
}
