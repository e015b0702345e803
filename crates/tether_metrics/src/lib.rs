//! Tether Metrics - per-system timing for the frame loop
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in shipping builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tether_metrics::{time_scope, SystemProfiler};
//!
//! let mut profiler = SystemProfiler::new();
//! profiler.begin_frame();
//! time_scope!(profiler, "physics", {
//!     // ... run the system ...
//! });
//! for timing in profiler.report() {
//!     println!("{}: {:.1}%", timing.name, timing.share);
//! }
//! ```
//!
//! Without the `metrics` feature, all instrumentation compiles down to the
//! wrapped body.

use std::time::Duration;

#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;

/// Snapshot of one system's timings.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTiming {
    pub name: String,
    pub last_frame: Duration,
    pub average: Duration,
    /// Share of the last frame's total system time, in percent.
    pub share: f64,
}

/// Rolling whole-frame figures from a [`FrameTimer`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub fps: f64,
    pub average: Duration,
    pub fastest: Duration,
    pub slowest: Duration,
}

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

/// Time a statement block under `$name` (zero-cost when metrics disabled).
///
/// Use in statement position; the block's value is discarded.
#[macro_export]
macro_rules! time_scope {
    ($profiler:expr, $name:expr, $body:block) => {
        #[cfg(feature = "metrics")]
        {
            $profiler.time_system($name, || $body);
        }
        #[cfg(not(feature = "metrics"))]
        {
            let _ = &$profiler;
            $body;
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) -> Duration { Duration::ZERO }
    pub fn frames(&self) -> u64 { 0 }
    pub fn stats(&self) -> FrameStats { FrameStats::default() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn begin_frame(&mut self) {}
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn record(&mut self, _name: &str, _elapsed: Duration) {}
    pub fn get_timing(&self, _name: &str) -> Duration { Duration::ZERO }
    pub fn frame_total(&self) -> Duration { Duration::ZERO }
    pub fn report(&self) -> Vec<SystemTiming> { Vec::new() }
    pub fn reset(&mut self) {}
}
