//! Frame timing and delta time.
//!
//! The [`Scene`](crate::scene::Scene) owns one [`Time`] and advances it at the
//! start of every frame, before anything else runs. Components and systems
//! read it for the frame delta, and the component list uses
//! [`Time::frame_count`] to honour per-component update intervals.
//!
//! Two ways to advance: [`Time::update`] measures the wall clock, while
//! [`Time::advance`] steps by a given duration. Fixed-step simulations and
//! tests use the latter.

use std::time::{Duration, Instant};

/// Frame timing, advanced once per frame.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// When the current frame started.
    frame_start: Instant,
    /// Duration of the previous frame.
    delta: Duration,
    /// Sum of every delta so far.
    elapsed: Duration,
    /// Frames advanced so far. Zero until the first frame.
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Start a new frame, measuring the delta from the wall clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.frame_start;
        self.frame_start = now;
        self.step(delta);
    }

    /// Start a new frame with a fixed `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.frame_start = Instant::now();
        self.step(delta);
    }

    fn step(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of frames advanced so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
