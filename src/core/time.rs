//! Frame timing

use std::time::{Duration, Instant};

/// Time tracking for the variable loop, plus the fixed step length
#[derive(Debug, Clone)]
pub struct Time {
    last_frame: Option<Instant>,
    delta: Duration,
    elapsed: Duration,
    fixed_delta: Duration,
    frame_count: u64,
    fixed_tick_count: u64,
}

impl Time {
    /// Create a new time tracker with the default 20 ms fixed step
    #[must_use]
    pub fn new() -> Self {
        Self::with_fixed_delta(Duration::from_millis(20))
    }

    /// Create a new time tracker with a custom fixed step
    #[must_use]
    pub fn with_fixed_delta(fixed_delta: Duration) -> Self {
        Self {
            last_frame: None,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            fixed_delta,
            frame_count: 0,
            fixed_tick_count: 0,
        }
    }

    /// Sample the clock. The first call yields a zero delta.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        self.advance(delta);
    }

    /// Step by an explicit delta without touching the clock
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Count one fixed-rate tick
    pub fn tick_fixed(&mut self) {
        self.fixed_tick_count += 1;
    }

    /// Duration of the last variable frame
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Last frame duration in seconds
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Time accumulated by variable frames
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time in seconds
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Fixed step length
    #[must_use]
    pub fn fixed_delta(&self) -> Duration {
        self.fixed_delta
    }

    /// Fixed step length in seconds
    #[must_use]
    pub fn fixed_delta_seconds(&self) -> f32 {
        self.fixed_delta.as_secs_f32()
    }

    /// Variable frames so far
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Fixed ticks so far
    #[must_use]
    pub fn fixed_tick_count(&self) -> u64 {
        self.fixed_tick_count
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
