//! Loop statistics

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept per loop
pub const STATS_WINDOW: usize = 120;

/// How often [`EngineStats::should_report`] fires
pub const REPORT_INTERVAL: Duration = Duration::from_millis(1000);

/// Rolling statistics for one loop
#[derive(Debug, Clone)]
pub struct LoopStats {
    /// Interval between consecutive ticks
    intervals: VecDeque<Duration>,
    /// Time spent inside the tick body
    busy: VecDeque<Duration>,
    rate: f32,
    avg_busy_ms: f32,
    min_busy_ms: f32,
    max_busy_ms: f32,
    total_ticks: u64,
}

impl LoopStats {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            intervals: VecDeque::with_capacity(STATS_WINDOW),
            busy: VecDeque::with_capacity(STATS_WINDOW),
            rate: 0.0,
            avg_busy_ms: 0.0,
            min_busy_ms: 0.0,
            max_busy_ms: 0.0,
            total_ticks: 0,
        }
    }

    /// Record one tick: the time since the previous tick and the time the body took
    pub fn record(&mut self, interval: Duration, busy: Duration) {
        self.total_ticks += 1;
        push_bounded(&mut self.intervals, interval);
        push_bounded(&mut self.busy, busy);
        self.recompute();
    }

    fn recompute(&mut self) {
        let total: Duration = self.intervals.iter().sum();
        let secs = total.as_secs_f32();
        self.rate = if secs > 0.0 {
            self.intervals.len() as f32 / secs
        } else {
            0.0
        };

        let mut sum = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for &sample in &self.busy {
            sum += sample;
            min = min.min(sample);
            max = max.max(sample);
        }
        let count = self.busy.len().max(1) as f32;
        self.avg_busy_ms = sum.as_secs_f32() * 1000.0 / count;
        self.min_busy_ms = if self.busy.is_empty() { 0.0 } else { min.as_secs_f32() * 1000.0 };
        self.max_busy_ms = max.as_secs_f32() * 1000.0;
    }

    /// Ticks per second over the window
    #[must_use]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Average tick body time in milliseconds
    #[must_use]
    pub fn avg_busy_ms(&self) -> f32 {
        self.avg_busy_ms
    }

    /// Shortest tick body in the window, in milliseconds
    #[must_use]
    pub fn min_busy_ms(&self) -> f32 {
        self.min_busy_ms
    }

    /// Longest tick body in the window, in milliseconds
    #[must_use]
    pub fn max_busy_ms(&self) -> f32 {
        self.max_busy_ms
    }

    /// Ticks since start
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// One-line summary
    #[must_use]
    pub fn format_stats(&self) -> String {
        format!(
            "{:.1}/s | tick: {:.2}ms (min: {:.2}, max: {:.2})",
            self.rate, self.avg_busy_ms, self.min_busy_ms, self.max_busy_ms
        )
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(samples: &mut VecDeque<Duration>, sample: Duration) {
    if samples.len() >= STATS_WINDOW {
        samples.pop_front();
    }
    samples.push_back(sample);
}

/// Statistics for both loops
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Variable loop (frames)
    pub frames: LoopStats,
    /// Fixed loop
    pub fixed: LoopStats,
    last_report: Option<Instant>,
}

impl EngineStats {
    /// Create empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: LoopStats::new(),
            fixed: LoopStats::new(),
            last_report: None,
        }
    }

    /// Whether a second has passed since the last report. Arms the timer on first call.
    pub fn should_report(&mut self, now: Instant) -> bool {
        match self.last_report {
            Some(last) if now.saturating_duration_since(last) >= REPORT_INTERVAL => {
                self.last_report = Some(now);
                true
            }
            Some(_) => false,
            None => {
                self.last_report = Some(now);
                false
            }
        }
    }

    /// Both loops on one line
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "FPS: {} | fixed: {}",
            self.frames.format_stats(),
            self.fixed.format_stats()
        )
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}
