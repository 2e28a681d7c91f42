//! CPU percentage from cumulative CPU time

/// Smallest interval used as a divisor, in seconds.
pub const MIN_ELAPSED_SECONDS: f64 = 1e-6;

/// CPU usage over an interval: `(curr - prev) / max(elapsed, 1e-6) * 100`.
///
/// Not clamped: a multi-threaded tree can exceed 100.
pub fn cpu_percent(prev_total: f64, curr_total: f64, elapsed_seconds: f64) -> f64 {
    (curr_total - prev_total) / elapsed_seconds.max(MIN_ELAPSED_SECONDS) * 100.0
}

/// Tracks the previous observation so each tick yields a rate.
#[derive(Debug, Clone, Default)]
pub struct CpuRateTracker {
    previous: Option<(f64, f64)>,
}

impl CpuRateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cumulative CPU total seen at `at_seconds` and return the rate
    /// since the previous observation; 0 on the first one.
    pub fn observe(&mut self, cpu_total: f64, at_seconds: f64) -> f64 {
        let rate = match self.previous {
            Some((prev_total, prev_at)) => cpu_percent(prev_total, cpu_total, at_seconds - prev_at),
            None => 0.0,
        };
        self.previous = Some((cpu_total, at_seconds));
        rate
    }
}
