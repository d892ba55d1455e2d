//! Progress estimate for the progress bar.
//!
//! Elapsed time is counted by a fixed-interval poll against each section's
//! nominal duration, not against real narration timing. The poll never
//! advances sections; it only feeds the display.

use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Remaining budget below this counts as fully spent (float accumulation).
const BUDGET_EPSILON: f64 = 1e-9;

/// Counts a section's nominal duration in fixed increments.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    interval: Duration,
    budget_secs: f64,
}

impl ProgressReporter {
    /// Poll every `interval` until `budget` has been counted.
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            budget_secs: budget.as_secs_f64(),
        }
    }

    /// Run the poll. Each tick calls `on_tick` with the seconds to add; the
    /// last increment is trimmed so the total never exceeds the budget.
    /// Returning false from `on_tick` stops the poll. Returns seconds counted.
    pub async fn run<F>(self, mut on_tick: F) -> f64
    where
        F: FnMut(f64) -> bool,
    {
        let step = self.interval.as_secs_f64();
        let mut counted = 0.0;
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.budget_secs - counted > BUDGET_EPSILON {
            ticker.tick().await;
            let increment = step.min(self.budget_secs - counted);
            counted += increment;
            if !on_tick(increment) {
                break;
            }
        }
        counted
    }
}

/// Add `increment` to `elapsed`, never passing `total`.
pub fn advance_elapsed(elapsed: f64, increment: f64, total: f64) -> f64 {
    (elapsed + increment.max(0.0)).min(total)
}

/// Progress bar fill in percent.
pub fn progress_percent(elapsed: f64, total: f64) -> f64 {
    if total > 0.0 {
        (elapsed / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `m:ss` display of a second count.
pub fn format_time(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}
