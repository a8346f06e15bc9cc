//! Progress notification throttling.
//!
//! One `ProgressThrottle` lives in each download's copy loop and is asked
//! after every chunk whether a progress event should go out.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleStrategy {
    /// At most one event per interval, plus the completing chunk
    Interval(Duration),
    /// Only on whole percentages that are multiples of the divider
    Percent(u32),
    /// Every chunk
    Unthrottled,
}

impl ThrottleStrategy {
    /// Pick the strategy from host settings. A positive interval wins over
    /// the divider; neither configured means every chunk.
    pub fn from_settings(interval_ms: u64, divider: i32) -> Self {
        if interval_ms > 0 {
            Self::Interval(Duration::from_millis(interval_ms))
        } else if divider > 0 {
            Self::Percent(divider as u32)
        } else {
            Self::Unthrottled
        }
    }
}

#[derive(Debug)]
pub struct ProgressThrottle {
    strategy: ThrottleStrategy,
    last_emit: Option<Instant>,
    last_percent: u64,
}

impl ProgressThrottle {
    pub fn new(strategy: ThrottleStrategy) -> Self {
        Self {
            strategy,
            last_emit: None,
            last_percent: 0,
        }
    }

    pub fn strategy(&self) -> ThrottleStrategy {
        self.strategy
    }

    pub fn should_emit(&mut self, total: Option<u64>, transferred: u64) -> bool {
        self.should_emit_at(Instant::now(), total, transferred)
    }

    /// `total` is `None` when the length is unknown.
    pub fn should_emit_at(&mut self, now: Instant, total: Option<u64>, transferred: u64) -> bool {
        match self.strategy {
            ThrottleStrategy::Unthrottled => true,
            ThrottleStrategy::Interval(interval) => {
                let complete = total.is_some_and(|total| total > 0 && transferred >= total);
                let due = match self.last_emit {
                    Some(last) => now.saturating_duration_since(last) > interval,
                    None => true,
                };
                if due || complete {
                    self.last_emit = Some(now);
                    true
                } else {
                    false
                }
            }
            ThrottleStrategy::Percent(divider) => {
                // Percentages are meaningless without a positive total.
                let Some(total) = total.filter(|total| *total > 0) else {
                    return true;
                };
                let percent = (transferred as f64 * 100.0 / total as f64).round() as u64;
                if percent % u64::from(divider) != 0 {
                    return false;
                }
                if percent != self.last_percent || transferred == total {
                    self.last_percent = percent;
                    true
                } else {
                    false
                }
            }
        }
    }
}
