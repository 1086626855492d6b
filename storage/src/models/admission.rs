//! Rolling-window admission policy and decision.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-duration quota window: at most `ceiling` admissions until `window` has elapsed since
/// the window's own reset timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub ceiling: i64,
    pub window: Duration,
}

impl WindowPolicy {
    pub fn new(ceiling: i64, window: Duration) -> Self {
        Self { ceiling, window }
    }

    /// True if a window started at `reset_at` is over at `now`.
    pub fn is_expired(&self, reset_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - reset_at >= self.window
    }
}

impl Default for WindowPolicy {
    /// 100 admissions per 3 days.
    fn default() -> Self {
        Self {
            ceiling: 100,
            window: Duration::days(3),
        }
    }
}

/// Outcome of one admission attempt. `current_count` is the stored count after the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    pub current_count: i64,
}

impl Admission {
    pub fn allowed(current_count: i64) -> Self {
        Self {
            allowed: true,
            current_count,
        }
    }

    pub fn denied(current_count: i64) -> Self {
        Self {
            allowed: false,
            current_count,
        }
    }
}
