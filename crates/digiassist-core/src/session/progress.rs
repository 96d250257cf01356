// Session progress counters.

use serde::Serialize;
use tracing::warn;

/// Question count assumed until the server reports its own total.
pub const DEFAULT_TOTAL_QUESTIONS: u32 = 72;

/// `(current, total)`: answered questions and total questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
}

impl Progress {
    pub fn new(current: u32, total: u32) -> Self {
        Progress { current, total }
    }

    /// Starting point before the server has reported anything.
    pub fn initial(default_total: u32) -> Self {
        Progress {
            current: 0,
            total: default_total,
        }
    }

    /// `current / total * 100`, clamped to `[0, 100]`. Zero when total is 0.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(self.current) / f64::from(self.total) * 100.0).clamp(0.0, 100.0)
    }

    pub fn rounded_percentage(&self) -> u16 {
        self.percentage().round() as u16
    }

    /// Ratio in `[0, 1]` for gauge widgets.
    pub fn ratio(&self) -> f64 {
        self.percentage() / 100.0
    }

    /// 1-based number of the question currently being asked.
    pub fn next_question_number(&self) -> u32 {
        self.current.saturating_add(1)
    }

    /// Merge counters reported by the server. Missing values keep the
    /// current state; a missing or zero total keeps the known total or
    /// `fallback`.
    ///
    /// Returns whether anything changed.
    pub fn apply(&mut self, current: Option<u32>, total: Option<u32>, fallback: u32) -> bool {
        let before = *self;
        match total.filter(|t| *t > 0) {
            Some(total) => self.total = total,
            None if self.total == 0 => self.total = fallback,
            None => {}
        }
        if let Some(current) = current {
            self.current = current;
        }
        if self.current > self.total {
            warn!(
                current = self.current,
                total = self.total,
                "server reported progress beyond total"
            );
        }
        *self != before
    }
}
