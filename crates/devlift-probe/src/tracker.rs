//! Consecutive-result threshold tracking.

use crate::result::ProbeStatus;

/// Folds a stream of boolean check results into debounced threshold
/// crossings.
///
/// Every observation resets the opposite counter, so only unbroken streaks
/// reach a threshold. An event is produced on the observation that first
/// brings a counter to its threshold; further consecutive results in the
/// same direction produce nothing until the streak is broken.
#[derive(Debug)]
pub struct ThresholdTracker {
    success_threshold: u32,
    failure_threshold: u32,
    successes: u32,
    failures: u32,
}

impl ThresholdTracker {
    pub fn new(success_threshold: u32, failure_threshold: u32) -> Self {
        Self {
            success_threshold,
            failure_threshold,
            successes: 0,
            failures: 0,
        }
    }

    /// Records one check result; returns a status when a threshold is
    /// crossed.
    pub fn record(&mut self, passed: bool) -> Option<ProbeStatus> {
        if passed {
            self.failures = 0;
            self.successes = self.successes.saturating_add(1);
            (self.successes == self.success_threshold).then_some(ProbeStatus::Passed)
        } else {
            self.successes = 0;
            self.failures = self.failures.saturating_add(1);
            (self.failures == self.failure_threshold).then_some(ProbeStatus::Failed)
        }
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
