//! Duration-budget accounting for the harvest stage.
//!
//! A [`DurationBudget`] tracks how many seconds of clip material a single
//! harvest run has accepted against its configured ceiling. It is owned
//! exclusively by the harvester's sequential loop; there are no concurrent
//! writers.

/// Cumulative duration ceiling for one harvest run, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBudget {
    limit_seconds: u64,
    consumed_seconds: u64,
}

impl DurationBudget {
    /// Create a budget with the given ceiling.
    pub fn new(limit_seconds: u64) -> Self {
        Self {
            limit_seconds,
            consumed_seconds: 0,
        }
    }

    /// Accept a candidate of `duration_seconds` if it fits, advancing the
    /// consumed total. Returns `false` (and consumes nothing) if accepting
    /// would exceed the limit.
    ///
    /// Invariant: `consumed() <= limit()` holds after every call.
    pub fn try_accept(&mut self, duration_seconds: u64) -> bool {
        match self.consumed_seconds.checked_add(duration_seconds) {
            Some(total) if total <= self.limit_seconds => {
                self.consumed_seconds = total;
                true
            }
            _ => false,
        }
    }

    /// Seconds accepted so far.
    pub fn consumed(&self) -> u64 {
        self.consumed_seconds
    }

    /// The configured ceiling.
    pub fn limit(&self) -> u64 {
        self.limit_seconds
    }

    /// Seconds still available.
    pub fn remaining(&self) -> u64 {
        self.limit_seconds - self.consumed_seconds
    }
}
