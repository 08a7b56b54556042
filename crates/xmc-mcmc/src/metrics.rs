use std::time::Duration;

use serde::Serialize;

/// Which stage of the run an iteration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Discarded burn-in iterations.
    BurnIn,
    /// Recorded iterations.
    Sampling,
}

/// Snapshot handed to progress callbacks after every iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressInfo {
    /// Stage of the run.
    pub phase: Phase,
    /// Iterations completed in this phase; for sampling this is the chain cursor.
    pub iteration: usize,
    /// Iterations the phase will reach.
    pub total: usize,
    /// Wall-clock time since the phase began.
    pub elapsed: Duration,
    /// Mean acceptance fraction across walkers in this phase.
    pub acceptance_rate: f64,
    /// Mean finite log-probability across walkers.
    pub mean_log_prob: f64,
}

impl ProgressInfo {
    /// Estimated time left, extrapolated from the iterations done in this run.
    pub fn remaining(&self, start_iteration: usize) -> Option<Duration> {
        let done = self.iteration.checked_sub(start_iteration)?;
        if done == 0 {
            return None;
        }
        let left = self.total.saturating_sub(self.iteration);
        Some(self.elapsed.mul_f64(left as f64 / done as f64))
    }
}
