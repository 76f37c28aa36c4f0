//! Progress side-channel for long normalisation runs.
//!
//! Sinks only observe; nothing they do can change the numeric result. Under
//! parallel execution the order and timing of updates is not guaranteed.

use std::fmt;

/// Trials between two progress updates.
pub const PROGRESS_EVERY: usize = 5;

/// A progress update for one completed trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialProgress {
    /// 1-based id of the trial that just finished.
    pub trial: usize,
    pub n_samples: usize,
}

impl TrialProgress {
    pub fn percent(&self) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        self.trial as f64 / self.n_samples as f64 * 100.0
    }

    /// Whether this trial falls on the reporting cadence.
    pub fn is_due(&self) -> bool {
        self.trial % PROGRESS_EVERY == 0
    }
}

impl fmt::Display for TrialProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Predicting {} of {} times ({:.2}%)...",
            self.trial,
            self.n_samples,
            self.percent()
        )
    }
}

/// Receives progress updates from worker threads.
pub trait ProgressSink: Sync {
    fn report(&self, progress: &TrialProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&TrialProgress) + Sync,
{
    fn report(&self, progress: &TrialProgress) {
        self(progress)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&self, _progress: &TrialProgress) {}
}

/// Emits each update as an `info` log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, progress: &TrialProgress) {
        tracing::info!(trial = progress.trial, n_samples = progress.n_samples, "{progress}");
    }
}
