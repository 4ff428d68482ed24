//! Progress reporting for the cleaning, assignment and aggregation stages.
//!
//! Stages report through [`ProgressCallback`] and never know how progress
//! is rendered; the `ward_flow` binary plugs in terminal bars, library
//! callers and tests use [`NullProgress`].

use std::sync::Arc;

/// Receives progress from one pipeline stage.
///
/// Must be `Send + Sync`: ward assignment reports from `rayon` workers.
pub trait ProgressCallback: Send + Sync {
    /// Number of records (or partitions) the stage will process.
    fn set_total(&self, total: u64);

    /// Advance by `delta` records.
    fn inc(&self, delta: u64);

    /// Replace the stage label, e.g. the partition being aggregated.
    fn set_message(&self, msg: String);

    /// Stage done; `msg` is the final summary line.
    fn finish(&self, msg: String);
}

/// Discards all progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Batches per-record ticks so a multi-million row trip table does not
/// redraw its bar on every row.
pub struct RecordTicker<'a> {
    progress: &'a dyn ProgressCallback,
    step: u64,
    pending: u64,
}

impl<'a> RecordTicker<'a> {
    /// Forwards to `progress` once every `step` records. A `step` of zero
    /// is treated as one.
    #[must_use]
    pub fn new(progress: &'a dyn ProgressCallback, step: u64) -> Self {
        Self {
            progress,
            step: step.max(1),
            pending: 0,
        }
    }

    /// Counts one record.
    pub fn tick(&mut self) {
        self.pending += 1;
        if self.pending >= self.step {
            self.progress.inc(self.pending);
            self.pending = 0;
        }
    }

    /// Flushes the records counted since the last forward and finishes the
    /// stage.
    pub fn finish(mut self, msg: String) {
        if self.pending > 0 {
            self.progress.inc(self.pending);
            self.pending = 0;
        }
        self.progress.finish(msg);
    }
}
