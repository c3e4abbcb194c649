// SPDX-License-Identifier: MPL-2.0
//! Progress accounting port.
//!
//! The orchestrator hands every batch worker the same sink; workers advance it
//! by one unit per processed path whether the transform succeeded or degraded.

/// Port for bounded, monotonic progress updates.
pub trait ProgressSink: Send + Sync {
    /// Advances the progress position by `units`.
    fn advance(&self, units: u64);

    /// Estimated total number of units, for user-facing display.
    fn estimated_total(&self) -> Option<u64>;
}

/// Sink that ignores all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn advance(&self, _units: u64) {}

    fn estimated_total(&self) -> Option<u64> {
        None
    }
}
