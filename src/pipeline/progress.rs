// SPDX-License-Identifier: MPL-2.0
//! Progress sink adapters for batch runs.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use crate::application::port::ProgressSink;

/// Terminal progress bar shared by all batch workers of one run.
pub struct FrameProgress {
    bar: ProgressBar,
}

impl FrameProgress {
    /// Creates a bar sized to the estimated total number of frames.
    #[must_use]
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Marks the run finished.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressSink for FrameProgress {
    fn advance(&self, units: u64) {
        self.bar.inc(units);
    }

    fn estimated_total(&self) -> Option<u64> {
        self.bar.length()
    }
}

/// Sink that only counts advances; used by tests and headless embedders.
#[derive(Debug, Default)]
pub struct CountingSink {
    advanced: AtomicU64,
    total: Option<u64>,
}

impl CountingSink {
    /// Creates a sink with no estimated total.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink advertising an estimated total.
    #[must_use]
    pub fn with_total(total: u64) -> Self {
        Self {
            advanced: AtomicU64::new(0),
            total: Some(total),
        }
    }

    /// Units advanced so far.
    #[must_use]
    pub fn advanced(&self) -> u64 {
        self.advanced.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CountingSink {
    fn advance(&self, units: u64) {
        self.advanced.fetch_add(units, Ordering::SeqCst);
    }

    fn estimated_total(&self) -> Option<u64> {
        self.total
    }
}
