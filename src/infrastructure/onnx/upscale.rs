// SPDX-License-Identifier: MPL-2.0
//! `Real-ESRGAN` upscale adapter implementing the [`FrameProcessor`] trait.
//!
//! [`FrameProcessor`]: crate::application::port::FrameProcessor

use std::sync::{Arc, OnceLock};

use crate::application::port::{
    FrameProcessor, FrameStore, NullStatusReporter, ProcessorError, StatusReporter,
};
use crate::config::SharedConfig;
use crate::domain::Frame;
use crate::infrastructure::storage::DiskFrameStore;
use crate::media::upscale::{UpscaleHandle, UpscaleManager};

/// Identity token for status messages.
const NAME: &str = "frame-forge.upscale";

/// ONNX-based super-resolution processor using `Real-ESRGAN` x4.
///
/// The availability flag is computed once per process on the first
/// [`is_capability_present`](FrameProcessor::is_capability_present) call and
/// never reset. All runtime failures degrade to passing the input frame
/// through unchanged.
pub struct UpscaleProcessor {
    manager: Arc<UpscaleManager>,
    store: Arc<dyn FrameStore>,
    reporter: Arc<dyn StatusReporter>,
    availability: OnceLock<bool>,
}

impl UpscaleProcessor {
    /// Creates a processor with a disk frame store and no status reporting.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self::with_collaborators(
            Arc::new(UpscaleManager::new(config)),
            Arc::new(DiskFrameStore::new()),
            Arc::new(NullStatusReporter),
        )
    }

    /// Creates a processor from explicit collaborators.
    ///
    /// Use this to share one manager (and thus one model handle) across the
    /// process, or to route status messages somewhere observable.
    #[must_use]
    pub fn with_collaborators(
        manager: Arc<UpscaleManager>,
        store: Arc<dyn FrameStore>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            manager,
            store,
            reporter,
            availability: OnceLock::new(),
        }
    }

    /// Returns the underlying manager for lifecycle introspection.
    #[must_use]
    pub fn manager(&self) -> &Arc<UpscaleManager> {
        &self.manager
    }

    /// Acquires the model handle, reporting a construction failure.
    fn warm(&self) -> Option<Arc<UpscaleHandle>> {
        let first_load = !self.manager.is_loaded();
        match self.manager.acquire() {
            Ok(handle) => {
                if first_load {
                    self.reporter
                        .report("Upscale model loaded successfully.", NAME);
                }
                Some(handle)
            }
            Err(e) => {
                self.reporter.report(
                    &ProcessorError::ModelConstruction(e.to_string()).to_string(),
                    NAME,
                );
                None
            }
        }
    }
}

impl FrameProcessor for UpscaleProcessor {
    fn identity(&self) -> &'static str {
        NAME
    }

    fn store(&self) -> &dyn FrameStore {
        &*self.store
    }

    fn reporter(&self) -> &dyn StatusReporter {
        &*self.reporter
    }

    fn is_capability_present(&self) -> bool {
        *self.availability.get_or_init(|| {
            let installed = self.manager.is_model_installed();
            if !installed {
                self.reporter.report(
                    &ProcessorError::CapabilityUnavailable(format!(
                        "upscale model not installed at {}",
                        self.manager.model_path().display()
                    ))
                    .to_string(),
                    NAME,
                );
            }
            installed
        })
    }

    fn is_ready(&self) -> bool {
        self.is_capability_present() && self.warm().is_some()
    }

    fn transform_frame(&self, frame: Frame) -> Frame {
        if !self.is_capability_present() {
            return frame;
        }
        let Some(handle) = self.warm() else {
            return frame;
        };

        match handle.enhance(&frame) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                self.reporter.report(
                    &ProcessorError::Transform(e.to_string()).to_string(),
                    NAME,
                );
                frame
            }
        }
    }
}
