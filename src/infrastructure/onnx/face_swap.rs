// SPDX-License-Identifier: MPL-2.0
//! Face-swap adapter implementing the [`FrameProcessor`] trait.
//!
//! Unlike the upscaler, a swap needs a distinct source identity, so this
//! adapter overrides the batch and image entry points: it resolves the source
//! reference once per call into a prepared source frame, then reuses the
//! shared decode-transform-encode bodies.
//!
//! [`FrameProcessor`]: crate::application::port::FrameProcessor

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::application::port::{
    run_batch, run_image, FrameProcessor, FrameStore, NullStatusReporter, ProcessorError,
    ProgressSink, StatusReporter,
};
use crate::config::SharedConfig;
use crate::domain::Frame;
use crate::infrastructure::storage::DiskFrameStore;
use crate::media::face_swap::{FaceSwapHandle, FaceSwapManager};

/// Identity token for status messages.
const NAME: &str = "frame-forge.face-swap";

/// ONNX-based face-swap processor.
///
/// Holds the source frame prepared from the last `source_ref` so that the
/// per-frame transform stays source-free, mirroring the rest of the contract.
/// Without a prepared source the transform degrades to pass-through.
pub struct FaceSwapProcessor {
    manager: Arc<FaceSwapManager>,
    store: Arc<dyn FrameStore>,
    reporter: Arc<dyn StatusReporter>,
    availability: OnceLock<bool>,
    active_source: RwLock<Option<Frame>>,
}

impl FaceSwapProcessor {
    /// Creates a processor with a disk frame store and no status reporting.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self::with_collaborators(
            Arc::new(FaceSwapManager::new(config)),
            Arc::new(DiskFrameStore::new()),
            Arc::new(NullStatusReporter),
        )
    }

    /// Creates a processor from explicit collaborators.
    #[must_use]
    pub fn with_collaborators(
        manager: Arc<FaceSwapManager>,
        store: Arc<dyn FrameStore>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            manager,
            store,
            reporter,
            availability: OnceLock::new(),
            active_source: RwLock::new(None),
        }
    }

    /// Returns the underlying manager for lifecycle introspection.
    #[must_use]
    pub fn manager(&self) -> &Arc<FaceSwapManager> {
        &self.manager
    }

    /// Decodes the source reference into the active source slot.
    ///
    /// A decode failure is reported and leaves the previous source (if any)
    /// in place, so a batch degrades rather than aborts.
    fn prepare_source(&self, source: Option<&Path>) {
        let Some(path) = source else { return };
        match self.store.decode(path) {
            Ok(frame) => {
                *self
                    .active_source
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(frame);
            }
            Err(e) => self.reporter.report(
                &ProcessorError::Decode {
                    path: path.to_path_buf(),
                    cause: e.to_string(),
                }
                .to_string(),
                NAME,
            ),
        }
    }

    /// Acquires the model handle, reporting a construction failure.
    fn warm(&self) -> Option<Arc<FaceSwapHandle>> {
        let first_load = !self.manager.is_loaded();
        match self.manager.acquire() {
            Ok(handle) => {
                if first_load {
                    self.reporter
                        .report("Face-swap model loaded successfully.", NAME);
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

impl FrameProcessor for FaceSwapProcessor {
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
                        "swap model not installed at {}",
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

        let guard = self
            .active_source
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(source) = guard.as_ref() else {
            self.reporter.report(
                &ProcessorError::Transform("no source identity prepared".to_string()).to_string(),
                NAME,
            );
            return frame;
        };

        match self.manager.swap(source, &frame) {
            Ok(swapped) => swapped,
            Err(e) => {
                self.reporter.report(
                    &ProcessorError::Transform(e.to_string()).to_string(),
                    NAME,
                );
                frame
            }
        }
    }

    fn transform_batch(
        &self,
        source: Option<&Path>,
        paths: &[PathBuf],
        progress: &dyn ProgressSink,
    ) {
        self.prepare_source(source);
        run_batch(self, paths, progress);
    }

    fn transform_image(&self, source: Option<&Path>, target: &Path, output: &Path) {
        self.prepare_source(source);
        run_image(self, target, output);
    }
}
