// SPDX-License-Identifier: MPL-2.0
//! Frame processor port definition.
//!
//! This module defines the [`FrameProcessor`] trait: the capability contract
//! every pluggable processor (face swapper, upscaler, future processors) must
//! satisfy to be composed into a pipeline over images or video frame batches.
//!
//! # Degrade policy
//!
//! Nothing above batch granularity is ever raised as a fatal error. A missing
//! capability, an unavailable model handle, or an internal transform failure
//! all degrade a frame transform to a pass-through of the input, with the
//! cause reported through the [`StatusReporter`]. A decode failure skips the
//! affected path without aborting its batch; an encode failure is reported
//! and the batch continues.
//!
//! # Design Notes
//!
//! - Batch/image/video bodies are provided by the trait so every conforming
//!   processor shares one orchestration shape; processors that need a distinct
//!   source identity override the entry points, resolve the source, and reuse
//!   [`run_batch`]/[`run_image`]
//! - The trait is `Send + Sync`: batch transforms run on parallel workers

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::Frame;

use super::progress::ProgressSink;
use super::status::StatusReporter;
use super::storage::FrameStore;

// =============================================================================
// ProcessorError
// =============================================================================

/// Failure kinds a processor can encounter while transforming frames.
///
/// These are reported, never propagated: every kind maps to a defined degrade
/// behavior (pass-through, skip, or continue).
#[derive(Debug, Clone)]
pub enum ProcessorError {
    /// A required optional component is missing; permanent for the process.
    CapabilityUnavailable(String),

    /// Model handle construction failed; retryable on a later acquire.
    ModelConstruction(String),

    /// Applying the model to one frame failed; local to that frame.
    Transform(String),

    /// One path could not be decoded; that path is skipped.
    Decode {
        /// The storage location that failed to decode.
        path: PathBuf,
        /// Underlying cause description.
        cause: String,
    },

    /// One path could not be written back; reported, batch continues.
    Encode {
        /// The storage location that failed to encode.
        path: PathBuf,
        /// Underlying cause description.
        cause: String,
    },
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorError::CapabilityUnavailable(what) => {
                write!(f, "Capability unavailable: {what}")
            }
            ProcessorError::ModelConstruction(cause) => {
                write!(f, "Error loading model: {cause}")
            }
            ProcessorError::Transform(cause) => write!(f, "Error processing frame: {cause}"),
            ProcessorError::Decode { path, cause } => {
                write!(f, "Skipping {}: {cause}", path.display())
            }
            ProcessorError::Encode { path, cause } => {
                write!(f, "Failed to write {}: {cause}", path.display())
            }
        }
    }
}

impl std::error::Error for ProcessorError {}

// =============================================================================
// FrameProcessor Trait
// =============================================================================

/// Port for pluggable frame processors.
///
/// A processor moves through three states over its process lifetime:
/// Uninitialized, then CapabilityChecked on the first
/// [`is_capability_present`](FrameProcessor::is_capability_present) call, then
/// either Unavailable (terminal) or Ready once
/// [`is_ready`](FrameProcessor::is_ready) has constructed the model handle.
/// Ready is never invalidated.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Multiple workers may call
/// [`transform_batch`](FrameProcessor::transform_batch) concurrently over
/// disjoint path subsets; the model handle cache is the only shared mutable
/// resource behind the contract.
pub trait FrameProcessor: Send + Sync {
    /// Stable identity token used to tag status messages.
    fn identity(&self) -> &'static str;

    /// The frame store this processor reads and writes through.
    fn store(&self) -> &dyn FrameStore;

    /// The status reporter this processor narrates degradations through.
    fn reporter(&self) -> &dyn StatusReporter;

    /// One-time check that required optional components exist.
    ///
    /// Computed once and cached; once `false` it stays `false` for the
    /// process, and every model-dependent operation short-circuits to a
    /// pass-through.
    fn is_capability_present(&self) -> bool;

    /// Capability present and a usable model handle can be produced.
    ///
    /// This is the designated warm-up call: it triggers first-time model
    /// construction. A construction failure leaves the processor degraded but
    /// retryable on the next call.
    fn is_ready(&self) -> bool;

    /// Transforms one frame.
    ///
    /// Total over its runtime failure modes: when the capability is missing,
    /// the handle is unavailable, or the transform itself fails, the input
    /// frame is returned unchanged and the cause is reported.
    fn transform_frame(&self, frame: Frame) -> Frame;

    /// Transforms a sequence of stored frames in place.
    ///
    /// Each path is decoded, transformed, and re-encoded to the same
    /// location. `progress` advances by one unit per path regardless of
    /// whether the individual transform succeeded or degraded.
    ///
    /// `source` is unused by transforms that operate purely on the target;
    /// processors with a distinct source identity override this entry point.
    fn transform_batch(
        &self,
        source: Option<&Path>,
        paths: &[PathBuf],
        progress: &dyn ProgressSink,
    ) {
        let _ = source;
        run_batch(self, paths, progress);
    }

    /// Single-image convenience entry point.
    ///
    /// Decodes `target`, transforms, encodes to `output`, and reports the
    /// outcome. `source` is accepted for interface symmetry with processors
    /// that need a distinct source identity.
    fn transform_image(&self, source: Option<&Path>, target: &Path, output: &Path) {
        let _ = source;
        run_image(self, target, output);
    }

    /// Video entry point: delegates batching, worker fan-out, and progress
    /// display to the shared orchestration routine.
    fn transform_video(&self, source: Option<&Path>, frame_paths: &[PathBuf]) {
        crate::pipeline::process_video(source, frame_paths, |src, chunk, sink| {
            self.transform_batch(src, chunk, sink);
        });
    }
}

// =============================================================================
// Shared orchestration bodies
// =============================================================================

/// Decode-transform-encode loop over `paths`, writing results in place.
///
/// This is the body behind the default
/// [`transform_batch`](FrameProcessor::transform_batch); overriding
/// processors call it after resolving their source identity.
pub fn run_batch<P>(processor: &P, paths: &[PathBuf], progress: &dyn ProgressSink)
where
    P: FrameProcessor + ?Sized,
{
    for path in paths {
        match processor.store().decode(path) {
            Ok(frame) => {
                let result = processor.transform_frame(frame);
                if let Err(e) = processor.store().encode(&result, path) {
                    let error = ProcessorError::Encode {
                        path: path.clone(),
                        cause: e.to_string(),
                    };
                    processor
                        .reporter()
                        .report(&error.to_string(), processor.identity());
                }
            }
            Err(e) => {
                let error = ProcessorError::Decode {
                    path: path.clone(),
                    cause: e.to_string(),
                };
                processor
                    .reporter()
                    .report(&error.to_string(), processor.identity());
            }
        }
        progress.advance(1);
    }
}

/// Decode-transform-encode for a single image, reporting the outcome.
pub fn run_image<P>(processor: &P, target: &Path, output: &Path)
where
    P: FrameProcessor + ?Sized,
{
    match processor.store().decode(target) {
        Ok(frame) => {
            let result = processor.transform_frame(frame);
            match processor.store().encode(&result, output) {
                Ok(()) => processor.reporter().report(
                    &format!("Processed image saved to: {}", output.display()),
                    processor.identity(),
                ),
                Err(e) => {
                    let error = ProcessorError::Encode {
                        path: output.to_path_buf(),
                        cause: e.to_string(),
                    };
                    processor
                        .reporter()
                        .report(&error.to_string(), processor.identity());
                }
            }
        }
        Err(e) => {
            let error = ProcessorError::Decode {
                path: target.to_path_buf(),
                cause: e.to_string(),
            };
            processor
                .reporter()
                .report(&error.to_string(), processor.identity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::storage::StorageError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// In-memory frame store keyed by path; missing paths fail to decode.
    #[derive(Default)]
    struct MemoryStore {
        frames: Mutex<HashMap<PathBuf, Frame>>,
    }

    impl MemoryStore {
        fn insert(&self, path: &str, frame: Frame) {
            self.frames
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), frame);
        }

        fn get(&self, path: &str) -> Option<Frame> {
            self.frames.lock().unwrap().get(Path::new(path)).cloned()
        }
    }

    impl FrameStore for MemoryStore {
        fn decode(&self, path: &Path) -> Result<Frame, StorageError> {
            self.frames
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::Decode("no such frame".to_string()))
        }

        fn encode(&self, frame: &Frame, path: &Path) -> Result<(), StorageError> {
            self.frames
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), frame.clone());
            Ok(())
        }
    }

    /// Reporter that records every (message, identity) pair.
    #[derive(Default)]
    struct RecordingReporter {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl StatusReporter for RecordingReporter {
        fn report(&self, message: &str, identity: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), identity.to_string()));
        }
    }

    struct CountingSink(AtomicU64);

    impl ProgressSink for CountingSink {
        fn advance(&self, units: u64) {
            self.0.fetch_add(units, Ordering::SeqCst);
        }

        fn estimated_total(&self) -> Option<u64> {
            None
        }
    }

    /// Mock processor that inverts every sample when available, and passes
    /// frames through unchanged when its capability is absent.
    struct MockProcessor {
        available: bool,
        store: MemoryStore,
        reporter: RecordingReporter,
    }

    impl MockProcessor {
        fn new(available: bool) -> Self {
            Self {
                available,
                store: MemoryStore::default(),
                reporter: RecordingReporter::default(),
            }
        }
    }

    impl FrameProcessor for MockProcessor {
        fn identity(&self) -> &'static str {
            "test.mock"
        }

        fn store(&self) -> &dyn FrameStore {
            &self.store
        }

        fn reporter(&self) -> &dyn StatusReporter {
            &self.reporter
        }

        fn is_capability_present(&self) -> bool {
            self.available
        }

        fn is_ready(&self) -> bool {
            self.available
        }

        fn transform_frame(&self, frame: Frame) -> Frame {
            if !self.available {
                self.reporter.report(
                    &ProcessorError::CapabilityUnavailable("mock disabled".to_string())
                        .to_string(),
                    self.identity(),
                );
                return frame;
            }
            let mut out = frame;
            for byte in out.rgb_bytes_mut() {
                *byte = 255 - *byte;
            }
            out
        }
    }

    fn solid_frame(value: u8) -> Frame {
        Frame::from_rgb(2, 2, vec![value; 12])
    }

    #[test]
    fn processor_error_display() {
        let err = ProcessorError::CapabilityUnavailable("model not installed".to_string());
        assert_eq!(
            format!("{err}"),
            "Capability unavailable: model not installed"
        );

        let err = ProcessorError::Decode {
            path: PathBuf::from("f1.png"),
            cause: "bad header".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("f1.png"));
        assert!(display.contains("bad header"));
    }

    #[test]
    fn unavailable_processor_passes_frames_through() {
        let processor = MockProcessor::new(false);
        let frame = solid_frame(40);

        let result = processor.transform_frame(frame.clone());

        assert_eq!(result, frame);
        let messages = processor.reporter.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "test.mock");
    }

    #[test]
    fn batch_advances_once_per_path_and_skips_decode_failures() {
        let processor = MockProcessor::new(true);
        processor.store.insert("p1", solid_frame(10));
        // p2 deliberately absent: decode failure
        processor.store.insert("p3", solid_frame(30));

        let paths = vec![
            PathBuf::from("p1"),
            PathBuf::from("p2"),
            PathBuf::from("p3"),
        ];
        let sink = CountingSink(AtomicU64::new(0));

        processor.transform_batch(None, &paths, &sink);

        assert_eq!(sink.0.load(Ordering::SeqCst), 3);
        assert_eq!(processor.store.get("p1"), Some(solid_frame(245)));
        assert_eq!(processor.store.get("p2"), None);
        assert_eq!(processor.store.get("p3"), Some(solid_frame(225)));

        let messages = processor.reporter.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.contains("p2"));
    }

    #[test]
    fn unavailable_batch_rewrites_paths_unchanged() {
        let processor = MockProcessor::new(false);
        processor.store.insert("p1", solid_frame(10));

        let paths = vec![PathBuf::from("p1")];
        let sink = CountingSink(AtomicU64::new(0));

        processor.transform_batch(None, &paths, &sink);

        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
        assert_eq!(processor.store.get("p1"), Some(solid_frame(10)));
    }

    #[test]
    fn transform_image_writes_output_and_reports_success() {
        let processor = MockProcessor::new(true);
        processor.store.insert("target", solid_frame(100));

        processor.transform_image(None, Path::new("target"), Path::new("output"));

        assert_eq!(processor.store.get("output"), Some(solid_frame(155)));
        let messages = processor.reporter.messages.lock().unwrap();
        assert!(messages.iter().any(|(m, _)| m.contains("output")));
    }

    #[test]
    fn transform_image_on_unavailable_processor_copies_content() {
        let processor = MockProcessor::new(false);
        processor.store.insert("target", solid_frame(100));

        processor.transform_image(None, Path::new("target"), Path::new("output"));

        // Output equals the target: pass-through, and one unavailability
        // report carries the processor identity.
        assert_eq!(processor.store.get("output"), Some(solid_frame(100)));
        let messages = processor.reporter.messages.lock().unwrap();
        assert!(messages
            .iter()
            .any(|(m, id)| m.contains("Capability unavailable") && id == "test.mock"));
    }
}
