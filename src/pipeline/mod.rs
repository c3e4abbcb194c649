// SPDX-License-Identifier: MPL-2.0
//! Generic video-frame orchestration.
//!
//! Processors own *what* happens to a frame; this module owns *how* a frame
//! sequence is walked: chunking the path list over parallel workers, sharing
//! one progress sink across them, and running an ordered processor pipeline
//! over a source's frames or a single image.
//!
//! Workers receive disjoint path subsets, so the only cross-worker
//! synchronization happens inside each processor's model handle cache.

pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::application::port::{FrameProcessor, ProgressSink};
use crate::error::Result;

pub use progress::{CountingSink, FrameProgress};

/// Runs `callback` over `paths` split into contiguous chunks on parallel
/// workers, with a terminal progress bar sized to the path count.
///
/// The callback is the sole mutator of the frame data at those paths for the
/// duration of the run. It is invoked once per chunk and is expected to
/// advance the sink by one unit per processed path.
pub fn process_video<F>(source: Option<&Path>, paths: &[PathBuf], callback: F)
where
    F: Fn(Option<&Path>, &[PathBuf], &dyn ProgressSink) + Sync,
{
    if paths.is_empty() {
        return;
    }
    let progress = FrameProgress::new(paths.len() as u64);
    process_video_with(source, paths, &progress, callback);
    progress.finish();
}

/// [`process_video`] with an explicit progress sink.
pub fn process_video_with<F>(
    source: Option<&Path>,
    paths: &[PathBuf],
    progress: &dyn ProgressSink,
    callback: F,
) where
    F: Fn(Option<&Path>, &[PathBuf], &dyn ProgressSink) + Sync,
{
    if paths.is_empty() {
        return;
    }
    let chunk_size = paths.len().div_ceil(rayon::current_num_threads()).max(1);
    paths
        .par_chunks(chunk_size)
        .for_each(|chunk| callback(source, chunk, progress));
}

/// An ordered list of frame processors applied in sequence.
///
/// Registration and ordering are external configuration; the pipeline only
/// walks the list. A processor that is not ready is reported and skipped,
/// never aborting the run.
pub struct Pipeline {
    processors: Vec<Arc<dyn FrameProcessor>>,
}

impl Pipeline {
    /// Creates a pipeline over an externally assembled processor list.
    #[must_use]
    pub fn new(processors: Vec<Arc<dyn FrameProcessor>>) -> Self {
        Self { processors }
    }

    /// The processors in pipeline order.
    #[must_use]
    pub fn processors(&self) -> &[Arc<dyn FrameProcessor>] {
        &self.processors
    }

    /// Applies the pipeline to a single image.
    ///
    /// The target is first copied to the output location; every processor
    /// then transforms the output in place, so later processors see earlier
    /// results.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial copy fails; processor failures
    /// degrade per the contract and are reported, not raised.
    pub fn run_image(&self, source: Option<&Path>, target: &Path, output: &Path) -> Result<()> {
        if target != output {
            std::fs::copy(target, output)?;
        }
        for processor in &self.processors {
            if !processor.is_ready() {
                processor
                    .reporter()
                    .report("Processor not ready; skipping.", processor.identity());
                continue;
            }
            processor.transform_image(source, output, output);
        }
        Ok(())
    }

    /// Applies the pipeline to an extracted video frame sequence.
    pub fn run_video(&self, source: Option<&Path>, frame_paths: &[PathBuf]) {
        for processor in &self.processors {
            if !processor.is_ready() {
                processor
                    .reporter()
                    .report("Processor not ready; skipping.", processor.identity());
                continue;
            }
            processor.transform_video(source, frame_paths);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::{FrameStore, NullStatusReporter, StatusReporter};
    use crate::domain::Frame;
    use crate::infrastructure::storage::DiskFrameStore;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[test]
    fn process_video_with_covers_every_path_exactly_once() {
        let paths: Vec<PathBuf> = (0..23).map(|i| PathBuf::from(format!("f{i:03}.png"))).collect();
        let sink = CountingSink::with_total(paths.len() as u64);
        let seen: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

        process_video_with(None, &paths, &sink, |_, chunk, progress| {
            seen.lock().unwrap().extend_from_slice(chunk);
            progress.advance(chunk.len() as u64);
        });

        assert_eq!(sink.advanced(), 23);
        let seen = seen.lock().unwrap();
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(seen.len(), 23);
        assert_eq!(unique.len(), 23);
    }

    #[test]
    fn process_video_with_forwards_the_source_reference() {
        let paths = vec![PathBuf::from("a.png")];
        let sink = CountingSink::new();
        let source = PathBuf::from("face.jpg");
        let forwarded = Mutex::new(None);

        process_video_with(Some(&source), &paths, &sink, |src, _, _| {
            *forwarded.lock().unwrap() = src.map(Path::to_path_buf);
        });

        assert_eq!(*forwarded.lock().unwrap(), Some(source));
    }

    #[test]
    fn process_video_with_empty_paths_is_a_no_op() {
        let sink = CountingSink::new();
        process_video_with(None, &[], &sink, |_, _, progress| progress.advance(1));
        assert_eq!(sink.advanced(), 0);
    }

    /// Processor whose capability never materializes.
    struct DisabledProcessor {
        store: DiskFrameStore,
        reporter: NullStatusReporter,
    }

    impl FrameProcessor for DisabledProcessor {
        fn identity(&self) -> &'static str {
            "test.disabled"
        }

        fn store(&self) -> &dyn FrameStore {
            &self.store
        }

        fn reporter(&self) -> &dyn StatusReporter {
            &self.reporter
        }

        fn is_capability_present(&self) -> bool {
            false
        }

        fn is_ready(&self) -> bool {
            false
        }

        fn transform_frame(&self, frame: Frame) -> Frame {
            frame
        }
    }

    #[test]
    fn run_image_copies_target_even_when_all_processors_skip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("target.png");
        let output = temp.path().join("output.png");

        let store = DiskFrameStore::new();
        let frame = Frame::from_rgb(4, 4, (0..48).map(|i| i as u8).collect());
        store.encode(&frame, &target).expect("encode fixture");

        let pipeline = Pipeline::new(vec![Arc::new(DisabledProcessor {
            store: DiskFrameStore::new(),
            reporter: NullStatusReporter,
        })]);
        pipeline
            .run_image(None, &target, &output)
            .expect("run_image should succeed");

        let decoded = store.decode(&output).expect("decode output");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn run_image_fails_when_target_is_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pipeline = Pipeline::new(Vec::new());

        let result = pipeline.run_image(
            None,
            &temp.path().join("missing.png"),
            &temp.path().join("out.png"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn run_video_with_unready_processors_does_not_touch_frames() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("frame0.png");
        std::fs::write(&path, b"sentinel").expect("write fixture");

        let pipeline = Pipeline::new(vec![Arc::new(DisabledProcessor {
            store: DiskFrameStore::new(),
            reporter: NullStatusReporter,
        })]);
        pipeline.run_video(None, &[path.clone()]);

        assert_eq!(std::fs::read(&path).expect("read back"), b"sentinel");
    }
}
