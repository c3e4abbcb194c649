// SPDX-License-Identifier: MPL-2.0
//! End-to-end behavior of the processor contract over real files: degraded
//! processors pass content through untouched, batches survive per-path
//! failures, and every degradation is narrated through the status channel.

use std::path::PathBuf;
use std::sync::Arc;

use frame_forge::application::port::{FrameProcessor, FrameStore};
use frame_forge::config::{self, PipelineConfig};
use frame_forge::diagnostics::StatusHub;
use frame_forge::domain::Frame;
use frame_forge::infrastructure::{DiskFrameStore, FaceSwapProcessor, UpscaleProcessor};
use frame_forge::media::face_swap::FaceSwapManager;
use frame_forge::media::upscale::UpscaleManager;
use frame_forge::pipeline::{CountingSink, Pipeline};
use tempfile::TempDir;

fn model_free_config(temp: &TempDir) -> config::SharedConfig {
    config::shared(PipelineConfig {
        model_dir: Some(temp.path().join("models")),
        ..PipelineConfig::default()
    })
}

fn upscaler_with_hub(temp: &TempDir) -> (UpscaleProcessor, StatusHub) {
    let (hub, handle) = StatusHub::new();
    let processor = UpscaleProcessor::with_collaborators(
        Arc::new(UpscaleManager::new(model_free_config(temp))),
        Arc::new(DiskFrameStore::new()),
        Arc::new(handle),
    );
    (processor, hub)
}

fn gradient_frame(seed: u8) -> Frame {
    Frame::from_rgb(
        16,
        16,
        (0..16 * 16 * 3)
            .map(|i| (i as u32 * u32::from(seed) % 251) as u8)
            .collect(),
    )
}

#[test]
fn unavailable_processor_copies_image_content_and_reports_once() {
    let temp = TempDir::new().expect("tempdir");
    let store = DiskFrameStore::new();
    let target = temp.path().join("target.png");
    let output = temp.path().join("out.png");
    let frame = gradient_frame(3);
    store.encode(&frame, &target).expect("encode fixture");

    let (processor, hub) = upscaler_with_hub(&temp);
    processor.transform_image(None, &target, &output);

    // Output content equals target content: the transform degraded to a
    // pass-through.
    let decoded_target = store.decode(&target).expect("decode target");
    let decoded_output = store.decode(&output).expect("decode output");
    assert_eq!(decoded_output, decoded_target);

    let events = hub.drain();
    assert!(events
        .iter()
        .any(|e| e.identity == "frame-forge.upscale" && e.message.contains("Capability unavailable")));
}

#[test]
fn unavailability_is_idempotent_across_frames() {
    let temp = TempDir::new().expect("tempdir");
    let (processor, _hub) = upscaler_with_hub(&temp);

    assert!(!processor.is_capability_present());
    for seed in 1..5 {
        let frame = gradient_frame(seed);
        assert_eq!(processor.transform_frame(frame.clone()), frame);
    }
}

#[test]
fn batch_completes_under_partial_decode_failure() {
    let temp = TempDir::new().expect("tempdir");
    let store = DiskFrameStore::new();

    let p1 = temp.path().join("frame001.png");
    let p2 = temp.path().join("frame002.png");
    let p3 = temp.path().join("frame003.png");
    store.encode(&gradient_frame(1), &p1).expect("encode p1");
    std::fs::write(&p2, b"corrupted frame data").expect("write p2");
    store.encode(&gradient_frame(5), &p3).expect("encode p3");
    let p2_original = std::fs::read(&p2).expect("read p2");

    let (processor, hub) = upscaler_with_hub(&temp);
    let paths = vec![p1.clone(), p2.clone(), p3.clone()];
    let sink = CountingSink::with_total(3);

    processor.transform_batch(None, &paths, &sink);

    // Progress advanced once per path regardless of the middle failure.
    assert_eq!(sink.advanced(), 3);
    // The failing path was skipped without a write-back.
    assert_eq!(std::fs::read(&p2).expect("read p2 again"), p2_original);
    // The outer paths were rewritten; content unchanged since the transform
    // degraded to pass-through.
    assert_eq!(store.decode(&p1).expect("decode p1"), gradient_frame(1));
    assert_eq!(store.decode(&p3).expect("decode p3"), gradient_frame(5));

    let events = hub.drain();
    assert!(events
        .iter()
        .any(|e| e.message.contains("frame002.png") && e.identity == "frame-forge.upscale"));
}

#[test]
fn video_entry_point_walks_all_frames_without_mutating_them() {
    let temp = TempDir::new().expect("tempdir");
    let store = DiskFrameStore::new();

    let paths: Vec<PathBuf> = (0..6)
        .map(|i| {
            let path = temp.path().join(format!("frame{i:03}.png"));
            store
                .encode(&gradient_frame(i as u8 + 1), &path)
                .expect("encode frame");
            path
        })
        .collect();

    let (processor, _hub) = upscaler_with_hub(&temp);
    processor.transform_video(None, &paths);

    for (i, path) in paths.iter().enumerate() {
        assert_eq!(
            store.decode(path).expect("decode frame"),
            gradient_frame(i as u8 + 1)
        );
    }
}

#[test]
fn full_pipeline_over_image_degrades_to_copy_without_models() {
    let temp = TempDir::new().expect("tempdir");
    let store = DiskFrameStore::new();
    let target = temp.path().join("portrait.png");
    let output = temp.path().join("enhanced.png");
    let source = temp.path().join("face.png");
    let frame = gradient_frame(7);
    store.encode(&frame, &target).expect("encode target");
    store.encode(&gradient_frame(2), &source).expect("encode source");

    let shared = model_free_config(&temp);
    let (hub, handle) = StatusHub::new();
    let reporter: Arc<dyn frame_forge::application::port::StatusReporter> = Arc::new(handle);
    let pipeline = Pipeline::new(vec![
        Arc::new(FaceSwapProcessor::with_collaborators(
            Arc::new(FaceSwapManager::new(Arc::clone(&shared))),
            Arc::new(DiskFrameStore::new()),
            Arc::clone(&reporter),
        )),
        Arc::new(UpscaleProcessor::with_collaborators(
            Arc::new(UpscaleManager::new(shared)),
            Arc::new(DiskFrameStore::new()),
            reporter,
        )),
    ]);

    pipeline
        .run_image(Some(&source), &target, &output)
        .expect("run_image should succeed");

    assert_eq!(store.decode(&output).expect("decode output"), frame);

    // Both processors reported their missing capability and were skipped.
    let events = hub.drain();
    assert!(events.iter().any(|e| e.identity == "frame-forge.face-swap"));
    assert!(events.iter().any(|e| e.identity == "frame-forge.upscale"));
}
