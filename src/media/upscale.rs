// SPDX-License-Identifier: MPL-2.0
//! Super-resolution upscaling using the Real-ESRGAN ONNX model.
//!
//! This module provides functionality for:
//! - Resolving the model artifact for the configured precision
//! - Constructing the inference session at most once per process
//! - Running 4x upscaling inference on frames
//!
//! # Precision
//!
//! A GPU-accelerated primary compute provider selects the reduced-precision
//! (f16) model variant at construction time; CPU-primary runs keep the f32
//! artifact. The constructed handle is bound to that choice for the rest of
//! the process, even if the configuration changes afterwards.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use half::f16;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::SharedConfig;
use crate::domain::frame::{Frame, CHANNELS};
use crate::media::model_cache::ModelCache;
use crate::media::session::{build_session, Precision};

/// Filename of the full-precision upscale model artifact.
const MODEL_FILENAME: &str = "realesrgan-x4plus.onnx";

/// Filename of the reduced-precision upscale model artifact.
const MODEL_FILENAME_REDUCED: &str = "realesrgan-x4plus-fp16.onnx";

/// Minimum plausible artifact size; smaller files are failed downloads.
const MIN_MODEL_SIZE_BYTES: u64 = 16_000_000;

/// The fixed upscale factor provided by the Real-ESRGAN x4plus model.
pub const UPSCALE_FACTOR: u32 = 4;

/// Result type for upscale operations.
pub type UpscaleResult<T> = Result<T, UpscaleError>;

/// Errors that can occur during upscaling operations.
#[derive(Debug, Clone)]
pub enum UpscaleError {
    /// Model artifact not found (or implausibly small) at the expected path.
    ModelNotFound(PathBuf),
    /// Model file integrity verification failed.
    ChecksumMismatch { expected: String, actual: String },
    /// ONNX session initialization failed.
    SessionInit(String),
    /// ONNX inference failed.
    InferenceFailed(String),
    /// Frame postprocessing failed.
    PostprocessingFailed(String),
    /// IO error occurred.
    Io(String),
}

impl std::fmt::Display for UpscaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpscaleError::ModelNotFound(path) => {
                write!(f, "Model file not found: {}", path.display())
            }
            UpscaleError::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {expected}, got {actual}")
            }
            UpscaleError::SessionInit(msg) => write!(f, "Session init failed: {msg}"),
            UpscaleError::InferenceFailed(msg) => write!(f, "Inference failed: {msg}"),
            UpscaleError::PostprocessingFailed(msg) => write!(f, "Postprocessing failed: {msg}"),
            UpscaleError::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for UpscaleError {}

/// A constructed upscale model bound to its precision and session.
///
/// Shared process-wide through an `Arc`; the session is interior-locked
/// because ONNX inference takes `&mut`.
pub struct UpscaleHandle {
    session: Mutex<Session>,
    precision: Precision,
    input_name: String,
}

impl UpscaleHandle {
    /// The precision this handle was constructed with.
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Runs 4x upscaling inference on a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if inference or output extraction fails. The input
    /// frame is untouched either way.
    pub fn enhance(&self, frame: &Frame) -> UpscaleResult<Frame> {
        match self.precision {
            Precision::Full => self.enhance_f32(frame),
            Precision::Reduced => self.enhance_f16(frame),
        }
    }

    fn enhance_f32(&self, frame: &Frame) -> UpscaleResult<Frame> {
        let tensor = frame_to_nchw_f32(frame);
        let input_ref = TensorRef::from_array_view(&tensor)
            .map_err(|e| UpscaleError::InferenceFailed(e.to_string()))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_ref])
            .map_err(|e| UpscaleError::InferenceFailed(e.to_string()))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| UpscaleError::PostprocessingFailed("No output tensor".to_string()))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| UpscaleError::PostprocessingFailed(e.to_string()))?;

        frame_from_nchw(shape, data)
    }

    fn enhance_f16(&self, frame: &Frame) -> UpscaleResult<Frame> {
        let tensor = frame_to_nchw_f16(frame);
        let input_ref = TensorRef::from_array_view(&tensor)
            .map_err(|e| UpscaleError::InferenceFailed(e.to_string()))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_ref])
            .map_err(|e| UpscaleError::InferenceFailed(e.to_string()))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| UpscaleError::PostprocessingFailed("No output tensor".to_string()))?;
        let (shape, data) = output
            .try_extract_tensor::<f16>()
            .map_err(|e: ort::Error| UpscaleError::PostprocessingFailed(e.to_string()))?;

        let widened: Vec<f32> = data.iter().map(|v| v.to_f32()).collect();
        frame_from_nchw(shape, &widened)
    }
}

/// Manager for the Real-ESRGAN upscaling model lifecycle.
///
/// Owns the process-wide [`ModelCache`] for the upscale handle. Provider list
/// and precision preference are read from the shared configuration at
/// acquisition time.
pub struct UpscaleManager {
    config: SharedConfig,
    cache: ModelCache<UpscaleHandle>,
    expected_digest: Option<String>,
}

impl UpscaleManager {
    /// Creates a new manager over the shared configuration.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            cache: ModelCache::new(),
            expected_digest: None,
        }
    }

    /// Pins the model artifact to an expected BLAKE3 digest, verified once at
    /// construction time.
    #[must_use]
    pub fn with_expected_digest(mut self, digest: impl Into<String>) -> Self {
        self.expected_digest = Some(digest.into());
        self
    }

    /// Precision the current configuration would construct with.
    #[must_use]
    pub fn configured_precision(&self) -> Precision {
        let provider = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .primary_provider();
        Precision::for_provider(provider)
    }

    /// Path of the model artifact for the current configuration.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let filename = match Precision::for_provider(config.primary_provider()) {
            Precision::Full => MODEL_FILENAME,
            Precision::Reduced => MODEL_FILENAME_REDUCED,
        };
        config.resolve_model_dir().join(filename)
    }

    /// Checks that the model artifact exists with a plausible size.
    #[must_use]
    pub fn is_model_installed(&self) -> bool {
        match std::fs::metadata(self.model_path()) {
            Ok(meta) => meta.len() >= MIN_MODEL_SIZE_BYTES,
            Err(_) => false,
        }
    }

    /// Returns `true` if the handle has been constructed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.is_loaded()
    }

    /// Returns the shared handle, constructing it on first demand.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is missing, fails integrity
    /// verification, or the session cannot be initialized. A failure is not
    /// cached: the next call attempts construction again.
    pub fn acquire(&self) -> UpscaleResult<Arc<UpscaleHandle>> {
        self.cache.acquire_with(|| {
            let (providers, precision, path) = {
                let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
                let precision = Precision::for_provider(config.primary_provider());
                let filename = match precision {
                    Precision::Full => MODEL_FILENAME,
                    Precision::Reduced => MODEL_FILENAME_REDUCED,
                };
                (
                    config.execution_providers.clone(),
                    precision,
                    config.resolve_model_dir().join(filename),
                )
            };

            if !path.exists() {
                return Err(UpscaleError::ModelNotFound(path));
            }
            if let Some(expected) = &self.expected_digest {
                verify_digest(&path, expected)?;
            }

            let session =
                build_session(&path, &providers).map_err(|e| UpscaleError::SessionInit(e.to_string()))?;
            let input_name = session
                .inputs()
                .first()
                .map_or_else(|| "input".to_string(), |i| i.name().to_string());

            Ok(UpscaleHandle {
                session: Mutex::new(session),
                precision,
                input_name,
            })
        })
    }

    /// Runs 4x upscaling on a frame, acquiring the handle as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if acquisition or inference fails.
    pub fn enhance(&self, frame: &Frame) -> UpscaleResult<Frame> {
        self.acquire()?.enhance(frame)
    }
}

/// Computes the BLAKE3 hash of a model file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_model_hash(path: &std::path::Path) -> UpscaleResult<String> {
    let file_data = std::fs::read(path).map_err(|e| UpscaleError::Io(e.to_string()))?;
    Ok(blake3::hash(&file_data).to_hex().to_string())
}

fn verify_digest(path: &std::path::Path, expected: &str) -> UpscaleResult<()> {
    let actual = compute_model_hash(path)?;
    if actual != expected {
        return Err(UpscaleError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Preprocesses a frame for inference: NCHW layout (batch=1, channels=3),
/// RGB order, normalized to the 0-1 range.
fn frame_to_nchw_f32(frame: &Frame) -> Array4<f32> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let bytes = frame.rgb_bytes();

    Array4::from_shape_fn((1, CHANNELS, height, width), |(_, c, y, x)| {
        f32::from(bytes[(y * width + x) * CHANNELS + c]) / 255.0
    })
}

/// Reduced-precision variant of [`frame_to_nchw_f32`].
fn frame_to_nchw_f16(frame: &Frame) -> Array4<f16> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let bytes = frame.rgb_bytes();

    Array4::from_shape_fn((1, CHANNELS, height, width), |(_, c, y, x)| {
        f16::from_f32(f32::from(bytes[(y * width + x) * CHANNELS + c]) / 255.0)
    })
}

/// Postprocesses an NCHW output tensor back to a frame: denormalizes from
/// 0-1 to 0-255 and clips values to the valid range.
fn frame_from_nchw(shape: &[i64], data: &[f32]) -> UpscaleResult<Frame> {
    if shape.len() != 4 {
        return Err(UpscaleError::PostprocessingFailed(format!(
            "Expected 4D tensor, got {}D",
            shape.len()
        )));
    }

    let height = usize::try_from(shape[2])
        .map_err(|_| UpscaleError::PostprocessingFailed("Invalid tensor height".to_string()))?;
    let width = usize::try_from(shape[3])
        .map_err(|_| UpscaleError::PostprocessingFailed("Invalid tensor width".to_string()))?;
    let channel_size = height * width;

    if data.len() < channel_size * CHANNELS {
        return Err(UpscaleError::PostprocessingFailed(
            "Output tensor smaller than its declared shape".to_string(),
        ));
    }

    let mut pixels = Vec::with_capacity(channel_size * CHANNELS);
    for idx in 0..channel_size {
        for c in 0..CHANNELS {
            // Clamp guarantees the value is in 0.0..=255.0 before truncation.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sample = (data[c * channel_size + idx] * 255.0).clamp(0.0, 255.0).round() as u8;
            pixels.push(sample);
        }
    }

    let width_u32 = u32::try_from(width)
        .map_err(|_| UpscaleError::PostprocessingFailed("Frame width too large".to_string()))?;
    let height_u32 = u32::try_from(height)
        .map_err(|_| UpscaleError::PostprocessingFailed("Frame height too large".to_string()))?;

    Ok(Frame::from_rgb(width_u32, height_u32, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, ComputeProvider, PipelineConfig};

    fn config_with_dir(dir: &std::path::Path) -> SharedConfig {
        config::shared(PipelineConfig {
            model_dir: Some(dir.to_path_buf()),
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn upscale_error_display() {
        let err = UpscaleError::ModelNotFound(PathBuf::from("missing.onnx"));
        assert!(err.to_string().contains("missing.onnx"));

        let err = UpscaleError::ChecksumMismatch {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(err.to_string().contains("expected aa"));
    }

    #[test]
    fn preprocess_creates_correct_shape() {
        let frame = Frame::from_rgb(100, 80, vec![0u8; 100 * 80 * 3]);
        let tensor = frame_to_nchw_f32(&frame);
        assert_eq!(tensor.shape(), &[1, 3, 80, 100]);
    }

    #[test]
    fn preprocess_normalizes_values() {
        let mut bytes = vec![0u8; 10 * 10 * 3];
        for pixel in bytes.chunks_mut(3) {
            pixel[0] = 255;
            pixel[1] = 128;
            pixel[2] = 0;
        }
        let frame = Frame::from_rgb(10, 10, bytes);

        let tensor = frame_to_nchw_f32(&frame);

        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 1, 0, 0]] - 0.502).abs() < 0.01);
        assert!(tensor[[0, 2, 0, 0]].abs() < 0.01);
    }

    #[test]
    fn reduced_precision_preprocess_matches_full() {
        let frame = Frame::from_rgb(4, 4, (0..48).map(|i| i as u8 * 5).collect());

        let full = frame_to_nchw_f32(&frame);
        let reduced = frame_to_nchw_f16(&frame);

        for (a, b) in full.iter().zip(reduced.iter()) {
            assert!((a - b.to_f32()).abs() < 0.01);
        }
    }

    #[test]
    fn postprocess_round_trips_preprocess() {
        let frame = Frame::from_rgb(6, 4, (0..72).map(|i| i as u8 * 3).collect());
        let tensor = frame_to_nchw_f32(&frame);

        let shape = [1i64, 3, 4, 6];
        let data: Vec<f32> = tensor.iter().copied().collect();
        let restored = frame_from_nchw(&shape, &data).expect("postprocess should succeed");

        assert_eq!(restored, frame);
    }

    #[test]
    fn postprocess_rejects_wrong_dimensionality() {
        let result = frame_from_nchw(&[1, 3, 4], &[0.0; 12]);
        assert!(matches!(
            result,
            Err(UpscaleError::PostprocessingFailed(_))
        ));
    }

    #[test]
    fn postprocess_clamps_out_of_range_samples() {
        let shape = [1i64, 3, 1, 1];
        let data = [1.7f32, -0.3, 0.5];
        let frame = frame_from_nchw(&shape, &data).expect("postprocess should succeed");
        assert_eq!(frame.rgb_bytes(), &[255, 0, 128]);
    }

    #[test]
    fn model_path_follows_precision() {
        let temp = tempfile::tempdir().expect("tempdir");
        let shared = config_with_dir(temp.path());
        let manager = UpscaleManager::new(Arc::clone(&shared));
        assert!(manager.model_path().ends_with(MODEL_FILENAME));

        shared.write().unwrap().execution_providers = vec![ComputeProvider::Cuda];
        assert!(manager.model_path().ends_with(MODEL_FILENAME_REDUCED));
    }

    #[test]
    fn acquire_fails_with_missing_artifact_and_is_retryable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manager = UpscaleManager::new(config_with_dir(temp.path()));

        assert!(!manager.is_model_installed());
        assert!(matches!(
            manager.acquire(),
            Err(UpscaleError::ModelNotFound(_))
        ));
        // Failure was not cached.
        assert!(!manager.is_loaded());
    }

    #[test]
    fn upscale_factor_is_four() {
        assert_eq!(UPSCALE_FACTOR, 4);
    }
}
