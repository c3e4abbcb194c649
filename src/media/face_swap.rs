// SPDX-License-Identifier: MPL-2.0
//! Face swapping through a configurable ONNX swap model.
//!
//! The swap model is an opaque two-input graph: it receives the target face
//! crop and a source identity image and produces the swapped face. Face
//! analysis (detection, landmarks) is external to this core, so the face
//! region is the centered square of the target frame, and the swapped result
//! is composited back with the configured blend opacity. The optional
//! mouth-region toggle preserves the original lower-face band.
//!
//! Blend opacity and the mouth toggle are read from the shared configuration
//! at transform time; only the model selection is fixed at construction.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use image_rs::imageops::{self, FilterType};
use image_rs::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::SharedConfig;
use crate::domain::frame::{Frame, CHANNELS};
use crate::media::model_cache::ModelCache;
use crate::media::session::build_session;

/// Side length of the swap model's square input.
const SWAP_INPUT_SIZE: u32 = 128;

/// Minimum plausible artifact size; smaller files are failed downloads.
const MIN_MODEL_SIZE_BYTES: u64 = 1_000_000;

/// Smallest target frame a swap region can be carved from.
const MIN_FRAME_SIDE: u32 = 8;

/// Result type for face-swap operations.
pub type FaceSwapResult<T> = Result<T, FaceSwapError>;

/// Errors that can occur during face-swap operations.
#[derive(Debug, Clone)]
pub enum FaceSwapError {
    /// Model artifact not found (or implausibly small) at the expected path.
    ModelNotFound(PathBuf),
    /// ONNX session initialization failed.
    SessionInit(String),
    /// ONNX inference failed.
    InferenceFailed(String),
    /// Output tensor could not be converted back to a face crop.
    PostprocessingFailed(String),
    /// The target frame is too small to carve a face region from.
    FrameTooSmall { width: u32, height: u32 },
}

impl std::fmt::Display for FaceSwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaceSwapError::ModelNotFound(path) => {
                write!(f, "Swap model not found: {}", path.display())
            }
            FaceSwapError::SessionInit(msg) => write!(f, "Session init failed: {msg}"),
            FaceSwapError::InferenceFailed(msg) => write!(f, "Inference failed: {msg}"),
            FaceSwapError::PostprocessingFailed(msg) => {
                write!(f, "Postprocessing failed: {msg}")
            }
            FaceSwapError::FrameTooSmall { width, height } => {
                write!(f, "Frame too small for face swap: {width}x{height}")
            }
        }
    }
}

impl std::error::Error for FaceSwapError {}

/// A constructed swap model session with its resolved input names.
pub struct FaceSwapHandle {
    session: Mutex<Session>,
    target_input: String,
    source_input: String,
}

impl FaceSwapHandle {
    /// Runs the swap model over a target crop and source identity image,
    /// both already at the model's input size.
    fn run(&self, target: &RgbImage, source: &RgbImage) -> FaceSwapResult<RgbImage> {
        let target_tensor = image_to_nchw(target);
        let source_tensor = image_to_nchw(source);

        let target_ref = TensorRef::from_array_view(&target_tensor)
            .map_err(|e| FaceSwapError::InferenceFailed(e.to_string()))?;
        let source_ref = TensorRef::from_array_view(&source_tensor)
            .map_err(|e| FaceSwapError::InferenceFailed(e.to_string()))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![
                self.target_input.as_str() => target_ref,
                self.source_input.as_str() => source_ref
            ])
            .map_err(|e| FaceSwapError::InferenceFailed(e.to_string()))?;

        let (_, output) = outputs.iter().next().ok_or_else(|| {
            FaceSwapError::PostprocessingFailed("No output tensor".to_string())
        })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| FaceSwapError::PostprocessingFailed(e.to_string()))?;

        image_from_nchw(shape, data)
    }
}

/// Manager for the face-swap model lifecycle.
pub struct FaceSwapManager {
    config: SharedConfig,
    cache: ModelCache<FaceSwapHandle>,
}

impl FaceSwapManager {
    /// Creates a new manager over the shared configuration.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            cache: ModelCache::new(),
        }
    }

    /// Path of the configured swap model artifact.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        config
            .resolve_model_dir()
            .join(format!("{}.onnx", config.face_swap_model))
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
    /// Returns an error if the artifact is missing or the session cannot be
    /// initialized. A failure is not cached: the next call attempts
    /// construction again.
    pub fn acquire(&self) -> FaceSwapResult<Arc<FaceSwapHandle>> {
        self.cache.acquire_with(|| {
            let (providers, path) = {
                let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
                (
                    config.execution_providers.clone(),
                    config
                        .resolve_model_dir()
                        .join(format!("{}.onnx", config.face_swap_model)),
                )
            };

            if !path.exists() {
                return Err(FaceSwapError::ModelNotFound(path));
            }

            let session = build_session(&path, &providers)
                .map_err(|e| FaceSwapError::SessionInit(e.to_string()))?;
            let target_input = session
                .inputs()
                .first()
                .map_or_else(|| "target".to_string(), |i| i.name().to_string());
            let source_input = session
                .inputs()
                .get(1)
                .map_or_else(|| "source".to_string(), |i| i.name().to_string());

            Ok(FaceSwapHandle {
                session: Mutex::new(session),
                target_input,
                source_input,
            })
        })
    }

    /// Swaps the source identity onto the target frame's face region.
    ///
    /// Blend opacity and the mouth-region toggle are read from the shared
    /// configuration at call time.
    ///
    /// # Errors
    ///
    /// Returns an error if acquisition, inference, or compositing fails. The
    /// input frame is untouched either way.
    pub fn swap(&self, source: &Frame, frame: &Frame) -> FaceSwapResult<Frame> {
        if frame.width() < MIN_FRAME_SIDE || frame.height() < MIN_FRAME_SIDE {
            return Err(FaceSwapError::FrameTooSmall {
                width: frame.width(),
                height: frame.height(),
            });
        }

        let (opacity, mouth_mask) = {
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            (config.blend_opacity.clamp(0.0, 1.0), config.mouth_mask)
        };

        let handle = self.acquire()?;

        let region = center_region(frame);
        let target_image = frame.to_image();
        let target_crop = imageops::crop_imm(&target_image, region.x, region.y, region.side, region.side)
            .to_image();
        let target_small = imageops::resize(
            &target_crop,
            SWAP_INPUT_SIZE,
            SWAP_INPUT_SIZE,
            FilterType::Lanczos3,
        );
        let source_small = imageops::resize(
            &source.to_image(),
            SWAP_INPUT_SIZE,
            SWAP_INPUT_SIZE,
            FilterType::Lanczos3,
        );

        let swapped_small = handle.run(&target_small, &source_small)?;
        let swapped_crop =
            imageops::resize(&swapped_small, region.side, region.side, FilterType::Lanczos3);

        Ok(composite(frame, &swapped_crop, region, opacity, mouth_mask))
    }
}

/// A square region inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x: u32,
    y: u32,
    side: u32,
}

impl Region {
    /// The lower-central band preserved when mouth masking is enabled:
    /// rows 65%..90% of the region height, central half of its width.
    fn mouth_band(&self) -> (u32, u32, u32, u32) {
        let band_x = self.x + self.side / 4;
        let band_y = self.y + self.side * 65 / 100;
        let band_w = self.side / 2;
        let band_h = self.side * 25 / 100;
        (band_x, band_y, band_w, band_h)
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.side && y >= self.y && y < self.y + self.side
    }
}

/// The centered square region standing in for the face area.
fn center_region(frame: &Frame) -> Region {
    let side = frame.width().min(frame.height());
    Region {
        x: (frame.width() - side) / 2,
        y: (frame.height() - side) / 2,
        side,
    }
}

/// Composites the swapped crop over the original frame region, applying the
/// blend opacity and optionally preserving the mouth band.
fn composite(
    original: &Frame,
    swapped_crop: &RgbImage,
    region: Region,
    opacity: f32,
    mouth_mask: bool,
) -> Frame {
    let width = original.width() as usize;
    let mut out = original.clone();
    let (band_x, band_y, band_w, band_h) = region.mouth_band();

    let bytes = out.rgb_bytes_mut();
    for (dx, dy, pixel) in swapped_crop.enumerate_pixels() {
        let x = region.x + dx;
        let y = region.y + dy;
        if !region.contains(x, y) {
            continue;
        }
        if mouth_mask
            && x >= band_x
            && x < band_x + band_w
            && y >= band_y
            && y < band_y + band_h
        {
            continue;
        }
        let idx = (y as usize * width + x as usize) * CHANNELS;
        for c in 0..CHANNELS {
            let orig = f32::from(bytes[idx + c]);
            let swap = f32::from(pixel.0[c]);
            // Clamp guarantees the value is in 0.0..=255.0 before truncation.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let blended = (orig + (swap - orig) * opacity).clamp(0.0, 255.0).round() as u8;
            bytes[idx + c] = blended;
        }
    }

    out
}

/// Converts an RGB image to an NCHW f32 tensor normalized to 0-1.
fn image_to_nchw(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    Array4::from_shape_fn(
        (1, CHANNELS, height as usize, width as usize),
        |(_, c, y, x)| f32::from(image.get_pixel(x as u32, y as u32).0[c]) / 255.0,
    )
}

/// Converts an NCHW f32 output tensor back to an RGB image.
fn image_from_nchw(shape: &[i64], data: &[f32]) -> FaceSwapResult<RgbImage> {
    if shape.len() != 4 {
        return Err(FaceSwapError::PostprocessingFailed(format!(
            "Expected 4D tensor, got {}D",
            shape.len()
        )));
    }

    let height = usize::try_from(shape[2])
        .map_err(|_| FaceSwapError::PostprocessingFailed("Invalid tensor height".to_string()))?;
    let width = usize::try_from(shape[3])
        .map_err(|_| FaceSwapError::PostprocessingFailed("Invalid tensor width".to_string()))?;
    let channel_size = height * width;

    if data.len() < channel_size * CHANNELS {
        return Err(FaceSwapError::PostprocessingFailed(
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
        .map_err(|_| FaceSwapError::PostprocessingFailed("Crop width too large".to_string()))?;
    let height_u32 = u32::try_from(height)
        .map_err(|_| FaceSwapError::PostprocessingFailed("Crop height too large".to_string()))?;

    RgbImage::from_raw(width_u32, height_u32, pixels)
        .ok_or_else(|| FaceSwapError::PostprocessingFailed("Failed to create crop".to_string()))
}
