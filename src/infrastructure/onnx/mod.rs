// SPDX-License-Identifier: MPL-2.0
//! ONNX Runtime adapters implementing the [`FrameProcessor`] port trait.
//!
//! This module provides the frame processors:
//!
//! - [`UpscaleProcessor`]: `Real-ESRGAN`-based 4x super-resolution
//! - [`FaceSwapProcessor`]: swap-model-based face replacement
//!
//! # Design Notes
//!
//! - These adapters wrap the `UpscaleManager` and `FaceSwapManager`
//! - They own the availability flag and the degrade-to-pass-through policy;
//!   the managers only return `Result`s
//! - Every runtime failure is narrated through the [`StatusReporter`] and
//!   absorbed, never propagated
//!
//! [`FrameProcessor`]: crate::application::port::FrameProcessor
//! [`StatusReporter`]: crate::application::port::StatusReporter

mod face_swap;
mod upscale;

pub use face_swap::FaceSwapProcessor;
pub use upscale::UpscaleProcessor;
