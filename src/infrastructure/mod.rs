// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! This module contains concrete implementations of the port traits defined in
//! `application::port`. These adapters wrap external dependencies like ONNX
//! Runtime and filesystem I/O.
//!
//! # Available Adapters
//!
//! - [`onnx`]: frame processors via ONNX Runtime (implement [`FrameProcessor`])
//! - [`storage`]: frame decode/encode on disk (implements [`FrameStore`])
//!
//! [`FrameProcessor`]: crate::application::port::FrameProcessor
//! [`FrameStore`]: crate::application::port::FrameStore

pub mod onnx;
pub mod storage;

// Re-export main types for convenience
pub use onnx::{FaceSwapProcessor, UpscaleProcessor};
pub use storage::DiskFrameStore;
