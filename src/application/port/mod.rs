// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! This module defines abstract interfaces that infrastructure adapters implement.
//! These traits use only domain types, ensuring the application layer remains
//! independent of concrete implementations.
//!
//! # Available Ports
//!
//! - [`processor`]: The frame-processor plugin contract
//! - [`status`]: Fire-and-forget status reporting
//! - [`storage`]: Frame decode/encode at storage locations
//! - [`progress`]: Monotonic progress accounting for batch runs
//!
//! # Design Notes
//!
//! - All traits use domain types only (no ONNX types, no `image` handles)
//! - Traits are `Send + Sync`: batch transforms run on parallel workers
//! - Runtime failures degrade; they are reported, never propagated upward

pub mod processor;
pub mod progress;
pub mod status;
pub mod storage;

// Re-export main types for convenience
pub use processor::{run_batch, run_image, FrameProcessor, ProcessorError};
pub use progress::{NullProgress, ProgressSink};
pub use status::{NullStatusReporter, StatusReporter};
pub use storage::{FrameStore, StorageError};
