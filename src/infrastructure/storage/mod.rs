// SPDX-License-Identifier: MPL-2.0
//! Disk-backed frame store over the `image` crate.

use std::path::Path;

use crate::application::port::{FrameStore, StorageError};
use crate::domain::Frame;

/// Frame store that decodes and encodes image files on disk.
///
/// Format support follows the `image` crate's enabled features; the format is
/// inferred from the path extension on encode.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFrameStore;

impl DiskFrameStore {
    /// Creates a new disk frame store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FrameStore for DiskFrameStore {
    fn decode(&self, path: &Path) -> Result<Frame, StorageError> {
        let image = image_rs::open(path).map_err(|e| StorageError::Decode(e.to_string()))?;
        Ok(Frame::from_image(image.to_rgb8()))
    }

    fn encode(&self, frame: &Frame, path: &Path) -> Result<(), StorageError> {
        frame
            .to_image()
            .save(path)
            .map_err(|e| StorageError::Encode(e.to_string()))
    }
}
