// SPDX-License-Identifier: MPL-2.0
//! Frame storage port.
//!
//! Batch processing reads frames from storage locations and writes results
//! back in place. Decode failures are non-fatal: the affected path is skipped
//! and the batch continues. Encode failures are reported but do not abort.

use std::fmt;
use std::path::Path;

use crate::domain::Frame;

/// Errors surfaced by a frame store.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// The stored bytes could not be decoded into a frame.
    Decode(String),
    /// The frame could not be encoded to its storage location.
    Encode(String),
    /// Underlying I/O failure.
    Io(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Decode(msg) => write!(f, "decode failed: {msg}"),
            StorageError::Encode(msg) => write!(f, "encode failed: {msg}"),
            StorageError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Port for decoding and encoding frames at storage locations.
pub trait FrameStore: Send + Sync {
    /// Decodes the frame stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the path is unreadable or not a valid
    /// image. Callers treat this as a skip, not an abort.
    fn decode(&self, path: &Path) -> Result<Frame, StorageError>;

    /// Encodes `frame` to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the frame cannot be written.
    fn encode(&self, frame: &Frame, path: &Path) -> Result<(), StorageError>;
}
