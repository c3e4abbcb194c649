// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Core frame types with ZERO external dependencies.
//!
//! This module contains the pure data types the processor contract is written
//! against. It has no dependencies on ML or I/O crates to ensure testability
//! and architectural purity.
//!
//! # Modules
//!
//! - [`frame`]: Raster frame types ([`Frame`](frame::Frame))

pub mod frame;

pub use frame::Frame;
