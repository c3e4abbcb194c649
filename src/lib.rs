// SPDX-License-Identifier: MPL-2.0
//! `frame_forge` is a pluggable frame-processor pipeline for media
//! enhancement and face manipulation.
//!
//! It provides the frame-processor plugin contract, lazy thread-safe model
//! lifecycle management for expensive ONNX sessions, and the generic
//! orchestration routine that walks video frame sequences and single images
//! through an ordered processor list.

#![doc(html_root_url = "https://docs.rs/frame_forge/0.1.0")]

pub mod application;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod media;
pub mod pipeline;
