// SPDX-License-Identifier: MPL-2.0
//! Application layer - the processor contract and its collaborators.
//!
//! This module contains the application layer of the Clean Architecture:
//!
//! - [`port`]: Trait definitions (interfaces) for dependency inversion
//!
//! # Dependency Rule
//!
//! - Application layer depends on domain layer (uses domain types)
//! - Infrastructure layer implements application layer ports
//! - The pipeline orchestrator consumes ports, never concrete adapters

pub mod port;
