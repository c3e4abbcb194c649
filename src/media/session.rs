// SPDX-License-Identifier: MPL-2.0
//! ONNX session construction shared by the model managers.

use std::path::Path;

use ort::execution_providers::{
    CPU, CUDA, CoreML, DirectML, ExecutionProviderDispatch, TensorRT,
};
use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::config::ComputeProvider;

/// Numeric precision a model handle was constructed with.
///
/// Chosen once at construction from the primary compute provider; a handle
/// never switches precision after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// f32 weights and tensors.
    Full,
    /// f16 weights and tensors, for GPU-accelerated providers.
    Reduced,
}

impl Precision {
    /// Selects the precision for a primary compute provider.
    #[must_use]
    pub fn for_provider(provider: ComputeProvider) -> Self {
        if provider.is_gpu() {
            Precision::Reduced
        } else {
            Precision::Full
        }
    }
}

fn dispatch(provider: ComputeProvider) -> ExecutionProviderDispatch {
    match provider {
        ComputeProvider::Cuda => CUDA::default().build(),
        ComputeProvider::TensorRt => TensorRT::default().build(),
        ComputeProvider::CoreMl => CoreML::default().build(),
        ComputeProvider::DirectMl => DirectML::default().build(),
        ComputeProvider::Cpu => CPU::default().build(),
    }
}

/// Builds an ONNX session for `model_path` with the configured providers
/// registered in preference order. CPU is always appended as the fallback.
///
/// # Errors
///
/// Returns an [`ort::Error`] if the session cannot be initialized from the
/// model file.
pub fn build_session(
    model_path: &Path,
    providers: &[ComputeProvider],
) -> Result<Session, ort::Error> {
    let mut dispatches: Vec<ExecutionProviderDispatch> =
        providers.iter().copied().map(dispatch).collect();
    if !providers.contains(&ComputeProvider::Cpu) {
        dispatches.push(CPU::default().build());
    }

    Session::builder()?
        .with_execution_providers(dispatches)?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(model_path)
}
