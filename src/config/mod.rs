//! This module handles the pipeline's configuration, including loading and saving
//! processing preferences to a `settings.toml` file.
//!
//! Processors read the shared configuration at transform time, so most settings
//! may change between calls without reinitialization. The exception is the
//! precision preference: a model handle is bound to the precision chosen when it
//! was constructed and does not honor later changes until the process restarts.
//!
//! # Examples
//!
//! ```no_run
//! use frame_forge::config::{self, PipelineConfig};
//!
//! // Load existing configuration
//! let mut config = config::load().unwrap_or_default();
//!
//! // Modify a setting
//! config.blend_opacity = 0.8;
//!
//! // Save the modified configuration
//! config::save(&config).expect("Failed to save config");
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "FrameForge";

/// Compute providers for ONNX inference, in preference order.
///
/// The first entry of [`PipelineConfig::execution_providers`] is the primary
/// provider; the rest are fallbacks registered in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeProvider {
    Cuda,
    TensorRt,
    CoreMl,
    DirectMl,
    Cpu,
}

impl ComputeProvider {
    /// Returns `true` if this provider indicates GPU acceleration.
    ///
    /// A GPU-primary provider list selects the reduced-precision model variant
    /// at handle construction time.
    #[must_use]
    pub fn is_gpu(&self) -> bool {
        !matches!(self, ComputeProvider::Cpu)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered compute-provider preferences; the first entry is primary.
    #[serde(default = "default_providers")]
    pub execution_providers: Vec<ComputeProvider>,
    /// Selector for the face-swap model artifact (filename stem).
    #[serde(default = "default_face_swap_model")]
    pub face_swap_model: String,
    /// Opacity of the swapped face over the original, 0.0..=1.0.
    #[serde(default = "default_blend_opacity")]
    pub blend_opacity: f32,
    /// When enabled, the original mouth region is preserved through a swap.
    #[serde(default)]
    pub mouth_mask: bool,
    /// Override for the directory holding model artifacts.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            execution_providers: default_providers(),
            face_swap_model: default_face_swap_model(),
            blend_opacity: default_blend_opacity(),
            mouth_mask: false,
            model_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Returns the primary compute provider.
    #[must_use]
    pub fn primary_provider(&self) -> ComputeProvider {
        self.execution_providers
            .first()
            .copied()
            .unwrap_or(ComputeProvider::Cpu)
    }

    /// Returns the directory model artifacts are expected in.
    ///
    /// Falls back to the user data directory, then the working directory.
    #[must_use]
    pub fn resolve_model_dir(&self) -> PathBuf {
        if let Some(dir) = &self.model_dir {
            return dir.clone();
        }
        dirs::data_dir().map_or_else(
            || PathBuf::from("."),
            |mut p| {
                p.push(APP_NAME);
                p.push("models");
                p
            },
        )
    }
}

fn default_providers() -> Vec<ComputeProvider> {
    vec![ComputeProvider::Cpu]
}

fn default_face_swap_model() -> String {
    "inswapper_128".to_string()
}

fn default_blend_opacity() -> f32 {
    1.0
}

/// Shared, runtime-mutable configuration handle read by processors at
/// transform time.
pub type SharedConfig = Arc<RwLock<PipelineConfig>>;

/// Wraps a configuration for sharing across processors and workers.
#[must_use]
pub fn shared(config: PipelineConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<PipelineConfig> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(PipelineConfig::default())
}

pub fn save(config: &PipelineConfig) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_default())
}

pub fn save_to_path(config: &PipelineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
