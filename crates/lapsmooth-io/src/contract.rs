//! Pipeline configuration contract.
//!
//! Replaces the fixed input/output/iteration globals of a one-shot
//! smoothing tool with a serializable struct. Loaded from TOML by the
//! CLI and passed explicitly into the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use lapsmooth_types::constants::{DEFAULT_INPUT, DEFAULT_ITERATIONS, DEFAULT_OUTPUT};
use lapsmooth_types::{SmoothError, SmoothResult};

/// Importer switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Translate the mesh so its bounding-box centre is at the origin.
    pub recenter: bool,
    /// Keep `vt` texture coordinates when they line up with positions.
    pub load_tex_coords: bool,
    /// Generate per-vertex tangents (requires texture coordinates).
    pub generate_tangents: bool,
}

/// Which compute backend runs the smoothing kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Sequential host reference implementation.
    #[default]
    Cpu,
    /// GPU compute through wgpu.
    Wgpu,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(format!("unknown backend '{other}' (expected cpu or wgpu)")),
        }
    }
}

/// Complete configuration for one smoothing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mesh to read.
    pub input: PathBuf,
    /// Mesh to write.
    pub output: PathBuf,
    /// Number of smoothing passes. Zero copies the input geometry through.
    pub iterations: u32,
    /// Compute backend.
    pub backend: BackendKind,
    /// Importer switches.
    pub import: ImportOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            iterations: DEFAULT_ITERATIONS,
            backend: BackendKind::default(),
            import: ImportOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> SmoothResult<Self> {
        toml::from_str(text).map_err(|e| SmoothError::Serialization(e.to_string()))
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> SmoothResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SmoothError::file_access(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Serializes the config back to TOML.
    pub fn to_toml_string(&self) -> SmoothResult<String> {
        toml::to_string(self).map_err(|e| SmoothError::Serialization(e.to_string()))
    }
}
