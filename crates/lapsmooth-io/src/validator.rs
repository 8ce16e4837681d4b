//! Configuration validation.
//!
//! Runs before any file is touched so a bad config fails fast with a
//! clear message instead of halfway through the pipeline.

use lapsmooth_types::constants::MAX_ITERATIONS;
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::contract::PipelineConfig;

/// Validates a pipeline configuration.
///
/// Checks:
/// - Input and output paths are non-empty and distinct
/// - Iteration count is within `MAX_ITERATIONS`
/// - Tangent generation is only requested together with texcoords
pub fn validate_config(config: &PipelineConfig) -> SmoothResult<()> {
    if config.input.as_os_str().is_empty() {
        return Err(SmoothError::InvalidConfig("Input path is empty".into()));
    }
    if config.output.as_os_str().is_empty() {
        return Err(SmoothError::InvalidConfig("Output path is empty".into()));
    }
    if config.input == config.output {
        return Err(SmoothError::InvalidConfig(format!(
            "Output path {} would overwrite the input",
            config.output.display()
        )));
    }
    if config.iterations > MAX_ITERATIONS {
        return Err(SmoothError::InvalidConfig(format!(
            "Iteration count {} exceeds the maximum of {}",
            config.iterations, MAX_ITERATIONS
        )));
    }
    if config.import.generate_tangents && !config.import.load_tex_coords {
        return Err(SmoothError::InvalidConfig(
            "generate_tangents requires load_tex_coords".into(),
        ));
    }
    Ok(())
}
