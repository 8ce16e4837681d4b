//! Pipeline defaults and device-layout constants.

/// Default number of smoothing passes.
pub const DEFAULT_ITERATIONS: u32 = 1;

/// Upper bound accepted by configuration validation.
pub const MAX_ITERATIONS: u32 = 1_000_000;

/// Default input mesh path.
pub const DEFAULT_INPUT: &str = "in.obj";

/// Default output mesh path.
pub const DEFAULT_OUTPUT: &str = "out.obj";

/// Work-items per workgroup for device kernels. Must match `@workgroup_size`
/// in the WGSL kernel source.
pub const WORKGROUP_SIZE: u32 = 256;

/// Number of position components per vertex in device buffers.
pub const COMPONENTS_PER_VERTEX: usize = 3;

/// Length threshold below which an accumulated normal is left unnormalized.
pub const NORMAL_EPSILON: f32 = 1.0e-10;
