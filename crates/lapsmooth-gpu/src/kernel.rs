//! Per-vertex smoothing kernels.
//!
//! A kernel is invoked once per iteration over every vertex. For vertex
//! `i` it reads `neighbors[offset[i] .. offset[i] + valence[i]]` and the
//! source positions, and writes one new position for `i` only. Work-items
//! never communicate within a dispatch.
//!
//! Each kernel carries two equivalent forms: [`SmoothingKernel::update_vertex`]
//! for the CPU reference backend and a WGSL compute shader for wgpu. The
//! shader sees the current source positions at binding 3 and the
//! destination at binding 4; the backend swaps which physical buffer sits
//! at each binding when parity flips.

/// A per-vertex update rule.
pub trait SmoothingKernel: Send + Sync {
    fn name(&self) -> &str;

    /// WGSL compute shader with entry point `main` and
    /// `@workgroup_size(256)`.
    fn wgsl_source(&self) -> &str;

    /// New position of `vertex`, reading only from `source`.
    fn update_vertex(&self, vertex: usize, neighbors: &[u32], source: &[f32]) -> [f32; 3];
}

/// Moves every vertex to the average of its neighbors.
///
/// Vertices with no neighbors keep their position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborAverage;

impl SmoothingKernel for NeighborAverage {
    fn name(&self) -> &str {
        "neighbor_average"
    }

    fn wgsl_source(&self) -> &str {
        NEIGHBOR_AVERAGE_WGSL
    }

    fn update_vertex(&self, vertex: usize, neighbors: &[u32], source: &[f32]) -> [f32; 3] {
        let base = vertex * 3;
        if neighbors.is_empty() {
            return [source[base], source[base + 1], source[base + 2]];
        }
        let mut sum = [0.0f32; 3];
        for &n in neighbors {
            let p = n as usize * 3;
            sum[0] += source[p];
            sum[1] += source[p + 1];
            sum[2] += source[p + 2];
        }
        let count = neighbors.len() as f32;
        [sum[0] / count, sum[1] / count, sum[2] / count]
    }
}

const NEIGHBOR_AVERAGE_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read> neighbors: array<u32>;
@group(0) @binding(1) var<storage, read> valence: array<u32>;
@group(0) @binding(2) var<storage, read> offsets: array<u32>;
@group(0) @binding(3) var<storage, read> src_positions: array<f32>;
@group(0) @binding(4) var<storage, read_write> dst_positions: array<f32>;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&valence)) {
        return;
    }

    let base = i * 3u;
    let count = valence[i];
    if (count == 0u) {
        dst_positions[base] = src_positions[base];
        dst_positions[base + 1u] = src_positions[base + 1u];
        dst_positions[base + 2u] = src_positions[base + 2u];
        return;
    }

    let start = offsets[i];
    var sum = vec3<f32>(0.0, 0.0, 0.0);
    for (var k = 0u; k < count; k = k + 1u) {
        let p = neighbors[start + k] * 3u;
        sum = sum + vec3<f32>(src_positions[p], src_positions[p + 1u], src_positions[p + 2u]);
    }
    let avg = sum / f32(count);
    dst_positions[base] = avg.x;
    dst_positions[base + 1u] = avg.y;
    dst_positions[base + 2u] = avg.z;
}
"#;
