//! # lapsmooth-mesh
//!
//! Triangle mesh representation with Structure-of-Arrays (SoA) layout,
//! plus the per-vertex neighbor topology the smoothing kernels consume.
//!
//! ## Key Types
//!
//! - [`TriangleMesh`]: positions, normals, texcoords, tangents and
//!   triangle indices in contiguous SoA buffers.
//! - [`AdjacencyGraph`]: deduplicated 1-ring neighborhoods flattened into
//!   `flat_neighbors` / `valence` / `offset` arrays.
//! - Normal/tangent generation and procedural generators for tests.

pub mod generators;
pub mod mesh;
pub mod normals;
pub mod topology;

pub use mesh::TriangleMesh;
pub use topology::AdjacencyGraph;
