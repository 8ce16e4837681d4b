//! Core triangle mesh type with SoA (Structure of Arrays) layout.
//!
//! The SoA layout stores each coordinate channel contiguously:
//! - `pos_x: [x0, x1, x2, ...]`
//! - `pos_y: [y0, y1, y2, ...]`
//! - `pos_z: [z0, z1, z2, ...]`
//!
//! Device buffers want interleaved `[x0, y0, z0, x1, ...]` instead;
//! [`TriangleMesh::interleaved_positions`] and
//! [`TriangleMesh::set_interleaved_positions`] convert at the boundary.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use lapsmooth_types::constants::COMPONENTS_PER_VERTEX;
use lapsmooth_types::{SmoothError, SmoothResult};

/// A triangle mesh stored in Structure-of-Arrays layout.
///
/// Vertex identity is the index in import order. Faces are triangulated
/// before they reach this type, so `indices` always holds whole triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    // --- Vertex data (SoA) ---
    /// X coordinates of all vertices.
    pub pos_x: Vec<f32>,
    /// Y coordinates of all vertices.
    pub pos_y: Vec<f32>,
    /// Z coordinates of all vertices.
    pub pos_z: Vec<f32>,

    /// X components of vertex normals.
    pub normal_x: Vec<f32>,
    /// Y components of vertex normals.
    pub normal_y: Vec<f32>,
    /// Z components of vertex normals.
    pub normal_z: Vec<f32>,

    /// U texture coordinates. Empty when texcoords were not loaded.
    pub uv_u: Vec<f32>,
    /// V texture coordinates. Empty when texcoords were not loaded.
    pub uv_v: Vec<f32>,

    /// Per-vertex tangents `[tx, ty, tz, handedness]`. Empty unless generated.
    pub tangents: Vec<[f32; 4]>,

    // --- Triangle data ---
    /// Triangle indices: each triangle is [v0, v1, v2].
    /// Stored flat: `[t0v0, t0v1, t0v2, t1v0, t1v1, t1v2, ...]`
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns the position of vertex `i` as `[x, y, z]`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.pos_x[i], self.pos_y[i], self.pos_z[i]]
    }

    /// Returns the position as a `glam::Vec3`.
    #[inline]
    pub fn position_vec3(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Returns the normal of vertex `i` as a `glam::Vec3`.
    #[inline]
    pub fn normal_vec3(&self, i: usize) -> Vec3 {
        Vec3::new(self.normal_x[i], self.normal_y[i], self.normal_z[i])
    }

    /// Returns the three vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let base = t * 3;
        [self.indices[base], self.indices[base + 1], self.indices[base + 2]]
    }

    /// Returns true when per-vertex texture coordinates are present.
    #[inline]
    pub fn has_tex_coords(&self) -> bool {
        !self.uv_u.is_empty()
    }

    /// Sets the position of vertex `i`.
    #[inline]
    pub fn set_position(&mut self, i: usize, x: f32, y: f32, z: f32) {
        self.pos_x[i] = x;
        self.pos_y[i] = y;
        self.pos_z[i] = z;
    }

    /// Appends a vertex with a zero normal.
    pub fn push_vertex(&mut self, x: f32, y: f32, z: f32) {
        self.pos_x.push(x);
        self.pos_y.push(y);
        self.pos_z.push(z);
        self.normal_x.push(0.0);
        self.normal_y.push(0.0);
        self.normal_z.push(0.0);
    }

    /// Creates an empty mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, triangle_capacity: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(vertex_capacity),
            pos_y: Vec::with_capacity(vertex_capacity),
            pos_z: Vec::with_capacity(vertex_capacity),
            normal_x: Vec::with_capacity(vertex_capacity),
            normal_y: Vec::with_capacity(vertex_capacity),
            normal_z: Vec::with_capacity(vertex_capacity),
            uv_u: Vec::new(),
            uv_v: Vec::new(),
            tangents: Vec::new(),
            indices: Vec::with_capacity(triangle_capacity * 3),
        }
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - Position and normal arrays have the vertex count
    /// - Texcoord and tangent arrays are either empty or full length
    /// - Triangle indices are within bounds
    ///
    /// Degenerate triangles (repeated indices, zero area) are accepted.
    pub fn validate(&self) -> SmoothResult<()> {
        let n = self.pos_x.len();

        if self.pos_y.len() != n || self.pos_z.len() != n {
            return Err(SmoothError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }
        if self.normal_x.len() != n || self.normal_y.len() != n || self.normal_z.len() != n {
            return Err(SmoothError::InvalidMesh(
                "Normal arrays have inconsistent lengths".into(),
            ));
        }
        if self.uv_u.len() != self.uv_v.len() || (!self.uv_u.is_empty() && self.uv_u.len() != n) {
            return Err(SmoothError::InvalidMesh(
                "UV arrays have inconsistent lengths".into(),
            ));
        }
        if !self.tangents.is_empty() && self.tangents.len() != n {
            return Err(SmoothError::InvalidMesh(format!(
                "Tangent count ({}) != vertex count ({})",
                self.tangents.len(),
                n
            )));
        }

        if self.indices.len() % 3 != 0 {
            return Err(SmoothError::InvalidMesh(
                "Index count is not divisible by 3".into(),
            ));
        }

        for (i, &idx) in self.indices.iter().enumerate() {
            if idx as usize >= n {
                return Err(SmoothError::InvalidMesh(format!(
                    "Index {} at position {} is out of range (vertex count: {})",
                    idx, i, n
                )));
            }
        }

        Ok(())
    }

    /// Returns the number of triangles with a repeated vertex index.
    pub fn degenerate_triangle_count(&self) -> usize {
        (0..self.triangle_count())
            .filter(|&t| {
                let [a, b, c] = self.triangle(t);
                a == b || b == c || a == c
            })
            .count()
    }

    /// Returns positions interleaved as `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn interleaved_positions(&self) -> Vec<f32> {
        let n = self.vertex_count();
        let mut out = Vec::with_capacity(n * COMPONENTS_PER_VERTEX);
        for i in 0..n {
            out.push(self.pos_x[i]);
            out.push(self.pos_y[i]);
            out.push(self.pos_z[i]);
        }
        out
    }

    /// Overwrites positions from interleaved data read back from a device.
    pub fn set_interleaved_positions(&mut self, positions: &[f32]) -> SmoothResult<()> {
        if positions.len() != self.vertex_count() * COMPONENTS_PER_VERTEX {
            return Err(SmoothError::InvalidMesh(format!(
                "Interleaved position length {} does not match {} vertices",
                positions.len(),
                self.vertex_count()
            )));
        }
        for (i, p) in positions.chunks_exact(COMPONENTS_PER_VERTEX).enumerate() {
            self.set_position(i, p[0], p[1], p[2]);
        }
        Ok(())
    }

    /// Constructs a mesh from interleaved AoS position data.
    ///
    /// Normals are zeroed; call
    /// [`compute_vertex_normals`](crate::normals::compute_vertex_normals)
    /// if they are needed.
    pub fn from_interleaved(positions: &[f32], indices: &[u32]) -> SmoothResult<Self> {
        if positions.len() % COMPONENTS_PER_VERTEX != 0 {
            return Err(SmoothError::InvalidMesh(
                "Interleaved positions length not divisible by 3".into(),
            ));
        }

        let n = positions.len() / COMPONENTS_PER_VERTEX;
        let mut mesh = Self::with_capacity(n, indices.len() / 3);
        for p in positions.chunks_exact(COMPONENTS_PER_VERTEX) {
            mesh.push_vertex(p[0], p[1], p[2]);
        }
        mesh.indices = indices.to_vec();

        mesh.validate()?;
        Ok(mesh)
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        if self.vertex_count() == 0 {
            return None;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..self.vertex_count() {
            let p = self.position_vec3(i);
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }

    /// Translates the mesh so its bounding-box centre sits at the origin.
    ///
    /// Returns the translation that was applied.
    pub fn recenter(&mut self) -> Vec3 {
        let Some((min, max)) = self.bounding_box() else {
            return Vec3::ZERO;
        };
        let shift = -(min + max) * 0.5;
        for i in 0..self.vertex_count() {
            self.pos_x[i] += shift.x;
            self.pos_y[i] += shift.y;
            self.pos_z[i] += shift.z;
        }
        shift
    }
}
