//! Vertex normal and tangent generation from triangle mesh data.
//!
//! Normals are the unweighted average of the unit face normals around
//! each vertex. Tangents follow the per-triangle texture-space derivation
//! and are orthogonalized against the vertex normal.

use glam::{Vec2, Vec3};
use lapsmooth_types::constants::NORMAL_EPSILON;
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::mesh::TriangleMesh;

/// Determinant magnitude below which a triangle's UV mapping is treated
/// as degenerate and left out of tangent accumulation.
const UV_DETERMINANT_EPSILON: f32 = 1.0e-12;

/// Recompute vertex normals from triangle geometry.
///
/// Each triangle's cross product is normalized before it is added to its
/// three vertices, so large and small faces count equally. Zero-area
/// triangles contribute nothing. Accumulated vectors are normalized at the end.
///
/// This overwrites the mesh's `normal_x`, `normal_y`, `normal_z` arrays.
pub fn compute_vertex_normals(mesh: &mut TriangleMesh) {
    let n = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; n];

    for t in 0..mesh.triangle_count() {
        let [ia, ib, ic] = mesh.triangle(t);
        let (a, b, c) = (ia as usize, ib as usize, ic as usize);

        let e1 = mesh.position_vec3(b) - mesh.position_vec3(a);
        let e2 = mesh.position_vec3(c) - mesh.position_vec3(a);
        let face = e1.cross(e2).normalize_or_zero();

        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    mesh.normal_x.resize(n, 0.0);
    mesh.normal_y.resize(n, 0.0);
    mesh.normal_z.resize(n, 0.0);

    for (i, v) in accum.into_iter().enumerate() {
        let len = v.length();
        let v = if len > NORMAL_EPSILON { v / len } else { v };
        mesh.normal_x[i] = v.x;
        mesh.normal_y[i] = v.y;
        mesh.normal_z[i] = v.z;
    }
}

/// Generate per-vertex tangents into `mesh.tangents`.
///
/// Requires texture coordinates and normals. Triangles whose UV
/// determinant is (near) zero are skipped; the number skipped is returned.
/// The `w` component holds the bitangent handedness (`1.0` or `-1.0`).
pub fn compute_tangents(mesh: &mut TriangleMesh) -> SmoothResult<usize> {
    if !mesh.has_tex_coords() {
        return Err(SmoothError::InvalidMesh(
            "Tangent generation requires texture coordinates".into(),
        ));
    }

    let n = mesh.vertex_count();
    let mut tan = vec![Vec3::ZERO; n];
    let mut bitan = vec![Vec3::ZERO; n];
    let mut skipped = 0usize;

    let uv = |i: usize| Vec2::new(mesh.uv_u[i], mesh.uv_v[i]);

    for t in 0..mesh.triangle_count() {
        let [ia, ib, ic] = mesh.triangle(t);
        let (a, b, c) = (ia as usize, ib as usize, ic as usize);

        let e1 = mesh.position_vec3(b) - mesh.position_vec3(a);
        let e2 = mesh.position_vec3(c) - mesh.position_vec3(a);
        let d1 = uv(b) - uv(a);
        let d2 = uv(c) - uv(a);

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < UV_DETERMINANT_EPSILON {
            skipped += 1;
            continue;
        }
        let r = 1.0 / det;
        let sdir = (e1 * d2.y - e2 * d1.y) * r;
        let tdir = (e2 * d1.x - e1 * d2.x) * r;

        for v in [a, b, c] {
            tan[v] += sdir;
            bitan[v] += tdir;
        }
    }

    mesh.tangents = (0..n)
        .map(|i| {
            let normal = mesh.normal_vec3(i);
            let t = (tan[i] - normal * normal.dot(tan[i])).normalize_or_zero();
            let w = if normal.cross(tan[i]).dot(bitan[i]) < 0.0 { -1.0 } else { 1.0 };
            [t.x, t.y, t.z, w]
        })
        .collect();

    if skipped > 0 {
        tracing::warn!(skipped, "triangles with degenerate UVs left out of tangent generation");
    }
    Ok(skipped)
}
