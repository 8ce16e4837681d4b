//! Integration tests for lapsmooth-mesh.

use std::collections::HashSet;

use lapsmooth_mesh::generators::{quad_grid, unit_tetrahedron, uv_sphere};
use lapsmooth_mesh::normals::{compute_tangents, compute_vertex_normals};
use lapsmooth_mesh::{AdjacencyGraph, TriangleMesh};

// ─── TriangleMesh Tests ───────────────────────────────────────

fn make_single_triangle() -> TriangleMesh {
    TriangleMesh {
        pos_x: vec![0.0, 1.0, 0.0],
        pos_y: vec![0.0, 0.0, 1.0],
        pos_z: vec![0.0, 0.0, 0.0],
        normal_x: vec![0.0, 0.0, 0.0],
        normal_y: vec![0.0, 0.0, 0.0],
        normal_z: vec![1.0, 1.0, 1.0],
        uv_u: vec![0.0, 1.0, 0.0],
        uv_v: vec![0.0, 0.0, 1.0],
        tangents: Vec::new(),
        indices: vec![0, 1, 2],
    }
}

#[test]
fn basic_counts() {
    let mesh = make_single_triangle();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.triangle_count(), 1);
}

#[test]
fn position_access() {
    let mesh = make_single_triangle();
    assert_eq!(mesh.position(1), [1.0, 0.0, 0.0]);
    assert_eq!(mesh.triangle(0), [0, 1, 2]);
}

#[test]
fn validate_ok() {
    assert!(make_single_triangle().validate().is_ok());
}

#[test]
fn validate_catches_inconsistent_lengths() {
    let mut mesh = make_single_triangle();
    mesh.pos_y.push(99.0);
    assert!(mesh.validate().is_err());
}

#[test]
fn validate_catches_oob_index() {
    let mut mesh = make_single_triangle();
    mesh.indices[2] = 99;
    assert!(mesh.validate().is_err());
}

#[test]
fn validate_accepts_degenerate_but_counts_it() {
    let mut mesh = make_single_triangle();
    mesh.indices = vec![0, 0, 1];
    assert!(mesh.validate().is_ok());
    assert_eq!(mesh.degenerate_triangle_count(), 1);
}

#[test]
fn validate_catches_partial_tangents() {
    let mut mesh = make_single_triangle();
    mesh.tangents = vec![[1.0, 0.0, 0.0, 1.0]];
    assert!(mesh.validate().is_err());
}

#[test]
fn interleaved_round_trip() {
    let positions = vec![0.0, 0.5, 0.25, 1.0, 0.0, 0.0, 0.0, 1.0, -3.0];
    let mut mesh = TriangleMesh::from_interleaved(&positions, &[0, 1, 2]).unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.pos_z, vec![0.25, 0.0, -3.0]);
    assert_eq!(mesh.interleaved_positions(), positions);

    mesh.set_interleaved_positions(&[9.0; 9]).unwrap();
    assert_eq!(mesh.position(2), [9.0, 9.0, 9.0]);
}

#[test]
fn set_interleaved_rejects_wrong_length() {
    let mut mesh = make_single_triangle();
    assert!(mesh.set_interleaved_positions(&[0.0; 8]).is_err());
}

#[test]
fn from_interleaved_rejects_ragged_data() {
    assert!(TriangleMesh::from_interleaved(&[0.0, 1.0], &[]).is_err());
}

#[test]
fn recenter_moves_bbox_center_to_origin() {
    let mut mesh = TriangleMesh::from_interleaved(&[2.0, 2.0, 2.0, 4.0, 6.0, 2.0], &[]).unwrap();
    let shift = mesh.recenter();
    assert_eq!(shift.to_array(), [-3.0, -4.0, -2.0]);
    let (min, max) = mesh.bounding_box().unwrap();
    assert_eq!((min + max).to_array(), [0.0, 0.0, 0.0]);
}

#[test]
fn recenter_empty_mesh_is_noop() {
    let mut mesh = TriangleMesh::default();
    assert_eq!(mesh.recenter().to_array(), [0.0, 0.0, 0.0]);
    assert!(mesh.bounding_box().is_none());
}

#[test]
fn mesh_is_serializable() {
    let mesh = unit_tetrahedron();
    let json = serde_json::to_string(&mesh).unwrap();
    let recovered: TriangleMesh = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, mesh);
}

// ─── Generator Tests ──────────────────────────────────────────

#[test]
fn quad_grid_counts() {
    let mesh = quad_grid(20, 20, 2.0, 2.0);
    assert_eq!(mesh.vertex_count(), 441);
    assert_eq!(mesh.triangle_count(), 800);
    assert!(mesh.validate().is_ok());
}

#[test]
fn quad_grid_dimensions() {
    let mesh = quad_grid(4, 4, 2.0, 2.0);
    assert!((mesh.pos_x[0] - (-1.0)).abs() < 1e-6);
    assert!((mesh.pos_y[0] - 1.0).abs() < 1e-6);
    assert!((mesh.pos_x[4] - 1.0).abs() < 1e-6);
}

#[test]
fn tetrahedron_shape() {
    let mesh = unit_tetrahedron();
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.triangle_count(), 4);
    assert!(mesh.validate().is_ok());
}

#[test]
fn uv_sphere_radius() {
    let mesh = uv_sphere(2.5, 8, 16);
    assert!(mesh.validate().is_ok());
    for i in 0..mesh.vertex_count() {
        let dist = mesh.position_vec3(i).length();
        assert!((dist - 2.5).abs() < 1e-4, "Vertex {} at distance {}", i, dist);
    }
}

// ─── Adjacency Tests ──────────────────────────────────────────

fn assert_csr_invariants(graph: &AdjacencyGraph) {
    let valence = graph.valences();
    let offset = graph.offsets();
    if graph.vertex_count() == 0 {
        assert!(graph.flat_neighbors().is_empty());
        return;
    }
    assert_eq!(offset[0], 0);
    for k in 0..graph.vertex_count() - 1 {
        assert_eq!(offset[k + 1], offset[k] + valence[k]);
    }
    let last = graph.vertex_count() - 1;
    assert_eq!(
        graph.flat_neighbors().len(),
        (offset[last] + valence[last]) as usize
    );
}

fn unique_edges(indices: &[u32]) -> usize {
    let mut edges = HashSet::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if a != b {
                edges.insert((a.min(b), a.max(b)));
            }
        }
    }
    edges.len()
}

#[test]
fn tetrahedron_is_complete_graph() {
    let mesh = unit_tetrahedron();
    let graph = AdjacencyGraph::from_mesh(&mesh).unwrap();
    for v in 0..4 {
        assert_eq!(graph.valence(v), 3);
        let others: Vec<u32> = (0..4).filter(|&u| u != v as u32).collect();
        assert_eq!(graph.neighbors(v), others.as_slice());
    }
    assert_eq!(graph.edge_count(), 6);
    assert_csr_invariants(&graph);
}

#[test]
fn grid_center_one_ring() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let graph = AdjacencyGraph::from_mesh(&mesh).unwrap();
    assert_eq!(graph.valence(4), 6);
    assert_eq!(graph.max_valence(), 6);
}

#[test]
fn valence_sum_is_twice_unique_edges() {
    for mesh in [quad_grid(7, 3, 1.0, 1.0), uv_sphere(1.0, 6, 9), unit_tetrahedron()] {
        let graph = AdjacencyGraph::from_mesh(&mesh).unwrap();
        let sum: u32 = graph.valences().iter().sum();
        assert_eq!(sum as usize, 2 * unique_edges(&mesh.indices));
        assert!(graph.is_symmetric());
        assert_csr_invariants(&graph);
    }
}

#[test]
fn shared_edges_are_deduplicated() {
    // Two triangles sharing edge 1-2.
    let graph = AdjacencyGraph::build(4, &[0, 1, 2, 2, 1, 3]).unwrap();
    assert_eq!(graph.neighbors(1), &[0, 2, 3]);
    assert_eq!(graph.neighbors(2), &[0, 1, 3]);
    assert_eq!(graph.edge_count(), 5);
}

#[test]
fn degenerate_triangle_has_no_self_loop() {
    let graph = AdjacencyGraph::build(3, &[0, 0, 1]).unwrap();
    assert_eq!(graph.neighbors(0), &[1]);
    assert_eq!(graph.neighbors(1), &[0]);
    assert!(graph.is_symmetric());
}

#[test]
fn isolated_vertices_have_zero_valence() {
    let graph = AdjacencyGraph::build(5, &[0, 1, 2]).unwrap();
    assert_eq!(graph.isolated_vertices(), vec![3, 4]);
    assert_eq!(graph.offset(3), 6);
    assert!(graph.neighbors(4).is_empty());
    assert_csr_invariants(&graph);
}

#[test]
fn empty_graph() {
    let graph = AdjacencyGraph::build(0, &[]).unwrap();
    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(graph.max_valence(), 0);
    assert_csr_invariants(&graph);
}

#[test]
fn build_rejects_out_of_range_index() {
    assert!(AdjacencyGraph::build(2, &[0, 1, 2]).is_err());
}

#[test]
fn build_rejects_partial_triangle() {
    assert!(AdjacencyGraph::build(3, &[0, 1]).is_err());
}

#[test]
fn from_neighbor_lists_preserves_order() {
    let graph = AdjacencyGraph::from_neighbor_lists(&[vec![2, 1], vec![0], vec![0]]).unwrap();
    assert_eq!(graph.flat_neighbors(), &[2, 1, 0, 0]);
    assert_eq!(graph.offsets(), &[0, 2, 3]);
}

#[test]
fn from_neighbor_lists_rejects_unknown_vertex() {
    assert!(AdjacencyGraph::from_neighbor_lists(&[vec![5]]).is_err());
}

// ─── Normal Tests ─────────────────────────────────────────────

#[test]
fn flat_grid_normals() {
    let mesh = quad_grid(4, 4, 1.0, 1.0);
    for i in 0..mesh.vertex_count() {
        assert!(mesh.normal_x[i].abs() < 1e-5);
        assert!(mesh.normal_y[i].abs() < 1e-5);
        assert!(mesh.normal_z[i] > 0.99);
    }
}

#[test]
fn normals_are_unweighted_face_average() {
    // Vertex 0 touches one large face in the XY plane and one tiny face in
    // the XZ plane; both must count equally.
    let positions = [
        0.0, 0.0, 0.0, //
        10.0, 0.0, 0.0, //
        0.0, 10.0, 0.0, //
        0.0, 0.0, -0.01,
    ];
    let mut mesh = TriangleMesh::from_interleaved(&positions, &[0, 1, 2, 0, 1, 3]).unwrap();
    compute_vertex_normals(&mut mesh);
    let n = mesh.normal_vec3(0);
    let expected = glam::Vec3::new(0.0, 1.0, 1.0).normalize();
    assert!((n - expected).length() < 1e-5, "got {:?}", n);
}

#[test]
fn zero_area_triangle_contributes_nothing() {
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0];
    let mut mesh = TriangleMesh::from_interleaved(&positions, &[0, 1, 2]).unwrap();
    compute_vertex_normals(&mut mesh);
    for i in 0..3 {
        assert_eq!(mesh.normal_vec3(i).to_array(), [0.0, 0.0, 0.0]);
    }
}

#[test]
fn tetrahedron_normals_point_outward() {
    let mesh = unit_tetrahedron();
    let centroid = glam::Vec3::splat(0.25);
    for i in 0..mesh.vertex_count() {
        let outward = mesh.position_vec3(i) - centroid;
        assert!(mesh.normal_vec3(i).dot(outward) > 0.0);
        assert!((mesh.normal_vec3(i).length() - 1.0).abs() < 1e-5);
    }
}

// ─── Tangent Tests ────────────────────────────────────────────

#[test]
fn grid_tangents_follow_u_axis() {
    let mut mesh = quad_grid(3, 3, 1.0, 1.0);
    let skipped = compute_tangents(&mut mesh).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(mesh.tangents.len(), mesh.vertex_count());
    for t in &mesh.tangents {
        assert!((t[0] - 1.0).abs() < 1e-5, "tangent {:?}", t);
        assert!(t[3] == 1.0 || t[3] == -1.0);
    }
    assert!(mesh.validate().is_ok());
}

#[test]
fn tangents_require_tex_coords() {
    let mut mesh = unit_tetrahedron();
    assert!(compute_tangents(&mut mesh).is_err());
}

#[test]
fn degenerate_uvs_are_skipped() {
    let mut mesh = make_single_triangle();
    mesh.uv_u = vec![0.5; 3];
    mesh.uv_v = vec![0.5; 3];
    assert_eq!(compute_tangents(&mut mesh).unwrap(), 1);
    assert_eq!(mesh.tangents[0][..3], [0.0, 0.0, 0.0]);
}
