//! Integration tests for lapsmooth-gpu.

use lapsmooth_gpu::{
    BufferAccess, BufferLayout, BufferSlot, ComputeBackend, ComputeBuffer, CpuFallback,
    DeviceBufferSet, NeighborAverage, Parity, SmoothingKernel, SmoothingScheduler,
};
use lapsmooth_mesh::generators::{quad_grid, unit_tetrahedron, uv_sphere};
use lapsmooth_mesh::{AdjacencyGraph, TriangleMesh};
use lapsmooth_types::SmoothError;

fn upload(mesh: &TriangleMesh) -> DeviceBufferSet {
    let adjacency = AdjacencyGraph::from_mesh(mesh).unwrap();
    DeviceBufferSet::from_mesh(Box::new(CpuFallback::new()), mesh, &adjacency).unwrap()
}

/// Double-buffered host application of a kernel, for comparison.
fn reference_smooth(mesh: &TriangleMesh, kernel: &dyn SmoothingKernel, iterations: u32) -> Vec<f32> {
    let adjacency = AdjacencyGraph::from_mesh(mesh).unwrap();
    let mut current = mesh.interleaved_positions();
    for _ in 0..iterations {
        let mut next = current.clone();
        for v in 0..mesh.vertex_count() {
            let p = kernel.update_vertex(v, adjacency.neighbors(v), &current);
            next[v * 3..v * 3 + 3].copy_from_slice(&p);
        }
        current = next;
    }
    current
}

fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() <= tol, "component {i}: {x} vs {y}");
    }
}

/// Moves every vertex by +1 on x, ignoring neighbors.
struct ShiftX;

impl SmoothingKernel for ShiftX {
    fn name(&self) -> &str {
        "shift_x"
    }

    fn wgsl_source(&self) -> &str {
        ""
    }

    fn update_vertex(&self, vertex: usize, _neighbors: &[u32], source: &[f32]) -> [f32; 3] {
        let b = vertex * 3;
        [source[b] + 1.0, source[b + 1], source[b + 2]]
    }
}

// ─── Slot Tests ───────────────────────────────────────────────

#[test]
fn slot_bindings_are_fixed() {
    let bindings: Vec<u32> = BufferSlot::ALL.iter().map(|s| s.binding()).collect();
    assert_eq!(bindings, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(BufferSlot::from_binding(3), Some(BufferSlot::PositionsA));
    assert_eq!(BufferSlot::from_binding(4), Some(BufferSlot::PositionsB));
    assert_eq!(BufferSlot::from_binding(6), None);
}

#[test]
fn only_positions_are_writable() {
    for slot in BufferSlot::ALL {
        let expected = matches!(slot, BufferSlot::PositionsA | BufferSlot::PositionsB);
        assert_eq!(slot.access() == BufferAccess::ReadWrite, expected, "{slot}");
        assert_eq!(slot.is_position(), expected);
    }
}

// ─── Buffer Tests ─────────────────────────────────────────────

#[test]
fn buffer_zeros() {
    let buf = ComputeBuffer::<f32>::zeros(100);
    assert_eq!(buf.len(), 100);
    assert_eq!(buf.byte_len(), 400);
    assert!(buf.as_slice().iter().all(|&x| x == 0.0));
}

#[test]
fn buffer_copy_requires_matching_length() {
    let mut buf = ComputeBuffer::<u32>::zeros(3);
    buf.copy_from_slice(&[7, 8, 9]).unwrap();
    assert_eq!(buf.as_slice(), &[7, 8, 9]);
    assert!(buf.copy_from_slice(&[1, 2]).is_err());
    assert_eq!(buf.as_bytes().len(), 12);
}

#[test]
fn layout_of_tetrahedron() {
    let mesh = unit_tetrahedron();
    let adjacency = AdjacencyGraph::from_mesh(&mesh).unwrap();
    let layout = BufferLayout::from_mesh(&mesh, &adjacency).unwrap();

    assert_eq!(layout.vertex_count(), 4);
    assert_eq!(layout.triangle_count(), 4);
    assert_eq!(layout.neighbor_count(), 12);
    assert_eq!(layout.valence, vec![3, 3, 3, 3]);
    assert_eq!(layout.offset, vec![0, 3, 6, 9]);
    assert_eq!(layout.region_len(BufferSlot::PositionsB), 12);
    assert_eq!(
        layout.region_bytes(BufferSlot::PositionsA),
        layout.region_bytes(BufferSlot::PositionsB)
    );
    assert_eq!(layout.region_bytes(BufferSlot::Triangles).len(), 48);
}

#[test]
fn layout_rejects_mismatched_adjacency() {
    let mesh = unit_tetrahedron();
    let adjacency = AdjacencyGraph::build(3, &[0, 1, 2]).unwrap();
    let err = BufferLayout::from_mesh(&mesh, &adjacency).unwrap_err();
    assert!(matches!(err, SmoothError::InvalidMesh(_)));
}

#[test]
fn layout_rejects_bad_triangles() {
    let adjacency = AdjacencyGraph::build(3, &[0, 1, 2]).unwrap();
    let positions = [0.0f32; 9];
    assert!(BufferLayout::build(&positions, &adjacency, &[0, 1, 3]).is_err());
    assert!(BufferLayout::build(&positions, &adjacency, &[0, 1]).is_err());
    assert!(BufferLayout::build(&positions[..8], &adjacency, &[0, 1, 2]).is_err());
}

// ─── CpuFallback Tests ────────────────────────────────────────

#[test]
fn cpu_identity() {
    let backend = CpuFallback::new();
    assert_eq!(backend.name(), "cpu_fallback");
    assert_eq!(backend.kernel_name(), "neighbor_average");
    assert!(!backend.is_gpu());
    assert!(!backend.is_uploaded());
    assert_eq!(backend.dispatch_count(), 0);
}

#[test]
fn cpu_dispatch_before_upload_fails() {
    let mut backend = CpuFallback::new();
    let err = backend
        .dispatch(BufferSlot::PositionsA, BufferSlot::PositionsB, 0)
        .unwrap_err();
    assert!(err.is_device());
}

#[test]
fn write_once_regions_refused_as_destination() {
    let mesh = unit_tetrahedron();
    let adjacency = AdjacencyGraph::from_mesh(&mesh).unwrap();
    let layout = BufferLayout::from_mesh(&mesh, &adjacency).unwrap();
    let mut backend = CpuFallback::new();
    backend.upload(&layout).unwrap();

    for slot in [
        BufferSlot::Neighbors,
        BufferSlot::Valence,
        BufferSlot::Offset,
        BufferSlot::Triangles,
    ] {
        assert!(backend.dispatch(BufferSlot::PositionsA, slot, 4).is_err());
    }
    assert!(backend
        .dispatch(BufferSlot::PositionsA, BufferSlot::PositionsA, 4)
        .is_err());
    assert!(backend
        .dispatch(BufferSlot::Valence, BufferSlot::PositionsB, 4)
        .is_err());
    assert!(backend
        .dispatch(BufferSlot::PositionsA, BufferSlot::PositionsB, 5)
        .is_err());
    assert_eq!(backend.dispatch_count(), 0);
    assert_eq!(backend.read_triangles().unwrap(), mesh.indices);
}

#[test]
fn cpu_requires_barrier_between_dispatches() {
    let mesh = unit_tetrahedron();
    let adjacency = AdjacencyGraph::from_mesh(&mesh).unwrap();
    let layout = BufferLayout::from_mesh(&mesh, &adjacency).unwrap();
    let mut backend = CpuFallback::new();
    backend.upload(&layout).unwrap();

    backend
        .dispatch(BufferSlot::PositionsA, BufferSlot::PositionsB, 4)
        .unwrap();
    assert!(backend
        .dispatch(BufferSlot::PositionsB, BufferSlot::PositionsA, 4)
        .is_err());
    assert!(backend.read_positions(BufferSlot::PositionsB).is_err());

    backend.barrier().unwrap();
    assert!(backend.read_positions(BufferSlot::PositionsB).is_ok());
    assert_eq!(backend.dispatch_count(), 1);
}

// ─── Scheduler Tests ──────────────────────────────────────────

#[test]
fn tetrahedron_one_iteration_moves_to_neighbor_centroid() {
    let mesh = unit_tetrahedron();
    let mut buffers = upload(&mesh);
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(1).unwrap();

    let third = 1.0 / 3.0;
    let expected = [
        third, third, third, // (0,0,0) -> mean of the three axis points
        0.0, third, third, //
        third, 0.0, third, //
        third, third, 0.0,
    ];
    assert_close(&outcome.positions, &expected, 1e-6);
    assert_eq!(outcome.dispatches, 1);
    assert_eq!(outcome.authoritative, BufferSlot::PositionsB);
    assert_eq!(outcome.final_parity, Parity::BSource);
}

#[test]
fn zero_iterations_is_bit_identical_and_dispatch_free() {
    let mesh = uv_sphere(0.7, 6, 9);
    let mut buffers = upload(&mesh);
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(0).unwrap();

    assert_eq!(outcome.dispatches, 0);
    assert_eq!(buffers.dispatch_count(), 0);
    assert_eq!(outcome.authoritative, BufferSlot::PositionsA);
    assert_eq!(outcome.final_parity, Parity::ASource);
    let original = mesh.interleaved_positions();
    assert_eq!(outcome.positions.len(), original.len());
    for (a, b) in outcome.positions.iter().zip(&original) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn final_buffer_follows_dispatch_count() {
    let mesh = quad_grid(4, 3, 2.0, 1.5);
    for iterations in 1..=6u32 {
        let mut buffers = upload(&mesh);
        let outcome = SmoothingScheduler::new(&mut buffers)
            .smooth(iterations)
            .unwrap();

        assert_eq!(outcome.dispatches, u64::from(iterations));
        assert_eq!(buffers.dispatch_count(), u64::from(iterations));
        let expected_slot = if outcome.dispatches % 2 == 1 {
            BufferSlot::PositionsB
        } else {
            BufferSlot::PositionsA
        };
        assert_eq!(outcome.authoritative, expected_slot, "iterations = {iterations}");
        assert_eq!(outcome.final_parity.source(), outcome.authoritative);

        let expected = reference_smooth(&mesh, &NeighborAverage, iterations);
        assert_eq!(outcome.positions, expected, "iterations = {iterations}");
    }
}

#[test]
fn stale_buffer_differs_from_authoritative() {
    let mesh = unit_tetrahedron();
    let mut buffers = upload(&mesh);
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(2).unwrap();
    let stale = buffers.read_positions(BufferSlot::PositionsB).unwrap();
    assert_ne!(outcome.positions, stale);
    assert_eq!(outcome.positions, reference_smooth(&mesh, &NeighborAverage, 2));
    assert_eq!(stale, reference_smooth(&mesh, &NeighborAverage, 1));
}

#[test]
fn repeated_calls_continue_the_parity() {
    let mesh = quad_grid(2, 2, 1.0, 1.0);
    let mut buffers = upload(&mesh);
    let mut scheduler = SmoothingScheduler::new(&mut buffers);

    let first = scheduler.smooth(1).unwrap();
    assert_eq!(first.authoritative, BufferSlot::PositionsB);
    let second = scheduler.smooth(1).unwrap();
    assert_eq!(second.authoritative, BufferSlot::PositionsA);
    assert_eq!(second.dispatches, 1);
    assert_eq!(scheduler.state().iteration, 2);
    assert_eq!(scheduler.state().dispatches, 2);
    assert_eq!(second.positions, reference_smooth(&mesh, &NeighborAverage, 2));
}

#[test]
fn new_scheduler_resumes_stored_parity() {
    let mesh = uv_sphere(1.0, 4, 6);
    let mut buffers = upload(&mesh);
    SmoothingScheduler::new(&mut buffers).smooth(3).unwrap();
    assert_eq!(buffers.smoothing_state().parity, Parity::BSource);

    let outcome = SmoothingScheduler::new(&mut buffers).smooth(2).unwrap();
    assert_eq!(outcome.authoritative, BufferSlot::PositionsB);
    assert_eq!(buffers.smoothing_state().iteration, 5);
    assert_eq!(outcome.positions, reference_smooth(&mesh, &NeighborAverage, 5));
}

#[test]
fn smooth_with_reports_each_iteration() {
    let mesh = unit_tetrahedron();
    let mut buffers = upload(&mesh);
    let mut seen = Vec::new();
    SmoothingScheduler::new(&mut buffers)
        .smooth_with(3, |state| seen.push((state.iteration, state.last_written)))
        .unwrap();
    assert_eq!(
        seen,
        vec![
            (1, Some(BufferSlot::PositionsB)),
            (2, Some(BufferSlot::PositionsA)),
            (3, Some(BufferSlot::PositionsB)),
        ]
    );
}

#[test]
fn isolated_vertex_keeps_position() {
    let mut mesh = unit_tetrahedron();
    mesh.push_vertex(5.0, 6.0, 7.0);
    let mut buffers = upload(&mesh);
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(3).unwrap();
    assert_eq!(&outcome.positions[12..15], &[5.0, 6.0, 7.0]);
}

#[test]
fn topology_regions_survive_smoothing() {
    let mesh = uv_sphere(1.0, 5, 8);
    let mut buffers = upload(&mesh);
    SmoothingScheduler::new(&mut buffers).smooth(4).unwrap();
    assert_eq!(buffers.read_triangles().unwrap(), mesh.indices);
    assert_eq!(buffers.triangle_count(), mesh.triangle_count());
}

#[test]
fn custom_kernel_runs_through_the_scheduler() {
    let mesh = unit_tetrahedron();
    let adjacency = AdjacencyGraph::from_mesh(&mesh).unwrap();
    let backend = CpuFallback::with_kernel(Box::new(ShiftX));
    let mut buffers = DeviceBufferSet::from_mesh(Box::new(backend), &mesh, &adjacency).unwrap();
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(3).unwrap();
    assert_eq!(outcome.positions[0], 3.0);
    assert_eq!(outcome.positions[3], 4.0);
}

#[test]
fn empty_mesh_never_dispatches() {
    let mut buffers = upload(&TriangleMesh::default());
    let outcome = SmoothingScheduler::new(&mut buffers).smooth(5).unwrap();
    assert!(outcome.positions.is_empty());
    assert_eq!(outcome.dispatches, 0);
    assert_eq!(buffers.vertex_count(), 0);
}

// ─── Lifetime Tests ───────────────────────────────────────────

#[test]
fn release_is_idempotent() {
    let mesh = unit_tetrahedron();
    let mut buffers = upload(&mesh);
    assert!(!buffers.is_released());
    buffers.release();
    buffers.release();
    assert!(buffers.is_released());
    assert!(buffers.read_positions(BufferSlot::PositionsA).is_err());
    assert!(SmoothingScheduler::new(&mut buffers).smooth(1).is_err());
}

#[test]
fn read_positions_rejects_topology_slots() {
    let mut buffers = upload(&unit_tetrahedron());
    assert!(buffers.read_positions(BufferSlot::Offset).is_err());
}

#[test]
fn counts_after_upload() {
    let mesh = quad_grid(3, 3, 1.0, 1.0);
    let buffers = upload(&mesh);
    let adjacency = AdjacencyGraph::from_mesh(&mesh).unwrap();
    assert_eq!(buffers.vertex_count(), 16);
    assert_eq!(buffers.triangle_count(), 18);
    assert_eq!(buffers.neighbor_count(), adjacency.flat_neighbors().len());
    assert_eq!(buffers.backend_name(), "cpu_fallback");
    assert!(!buffers.is_gpu());
}

// ─── wgpu Tests ───────────────────────────────────────────────

#[cfg(feature = "wgpu")]
mod wgpu_backend {
    use super::*;
    use lapsmooth_gpu::WgpuBackend;

    fn gpu_upload(mesh: &TriangleMesh) -> Option<DeviceBufferSet> {
        let backend = match WgpuBackend::new() {
            Ok(backend) => backend,
            Err(e) => {
                eprintln!("skipping wgpu test: {e}");
                return None;
            }
        };
        let adjacency = AdjacencyGraph::from_mesh(mesh).unwrap();
        Some(DeviceBufferSet::from_mesh(Box::new(backend), mesh, &adjacency).unwrap())
    }

    #[test]
    fn gpu_matches_cpu_reference() {
        let mesh = uv_sphere(1.0, 8, 12);
        let Some(mut buffers) = gpu_upload(&mesh) else {
            return;
        };
        assert!(buffers.is_gpu());
        for iterations in [1u32, 2, 5] {
            let outcome = SmoothingScheduler::new(&mut buffers).smooth(iterations).unwrap();
            assert_eq!(outcome.dispatches, u64::from(iterations));
        }
        // Each scheduler resumed where the previous one stopped.
        let cpu = reference_smooth(&mesh, &NeighborAverage, 8);
        let outcome = SmoothingScheduler::new(&mut buffers).smooth(0).unwrap();
        assert_close(&outcome.positions, &cpu, 1e-4);
    }

    #[test]
    fn gpu_zero_iterations_bit_identical() {
        let mesh = unit_tetrahedron();
        let Some(mut buffers) = gpu_upload(&mesh) else {
            return;
        };
        let outcome = SmoothingScheduler::new(&mut buffers).smooth(0).unwrap();
        assert_eq!(outcome.positions, mesh.interleaved_positions());
        assert_eq!(buffers.dispatch_count(), 0);
    }

    #[test]
    fn gpu_tetrahedron_parity() {
        let mesh = unit_tetrahedron();
        let Some(mut buffers) = gpu_upload(&mesh) else {
            return;
        };
        let outcome = SmoothingScheduler::new(&mut buffers).smooth(3).unwrap();
        assert_eq!(outcome.authoritative, BufferSlot::PositionsB);
        assert_close(&outcome.positions, &reference_smooth(&mesh, &NeighborAverage, 3), 1e-5);
        assert_eq!(buffers.read_triangles().unwrap(), mesh.indices);
        buffers.release();
        assert!(buffers.is_released());
    }
}
