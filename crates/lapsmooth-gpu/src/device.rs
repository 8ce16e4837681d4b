//! The device buffer set: six uploaded regions and the backend holding them.

use lapsmooth_mesh::{AdjacencyGraph, TriangleMesh};
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::backend::ComputeBackend;
use crate::buffers::{BufferLayout, BufferSlot};
use crate::scheduler::SmoothingState;

/// Exclusive owner of the uploaded regions.
///
/// Topology regions are never written after [`upload`](Self::upload);
/// only the scheduler's dispatches touch the position pair. Regions are
/// freed by [`release`](Self::release) or on drop, whichever comes first.
///
/// The set also carries the [`SmoothingState`], so a new scheduler over
/// the same buffers picks up the parity where the last one stopped.
pub struct DeviceBufferSet {
    backend: Box<dyn ComputeBackend>,
    state: SmoothingState,
    vertex_count: usize,
    triangle_count: usize,
    neighbor_count: usize,
}

impl DeviceBufferSet {
    /// Uploads a staged layout into `backend`.
    pub fn upload(mut backend: Box<dyn ComputeBackend>, layout: &BufferLayout) -> SmoothResult<Self> {
        backend.upload(layout)?;
        tracing::info!(
            backend = backend.name(),
            vertices = layout.vertex_count(),
            triangles = layout.triangle_count(),
            neighbors = layout.neighbor_count(),
            "uploaded device buffers"
        );
        Ok(Self {
            backend,
            state: SmoothingState::default(),
            vertex_count: layout.vertex_count(),
            triangle_count: layout.triangle_count(),
            neighbor_count: layout.neighbor_count(),
        })
    }

    /// Stages and uploads a mesh with its adjacency.
    pub fn from_mesh(
        backend: Box<dyn ComputeBackend>,
        mesh: &TriangleMesh,
        adjacency: &AdjacencyGraph,
    ) -> SmoothResult<Self> {
        let layout = BufferLayout::from_mesh(mesh, adjacency)?;
        Self::upload(backend, &layout)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Length of the flat neighbor region.
    pub fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_gpu(&self) -> bool {
        self.backend.is_gpu()
    }

    pub fn is_released(&self) -> bool {
        !self.backend.is_uploaded()
    }

    /// Dispatches the backend has completed so far.
    pub fn dispatch_count(&self) -> u64 {
        self.backend.dispatch_count()
    }

    pub fn smoothing_state(&self) -> &SmoothingState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut SmoothingState {
        &mut self.state
    }

    pub(crate) fn backend_mut(&mut self) -> SmoothResult<&mut dyn ComputeBackend> {
        if self.is_released() {
            return Err(SmoothError::Device("Device buffers were released".into()));
        }
        Ok(self.backend.as_mut())
    }

    /// Synchronized readback of a position region.
    pub fn read_positions(&mut self, slot: BufferSlot) -> SmoothResult<Vec<f32>> {
        if !slot.is_position() {
            return Err(SmoothError::Device(format!(
                "{slot} is not a position region"
            )));
        }
        self.backend_mut()?.read_positions(slot)
    }

    /// Synchronized readback of the triangle region.
    pub fn read_triangles(&mut self) -> SmoothResult<Vec<u32>> {
        self.backend_mut()?.read_triangles()
    }

    /// Frees every region. Safe to call more than once.
    pub fn release(&mut self) {
        if self.backend.is_uploaded() {
            self.backend.release();
            tracing::debug!(backend = self.backend.name(), "device buffers released");
        }
    }
}

impl Drop for DeviceBufferSet {
    fn drop(&mut self) {
        self.release();
    }
}
