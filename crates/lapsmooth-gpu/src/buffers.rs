//! Device buffer slots, typed host buffers and the six-region upload layout.
//!
//! Every device region has a fixed binding so a smoothing kernel can find
//! it by convention:
//!
//! | slot | binding | contents | access |
//! |------|---------|----------|--------|
//! | neighbors | 0 | `u32[sum(valence)]` | read-only |
//! | valence | 1 | `u32[V]` | read-only |
//! | offset | 2 | `u32[V]` | read-only |
//! | positions A | 3 | `f32[3V]` | read-write |
//! | positions B | 4 | `f32[3V]` | read-write |
//! | triangles | 5 | `u32[3T]` | read-only |

use std::fmt;

use bytemuck::Pod;
use lapsmooth_mesh::{AdjacencyGraph, TriangleMesh};
use lapsmooth_types::constants::COMPONENTS_PER_VERTEX;
use lapsmooth_types::{SmoothError, SmoothResult};

/// Whether a region may be written after upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    /// Written once at upload, never again.
    ReadOnly,
    /// Rewritten by every dispatch that targets it.
    ReadWrite,
}

/// One of the six logical device regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    Neighbors,
    Valence,
    Offset,
    PositionsA,
    PositionsB,
    Triangles,
}

impl BufferSlot {
    /// All slots in binding order.
    pub const ALL: [BufferSlot; 6] = [
        Self::Neighbors,
        Self::Valence,
        Self::Offset,
        Self::PositionsA,
        Self::PositionsB,
        Self::Triangles,
    ];

    /// Binding index the kernel uses for this region.
    pub fn binding(self) -> u32 {
        match self {
            Self::Neighbors => 0,
            Self::Valence => 1,
            Self::Offset => 2,
            Self::PositionsA => 3,
            Self::PositionsB => 4,
            Self::Triangles => 5,
        }
    }

    pub fn from_binding(binding: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.binding() == binding)
    }

    pub fn access(self) -> BufferAccess {
        match self {
            Self::PositionsA | Self::PositionsB => BufferAccess::ReadWrite,
            _ => BufferAccess::ReadOnly,
        }
    }

    /// True for the two ping-pong position regions.
    pub fn is_position(self) -> bool {
        self.access() == BufferAccess::ReadWrite
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Neighbors => "neighbors",
            Self::Valence => "valence",
            Self::Offset => "offset",
            Self::PositionsA => "positions_a",
            Self::PositionsB => "positions_b",
            Self::Triangles => "triangles",
        }
    }
}

impl fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (binding {})", self.name(), self.binding())
    }
}

/// A typed host-side buffer.
///
/// The CPU reference backend keeps its regions in these; the wgpu backend
/// uses them only for byte views during upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeBuffer<T: Pod> {
    data: Vec<T>,
}

impl<T: Pod> ComputeBuffer<T> {
    /// Creates a zero-filled buffer.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![T::zeroed(); len],
        }
    }

    pub fn from_data(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Raw bytes, as they would be copied to the device.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }

    /// Overwrites the whole buffer. Lengths must match.
    pub fn copy_from_slice(&mut self, src: &[T]) -> SmoothResult<()> {
        if src.len() != self.data.len() {
            return Err(SmoothError::Device(format!(
                "Copy of {} elements into a buffer of {}",
                src.len(),
                self.data.len()
            )));
        }
        self.data.copy_from_slice(src);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Pod> Default for ComputeBuffer<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Host-side staging of the six device regions, checked for consistency.
///
/// Both position regions start from the same `positions`, so either one
/// is a valid source for the first dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferLayout {
    pub neighbors: Vec<u32>,
    pub valence: Vec<u32>,
    pub offset: Vec<u32>,
    pub positions: Vec<f32>,
    pub triangles: Vec<u32>,
}

impl BufferLayout {
    /// Stages interleaved positions, adjacency and triangles for upload.
    ///
    /// Fails with `InvalidMesh` when the pieces disagree: ragged position
    /// or triangle arrays, an adjacency built for a different vertex count,
    /// out-of-range indices, or offsets that are not the running sum of
    /// valences.
    pub fn build(
        positions: &[f32],
        adjacency: &AdjacencyGraph,
        triangles: &[u32],
    ) -> SmoothResult<Self> {
        if positions.len() % COMPONENTS_PER_VERTEX != 0 {
            return Err(SmoothError::InvalidMesh(format!(
                "Position array length {} is not a multiple of 3",
                positions.len()
            )));
        }
        let vertex_count = positions.len() / COMPONENTS_PER_VERTEX;
        if adjacency.vertex_count() != vertex_count {
            return Err(SmoothError::InvalidMesh(format!(
                "Adjacency covers {} vertices but {} positions were given",
                adjacency.vertex_count(),
                vertex_count
            )));
        }
        if triangles.len() % 3 != 0 {
            return Err(SmoothError::InvalidMesh(format!(
                "Triangle array length {} is not a multiple of 3",
                triangles.len()
            )));
        }
        if let Some(&bad) = triangles.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(SmoothError::InvalidMesh(format!(
                "Triangle references vertex {} but only {} vertices exist",
                bad, vertex_count
            )));
        }

        let layout = Self {
            neighbors: adjacency.flat_neighbors().to_vec(),
            valence: adjacency.valences().to_vec(),
            offset: adjacency.offsets().to_vec(),
            positions: positions.to_vec(),
            triangles: triangles.to_vec(),
        };
        layout.check_offsets()?;
        Ok(layout)
    }

    /// Stages a mesh together with its adjacency.
    pub fn from_mesh(mesh: &TriangleMesh, adjacency: &AdjacencyGraph) -> SmoothResult<Self> {
        Self::build(&mesh.interleaved_positions(), adjacency, &mesh.indices)
    }

    fn check_offsets(&self) -> SmoothResult<()> {
        let mut running = 0u64;
        for (v, (&offset, &valence)) in self.offset.iter().zip(&self.valence).enumerate() {
            if u64::from(offset) != running {
                return Err(SmoothError::InvalidMesh(format!(
                    "Offset of vertex {} is {}, expected {}",
                    v, offset, running
                )));
            }
            running += u64::from(valence);
        }
        if running != self.neighbors.len() as u64 {
            return Err(SmoothError::InvalidMesh(format!(
                "Valences sum to {} but {} neighbor entries exist",
                running,
                self.neighbors.len()
            )));
        }
        let vertex_count = self.vertex_count();
        if let Some(&bad) = self.neighbors.iter().find(|&&n| n as usize >= vertex_count) {
            return Err(SmoothError::InvalidMesh(format!(
                "Neighbor {} is out of range (vertex count: {})",
                bad, vertex_count
            )));
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.valence.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Byte contents of a region at upload time.
    pub fn region_bytes(&self, slot: BufferSlot) -> &[u8] {
        match slot {
            BufferSlot::Neighbors => bytemuck::cast_slice(&self.neighbors),
            BufferSlot::Valence => bytemuck::cast_slice(&self.valence),
            BufferSlot::Offset => bytemuck::cast_slice(&self.offset),
            BufferSlot::PositionsA | BufferSlot::PositionsB => {
                bytemuck::cast_slice(&self.positions)
            }
            BufferSlot::Triangles => bytemuck::cast_slice(&self.triangles),
        }
    }

    /// Element count of a region.
    pub fn region_len(&self, slot: BufferSlot) -> usize {
        match slot {
            BufferSlot::Neighbors => self.neighbors.len(),
            BufferSlot::Valence => self.valence.len(),
            BufferSlot::Offset => self.offset.len(),
            BufferSlot::PositionsA | BufferSlot::PositionsB => self.positions.len(),
            BufferSlot::Triangles => self.triangles.len(),
        }
    }
}
