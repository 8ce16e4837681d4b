//! Compute backend trait and CPU reference backend.
//!
//! A [`ComputeBackend`] owns the six device regions after
//! [`upload`](ComputeBackend::upload) and runs one kernel dispatch at a
//! time. The [`CpuFallback`] implementation executes work-items
//! sequentially on the host and serves as the correctness reference for
//! the GPU path.

use lapsmooth_types::constants::COMPONENTS_PER_VERTEX;
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::buffers::{BufferAccess, BufferLayout, BufferSlot, ComputeBuffer};
use crate::kernel::{NeighborAverage, SmoothingKernel};

/// Trait for compute backends that hold the device regions.
///
/// # Implementations
/// - [`CpuFallback`]: Sequential host reference (always available)
/// - `WgpuBackend`: GPU compute via wgpu (feature `wgpu`)
pub trait ComputeBackend: Send {
    /// Returns the backend name (e.g., "cpu_fallback", "wgpu").
    fn name(&self) -> &str;

    /// Returns true if dispatches run on a GPU.
    fn is_gpu(&self) -> bool;

    /// Allocates and fills all six regions. Replaces any earlier upload.
    fn upload(&mut self, layout: &BufferLayout) -> SmoothResult<()>;

    /// Runs the kernel over `work_items` vertices, reading `source` and
    /// writing `destination`.
    ///
    /// Both slots must be position regions and must differ.
    fn dispatch(
        &mut self,
        source: BufferSlot,
        destination: BufferSlot,
        work_items: u32,
    ) -> SmoothResult<()>;

    /// Blocks until every write of the last dispatch is visible to the
    /// next dispatch and to host reads.
    fn barrier(&mut self) -> SmoothResult<()>;

    /// Copies a position region back to the host.
    fn read_positions(&mut self, slot: BufferSlot) -> SmoothResult<Vec<f32>>;

    /// Copies the triangle region back to the host.
    fn read_triangles(&mut self) -> SmoothResult<Vec<u32>>;

    /// Frees all regions. Calling it again is a no-op.
    fn release(&mut self);

    /// True between a successful upload and release.
    fn is_uploaded(&self) -> bool;

    /// Dispatches completed since construction.
    fn dispatch_count(&self) -> u64;
}

/// Checks the slot pair of a dispatch before it reaches a backend.
pub(crate) fn check_dispatch_slots(source: BufferSlot, destination: BufferSlot) -> SmoothResult<()> {
    if destination.access() != BufferAccess::ReadWrite {
        return Err(SmoothError::Device(format!(
            "{destination} is write-once and cannot be a dispatch destination"
        )));
    }
    if !source.is_position() {
        return Err(SmoothError::Device(format!(
            "{source} is not a position region"
        )));
    }
    if source == destination {
        return Err(SmoothError::Device(format!(
            "{source} cannot be both source and destination"
        )));
    }
    Ok(())
}

#[derive(Debug)]
struct HostRegions {
    neighbors: ComputeBuffer<u32>,
    valence: ComputeBuffer<u32>,
    offset: ComputeBuffer<u32>,
    positions_a: ComputeBuffer<f32>,
    positions_b: ComputeBuffer<f32>,
    triangles: ComputeBuffer<u32>,
}

impl HostRegions {
    fn vertex_count(&self) -> usize {
        self.valence.len()
    }

    fn positions(&self, slot: BufferSlot) -> SmoothResult<&ComputeBuffer<f32>> {
        match slot {
            BufferSlot::PositionsA => Ok(&self.positions_a),
            BufferSlot::PositionsB => Ok(&self.positions_b),
            other => Err(SmoothError::Device(format!(
                "{other} is not a position region"
            ))),
        }
    }
}

/// CPU reference backend: sequential execution on the host.
///
/// Always available, used for:
/// - Platforms without a GPU adapter
/// - Correctness validation (GPU results should match CPU)
/// - Small meshes where dispatch overhead dominates
///
/// A dispatch is "in flight" until [`barrier`](ComputeBackend::barrier)
/// is called; dispatching or reading before that is refused, mirroring
/// the ordering a real device requires.
pub struct CpuFallback {
    kernel: Box<dyn SmoothingKernel>,
    regions: Option<HostRegions>,
    in_flight: bool,
    dispatches: u64,
}

impl CpuFallback {
    /// Creates a CPU backend running [`NeighborAverage`].
    pub fn new() -> Self {
        Self::with_kernel(Box::new(NeighborAverage))
    }

    pub fn with_kernel(kernel: Box<dyn SmoothingKernel>) -> Self {
        Self {
            kernel,
            regions: None,
            in_flight: false,
            dispatches: 0,
        }
    }

    pub fn kernel_name(&self) -> &str {
        self.kernel.name()
    }

    fn regions(&self) -> SmoothResult<&HostRegions> {
        self.regions
            .as_ref()
            .ok_or_else(|| SmoothError::Device("No buffers uploaded".into()))
    }

    fn ensure_settled(&self, operation: &str) -> SmoothResult<()> {
        if self.in_flight {
            return Err(SmoothError::Device(format!(
                "{operation} issued before the previous dispatch was synchronized"
            )));
        }
        Ok(())
    }
}

impl Default for CpuFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuFallback {
    fn name(&self) -> &str {
        "cpu_fallback"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn upload(&mut self, layout: &BufferLayout) -> SmoothResult<()> {
        self.regions = Some(HostRegions {
            neighbors: ComputeBuffer::from_data(layout.neighbors.clone()),
            valence: ComputeBuffer::from_data(layout.valence.clone()),
            offset: ComputeBuffer::from_data(layout.offset.clone()),
            positions_a: ComputeBuffer::from_data(layout.positions.clone()),
            positions_b: ComputeBuffer::from_data(layout.positions.clone()),
            triangles: ComputeBuffer::from_data(layout.triangles.clone()),
        });
        self.in_flight = false;
        Ok(())
    }

    fn dispatch(
        &mut self,
        source: BufferSlot,
        destination: BufferSlot,
        work_items: u32,
    ) -> SmoothResult<()> {
        check_dispatch_slots(source, destination)?;
        self.ensure_settled("Dispatch")?;

        let kernel = &self.kernel;
        let regions = self
            .regions
            .as_mut()
            .ok_or_else(|| SmoothError::Device("No buffers uploaded".into()))?;

        let vertex_count = regions.vertex_count();
        let work_items = work_items as usize;
        if work_items > vertex_count {
            return Err(SmoothError::Device(format!(
                "{} work-items requested for {} vertices",
                work_items, vertex_count
            )));
        }

        let HostRegions {
            neighbors,
            valence,
            offset,
            positions_a,
            positions_b,
            ..
        } = regions;
        let (src, dst) = match source {
            BufferSlot::PositionsB => (positions_b.as_slice(), positions_a.as_mut_slice()),
            _ => (positions_a.as_slice(), positions_b.as_mut_slice()),
        };
        let (neighbors, valence, offset) =
            (neighbors.as_slice(), valence.as_slice(), offset.as_slice());

        for v in 0..work_items {
            let start = offset[v] as usize;
            let end = start + valence[v] as usize;
            let p = kernel.update_vertex(v, &neighbors[start..end], src);
            let base = v * COMPONENTS_PER_VERTEX;
            dst[base..base + COMPONENTS_PER_VERTEX].copy_from_slice(&p);
        }

        self.in_flight = true;
        self.dispatches += 1;
        Ok(())
    }

    fn barrier(&mut self) -> SmoothResult<()> {
        self.in_flight = false;
        Ok(())
    }

    fn read_positions(&mut self, slot: BufferSlot) -> SmoothResult<Vec<f32>> {
        self.ensure_settled("Read")?;
        Ok(self.regions()?.positions(slot)?.as_slice().to_vec())
    }

    fn read_triangles(&mut self) -> SmoothResult<Vec<u32>> {
        self.ensure_settled("Read")?;
        Ok(self.regions()?.triangles.as_slice().to_vec())
    }

    fn release(&mut self) {
        if self.regions.take().is_some() {
            tracing::debug!(backend = "cpu_fallback", "released buffers");
        }
        self.in_flight = false;
    }

    fn is_uploaded(&self) -> bool {
        self.regions.is_some()
    }

    fn dispatch_count(&self) -> u64 {
        self.dispatches
    }
}
