//! GPU compute backend on wgpu.
//!
//! The six regions live in storage buffers bound at their fixed slots.
//! Two bind groups are built at upload, one per parity: with A as source
//! the kernel sees A at binding 3 and B at binding 4, and the other group
//! swaps them. Every dispatch is its own queue submission, and the
//! barrier waits for that submission to retire.

use std::sync::mpsc;

use wgpu::util::DeviceExt;

use lapsmooth_types::constants::WORKGROUP_SIZE;
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::backend::{check_dispatch_slots, ComputeBackend};
use crate::buffers::{BufferAccess, BufferLayout, BufferSlot};
use crate::kernel::{NeighborAverage, SmoothingKernel};

/// Empty regions are padded to this many bytes; zero-sized bindings are invalid.
const MIN_BUFFER_BYTES: usize = 4;

struct DeviceRegions {
    /// Indexed by binding.
    buffers: Vec<wgpu::Buffer>,
    /// `[A source, B source]`.
    bind_groups: [wgpu::BindGroup; 2],
    vertex_count: u32,
    position_len: usize,
    triangle_len: usize,
}

/// Compute backend running the kernel's WGSL shader on a GPU adapter.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    kernel_name: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    regions: Option<DeviceRegions>,
    in_flight: bool,
    dispatches: u64,
}

impl WgpuBackend {
    /// Opens the default adapter and compiles [`NeighborAverage`].
    pub fn new() -> SmoothResult<Self> {
        Self::with_kernel(&NeighborAverage)
    }

    /// Opens the default adapter and compiles `kernel`'s shader.
    pub fn with_kernel(kernel: &dyn SmoothingKernel) -> SmoothResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SmoothError::Device("No compatible GPU adapter found".into()))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("lapsmooth device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| SmoothError::Device(format!("Failed to create device: {e}")))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name()),
            source: wgpu::ShaderSource::Wgsl(kernel.wgsl_source().into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = BufferSlot::ALL
            .into_iter()
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot.binding(),
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        // Binding 3 is always the read side of the pair.
                        read_only: slot != BufferSlot::PositionsB,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lapsmooth bind group layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lapsmooth pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("lapsmooth smoothing pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SmoothError::Device(format!(
                "Kernel '{}' failed to compile: {error}",
                kernel.name()
            )));
        }

        tracing::info!(adapter = %adapter_name, kernel = kernel.name(), "wgpu backend ready");

        Ok(Self {
            device,
            queue,
            adapter_name,
            kernel_name: kernel.name().to_string(),
            pipeline,
            bind_group_layout,
            regions: None,
            in_flight: false,
            dispatches: 0,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    fn create_region(&self, slot: BufferSlot, bytes: &[u8]) -> SmoothResult<wgpu::Buffer> {
        let limit = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if bytes.len() as u64 > limit {
            return Err(SmoothError::Device(format!(
                "{slot} needs {} bytes, above the device limit of {limit}",
                bytes.len()
            )));
        }

        let padding = [0u8; MIN_BUFFER_BYTES];
        let contents = if bytes.is_empty() { &padding[..] } else { bytes };
        let usage = match slot.access() {
            BufferAccess::ReadWrite => {
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST
            }
            BufferAccess::ReadOnly => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        };

        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(slot.name()),
                contents,
                usage,
            }))
    }

    fn create_bind_group(&self, buffers: &[wgpu::Buffer], source: BufferSlot) -> wgpu::BindGroup {
        let (read, write) = if source == BufferSlot::PositionsA {
            (BufferSlot::PositionsA, BufferSlot::PositionsB)
        } else {
            (BufferSlot::PositionsB, BufferSlot::PositionsA)
        };
        let bound = |slot: BufferSlot| buffers[slot.binding() as usize].as_entire_binding();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(source.name()),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: BufferSlot::Neighbors.binding(),
                    resource: bound(BufferSlot::Neighbors),
                },
                wgpu::BindGroupEntry {
                    binding: BufferSlot::Valence.binding(),
                    resource: bound(BufferSlot::Valence),
                },
                wgpu::BindGroupEntry {
                    binding: BufferSlot::Offset.binding(),
                    resource: bound(BufferSlot::Offset),
                },
                wgpu::BindGroupEntry {
                    binding: BufferSlot::PositionsA.binding(),
                    resource: bound(read),
                },
                wgpu::BindGroupEntry {
                    binding: BufferSlot::PositionsB.binding(),
                    resource: bound(write),
                },
                wgpu::BindGroupEntry {
                    binding: BufferSlot::Triangles.binding(),
                    resource: bound(BufferSlot::Triangles),
                },
            ],
        })
    }

    fn regions(&self) -> SmoothResult<&DeviceRegions> {
        self.regions
            .as_ref()
            .ok_or_else(|| SmoothError::Device("No buffers uploaded".into()))
    }

    /// Copies `len` 4-byte elements of a region through a staging buffer.
    fn read_region<T: bytemuck::Pod>(&self, slot: BufferSlot, len: usize) -> SmoothResult<Vec<T>> {
        if self.in_flight {
            return Err(SmoothError::Device(
                "Read issued before the previous dispatch was synchronized".into(),
            ));
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let regions = self.regions()?;
        let size = (len * std::mem::size_of::<T>()) as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lapsmooth staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lapsmooth readback"),
            });
        encoder.copy_buffer_to_buffer(&regions.buffers[slot.binding() as usize], 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only disappears if this function already returned.
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| SmoothError::Device(format!("Readback of {slot} was dropped: {e}")))?
            .map_err(|e| SmoothError::Device(format!("Failed to map {slot}: {e}")))?;

        let data = slice.get_mapped_range();
        let values: Vec<T> = bytemuck::cast_slice(&data[..]).to_vec();
        drop(data);
        staging.unmap();
        Ok(values)
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn upload(&mut self, layout: &BufferLayout) -> SmoothResult<()> {
        self.release();

        let vertex_count = u32::try_from(layout.vertex_count()).map_err(|_| {
            SmoothError::Device(format!(
                "{} vertices exceed the device index range",
                layout.vertex_count()
            ))
        })?;

        let buffers = BufferSlot::ALL
            .into_iter()
            .map(|slot| self.create_region(slot, layout.region_bytes(slot)))
            .collect::<SmoothResult<Vec<_>>>()?;
        let bind_groups = [
            self.create_bind_group(&buffers, BufferSlot::PositionsA),
            self.create_bind_group(&buffers, BufferSlot::PositionsB),
        ];

        self.regions = Some(DeviceRegions {
            buffers,
            bind_groups,
            vertex_count,
            position_len: layout.region_len(BufferSlot::PositionsA),
            triangle_len: layout.region_len(BufferSlot::Triangles),
        });
        self.in_flight = false;

        tracing::debug!(
            adapter = %self.adapter_name,
            vertices = layout.vertex_count(),
            "uploaded storage buffers"
        );
        Ok(())
    }

    fn dispatch(
        &mut self,
        source: BufferSlot,
        destination: BufferSlot,
        work_items: u32,
    ) -> SmoothResult<()> {
        check_dispatch_slots(source, destination)?;
        if self.in_flight {
            return Err(SmoothError::Device(
                "Dispatch issued before the previous dispatch was synchronized".into(),
            ));
        }

        let regions = self.regions()?;
        if work_items > regions.vertex_count {
            return Err(SmoothError::Device(format!(
                "{} work-items requested for {} vertices",
                work_items, regions.vertex_count
            )));
        }
        let workgroups = work_items.div_ceil(WORKGROUP_SIZE);
        let max_groups = self.device.limits().max_compute_workgroups_per_dimension;
        if workgroups > max_groups {
            return Err(SmoothError::Device(format!(
                "{workgroups} workgroups exceed the device limit of {max_groups}"
            )));
        }
        let bind_group = match source {
            BufferSlot::PositionsA => &regions.bind_groups[0],
            _ => &regions.bind_groups[1],
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lapsmooth iteration"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("lapsmooth smoothing pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            if workgroups > 0 {
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SmoothError::Device(format!(
                "Dispatch {source} -> {destination} failed: {error}"
            )));
        }

        self.in_flight = true;
        self.dispatches += 1;
        Ok(())
    }

    fn barrier(&mut self) -> SmoothResult<()> {
        self.device.poll(wgpu::Maintain::Wait);
        self.in_flight = false;
        Ok(())
    }

    fn read_positions(&mut self, slot: BufferSlot) -> SmoothResult<Vec<f32>> {
        if !slot.is_position() {
            return Err(SmoothError::Device(format!(
                "{slot} is not a position region"
            )));
        }
        let len = self.regions()?.position_len;
        self.read_region(slot, len)
    }

    fn read_triangles(&mut self) -> SmoothResult<Vec<u32>> {
        let len = self.regions()?.triangle_len;
        self.read_region(BufferSlot::Triangles, len)
    }

    fn release(&mut self) {
        if let Some(regions) = self.regions.take() {
            for buffer in &regions.buffers {
                buffer.destroy();
            }
            tracing::debug!(adapter = %self.adapter_name, "released storage buffers");
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
