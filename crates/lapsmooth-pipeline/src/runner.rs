//! Pipeline runner: executes the five stages in order and collects metrics.
//!
//! ```text
//! import ─▶ adjacency ─▶ upload ─▶ smoothing ─▶ export
//! ```
//!
//! Each stage completes before the next begins. After upload the device
//! regions are authoritative and the host copy of the mesh is dropped.

use std::time::Instant;

use lapsmooth_gpu::{BufferSlot, ComputeBackend, CpuFallback, DeviceBufferSet, Parity, SmoothingScheduler};
use lapsmooth_io::contract::{BackendKind, PipelineConfig};
use lapsmooth_io::validator::validate_config;
use lapsmooth_io::{export_obj, import_obj, ImportDiagnostic};
use lapsmooth_mesh::AdjacencyGraph;
use lapsmooth_telemetry::{EventBus, EventKind, PipelineEvent, Stage};
use lapsmooth_types::SmoothResult;

use crate::metrics::PipelineMetrics;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub metrics: PipelineMetrics,
    /// Non-fatal import problems, in source order.
    pub diagnostics: Vec<ImportDiagnostic>,
    /// Smoothed interleaved positions, as written.
    pub positions: Vec<f32>,
    /// Triangle indices read back from the device, as written.
    pub triangles: Vec<u32>,
    pub final_parity: Parity,
    pub authoritative: BufferSlot,
}

/// Creates the compute backend a config asks for.
///
/// `Wgpu` fails with `InvalidConfig` when built without the `wgpu`
/// feature, and with `Device` when no adapter is available.
pub fn create_backend(kind: BackendKind) -> SmoothResult<Box<dyn ComputeBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(CpuFallback::new())),
        #[cfg(feature = "wgpu")]
        BackendKind::Wgpu => Ok(Box::new(lapsmooth_gpu::WgpuBackend::new()?)),
        #[cfg(not(feature = "wgpu"))]
        BackendKind::Wgpu => Err(lapsmooth_types::SmoothError::InvalidConfig(
            "backend 'wgpu' requested but this build has no wgpu support".into(),
        )),
    }
}

/// Runs a configured smoothing job.
pub struct Pipeline {
    config: PipelineConfig,
    bus: Option<EventBus>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, bus: None }
    }

    /// Attaches an event bus; every stage and iteration is reported to it.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detaches the event bus.
    pub fn take_bus(&mut self) -> Option<EventBus> {
        self.bus.take()
    }

    fn emit(&mut self, stage: Stage, kind: EventKind) {
        if let Some(bus) = self.bus.as_mut() {
            bus.emit(PipelineEvent::at(stage, kind));
            bus.flush();
        }
    }

    /// Runs with the backend named in the config.
    pub fn run_configured(&mut self) -> SmoothResult<PipelineReport> {
        let backend = create_backend(self.config.backend)?;
        self.run(backend)
    }

    /// Runs all five stages on `backend`.
    ///
    /// The config is validated first, so a bad config touches no file.
    pub fn run(&mut self, backend: Box<dyn ComputeBackend>) -> SmoothResult<PipelineReport> {
        validate_config(&self.config)?;
        let config = self.config.clone();
        let total_start = Instant::now();
        let mut metrics = PipelineMetrics {
            input: config.input.display().to_string(),
            output: config.output.display().to_string(),
            backend: backend.name().to_string(),
            iterations: config.iterations,
            ..Default::default()
        };

        tracing::info!(
            input = %config.input.display(),
            output = %config.output.display(),
            iterations = config.iterations,
            backend = backend.name(),
            "starting pipeline"
        );

        // Import
        let start = Instant::now();
        let import = import_obj(&config.input, &config.import)?;
        metrics.import_time = start.elapsed().as_secs_f64();
        let mesh = import.mesh;
        let diagnostics = import.diagnostics;
        metrics.vertex_count = mesh.vertex_count();
        metrics.triangle_count = mesh.triangle_count();
        metrics.face_count = import.face_count;
        metrics.diagnostics = diagnostics.len();
        for diagnostic in &diagnostics {
            self.emit(
                Stage::Import,
                EventKind::Diagnostic {
                    message: diagnostic.to_string(),
                },
            );
        }
        self.emit(
            Stage::Import,
            EventKind::MeshImported {
                vertices: metrics.vertex_count,
                triangles: metrics.triangle_count,
                faces: metrics.face_count,
                diagnostics: metrics.diagnostics,
                wall_time: metrics.import_time,
            },
        );

        // Adjacency
        let start = Instant::now();
        let adjacency = AdjacencyGraph::from_mesh(&mesh)?;
        metrics.adjacency_time = start.elapsed().as_secs_f64();
        metrics.neighbor_count = adjacency.flat_neighbors().len();
        metrics.edge_count = adjacency.edge_count();
        metrics.max_valence = adjacency.max_valence();
        metrics.isolated_vertices = adjacency.isolated_vertices().len();
        self.emit(
            Stage::Adjacency,
            EventKind::AdjacencyBuilt {
                neighbors: metrics.neighbor_count,
                edges: metrics.edge_count,
                max_valence: metrics.max_valence,
                isolated: metrics.isolated_vertices,
                wall_time: metrics.adjacency_time,
            },
        );

        // Upload
        let start = Instant::now();
        let mut buffers = DeviceBufferSet::from_mesh(backend, &mesh, &adjacency)?;
        drop(adjacency);
        drop(mesh);
        metrics.upload_time = start.elapsed().as_secs_f64();
        self.emit(
            Stage::Upload,
            EventKind::BuffersUploaded {
                backend: metrics.backend.clone(),
                vertices: buffers.vertex_count(),
                triangles: buffers.triangle_count(),
                neighbors: buffers.neighbor_count(),
                wall_time: metrics.upload_time,
            },
        );

        // Smoothing
        let start = Instant::now();
        let bus = &mut self.bus;
        let outcome = SmoothingScheduler::new(&mut buffers).smooth_with(config.iterations, |state| {
            if let Some(bus) = bus.as_mut() {
                bus.emit(PipelineEvent::at(
                    Stage::Smoothing,
                    EventKind::IterationDispatched {
                        iteration: state.iteration,
                        destination: state.authoritative().name().to_string(),
                    },
                ));
            }
        })?;
        metrics.smoothing_time = start.elapsed().as_secs_f64();
        metrics.dispatches = outcome.dispatches;
        metrics.authoritative = outcome.authoritative.name().to_string();
        self.emit(
            Stage::Smoothing,
            EventKind::SmoothingFinished {
                iterations: config.iterations,
                dispatches: outcome.dispatches,
                authoritative: metrics.authoritative.clone(),
                wall_time: metrics.smoothing_time,
            },
        );

        // Export
        let start = Instant::now();
        let triangles = buffers.read_triangles()?;
        buffers.release();
        export_obj(&config.output, &outcome.positions, &triangles)?;
        metrics.export_time = start.elapsed().as_secs_f64();
        self.emit(
            Stage::Export,
            EventKind::MeshExported {
                path: metrics.output.clone(),
                vertices: outcome.positions.len() / 3,
                triangles: triangles.len() / 3,
                wall_time: metrics.export_time,
            },
        );

        metrics.total_wall_time = total_start.elapsed().as_secs_f64();
        if let Some(bus) = self.bus.as_mut() {
            bus.finish();
        }

        tracing::info!(
            dispatches = metrics.dispatches,
            authoritative = %metrics.authoritative,
            seconds = metrics.total_wall_time,
            "pipeline finished"
        );

        Ok(PipelineReport {
            metrics,
            diagnostics,
            positions: outcome.positions,
            triangles,
            final_parity: outcome.final_parity,
            authoritative: outcome.authoritative,
        })
    }
}
