//! CLI command implementations.

use std::path::{Path, PathBuf};

use lapsmooth_io::contract::{BackendKind, PipelineConfig};
use lapsmooth_io::import_obj;
use lapsmooth_io::validator::validate_config;
use lapsmooth_mesh::AdjacencyGraph;
use lapsmooth_pipeline::{Pipeline, PipelineMetrics};
use lapsmooth_telemetry::{EventBus, EventKind, EventSink, PipelineEvent, TracingSink};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Arguments of `lapsmooth smooth`.
pub struct SmoothArgs {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub iterations: Option<u32>,
    pub backend: Option<BackendKind>,
    pub recenter: bool,
    pub metrics: Option<PathBuf>,
}

/// Prints one line per completed stage.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn handle(&mut self, event: &PipelineEvent) {
        match &event.kind {
            EventKind::MeshImported {
                vertices,
                triangles,
                faces,
                wall_time,
                ..
            } => println!(
                "  Import:     {vertices} verts, {faces} faces → {triangles} tris ({:.3}ms)",
                wall_time * 1000.0
            ),
            EventKind::AdjacencyBuilt {
                edges,
                max_valence,
                wall_time,
                ..
            } => println!(
                "  Adjacency:  {edges} edges, max valence {max_valence} ({:.3}ms)",
                wall_time * 1000.0
            ),
            EventKind::BuffersUploaded {
                backend, wall_time, ..
            } => println!("  Upload:     {backend} ({:.3}ms)", wall_time * 1000.0),
            EventKind::SmoothingFinished {
                dispatches,
                authoritative,
                wall_time,
                ..
            } => println!(
                "  Smoothing:  {dispatches} dispatches, result in {authoritative} ({:.3}ms)",
                wall_time * 1000.0
            ),
            EventKind::MeshExported {
                path, wall_time, ..
            } => println!("  Export:     {path} ({:.3}ms)", wall_time * 1000.0),
            EventKind::Diagnostic { message } => println!("  ⚠ {message}"),
            EventKind::IterationDispatched { .. } | EventKind::Custom { .. } => {}
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Smooth a mesh.
pub fn smooth(args: SmoothArgs) -> CliResult {
    println!("lapsmooth");
    println!("═════════");
    println!();

    let mut config = match &args.config {
        Some(path) => {
            println!("Config: {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if args.recenter {
        config.import.recenter = true;
    }
    validate_config(&config)?;

    println!(
        "Smoothing {} → {} ({} iterations, {} backend)",
        config.input.display(),
        config.output.display(),
        config.iterations,
        config.backend
    );
    println!();

    let bus = EventBus::new()
        .with_sink(Box::new(ConsoleSink))
        .with_sink(Box::new(TracingSink::default()));
    let report = Pipeline::new(config).with_bus(bus).run_configured()?;

    let m = &report.metrics;
    println!();
    println!("  Wall time:  {:.3}s", m.total_wall_time);
    println!("  Per pass:   {:.3}ms", m.avg_iteration_time() * 1000.0);
    if !report.diagnostics.is_empty() {
        println!("  Diagnostics: {}", report.diagnostics.len());
    }

    if let Some(path) = &args.metrics {
        write_metrics(path, m)?;
        println!();
        println!("Metrics written to: {}", path.display());
    }

    Ok(())
}

fn write_metrics(path: &Path, metrics: &PipelineMetrics) -> CliResult {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let text = if is_csv {
        PipelineMetrics::to_csv(std::slice::from_ref(metrics))
    } else {
        metrics.to_json()?
    };
    std::fs::write(path, text)?;
    Ok(())
}

/// Inspect an OBJ mesh.
pub fn inspect(path: &Path) -> CliResult {
    println!("lapsmooth Mesh Inspector");
    println!("────────────────────────");
    println!();

    let report = import_obj(path, &Default::default())?;
    let mesh = &report.mesh;
    let adjacency = AdjacencyGraph::from_mesh(mesh)?;

    println!("File:          {}", path.display());
    println!("Vertices:      {}", mesh.vertex_count());
    println!("Faces:         {}", report.face_count);
    println!("Triangles:     {}", mesh.triangle_count());
    println!("Edges:         {}", adjacency.edge_count());
    println!("Neighbors:     {}", adjacency.flat_neighbors().len());

    let valences = adjacency.valences();
    if !valences.is_empty() {
        let min = valences.iter().copied().min().unwrap_or(0);
        let mean = valences.iter().map(|&v| f64::from(v)).sum::<f64>() / valences.len() as f64;
        println!(
            "Valence:       min {min}, max {}, mean {mean:.2}",
            adjacency.max_valence()
        );
    }
    println!("Isolated:      {}", adjacency.isolated_vertices().len());
    println!("Degenerate:    {}", mesh.degenerate_triangle_count());
    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounds:        [{:.4}, {:.4}, {:.4}] – [{:.4}, {:.4}, {:.4}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if !report.diagnostics.is_empty() {
        println!();
        println!("Diagnostics ({}):", report.diagnostics.len());
        for d in &report.diagnostics {
            println!("  {d}");
        }
    }

    Ok(())
}

/// Validate a mesh or config.
pub fn validate(path: &Path) -> CliResult {
    println!("lapsmooth Validator");
    println!("───────────────────");
    println!();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("toml") => {
            println!("Validating config: {}", path.display());
            let config = PipelineConfig::load(path)?;
            match validate_config(&config) {
                Ok(()) => println!("✅ Config is valid."),
                Err(e) => {
                    println!("❌ Config validation failed: {e}");
                    return Err(e.into());
                }
            }
        }
        Some("obj") => {
            println!("Validating mesh: {}", path.display());
            let report = import_obj(path, &Default::default())?;
            let mesh = &report.mesh;
            mesh.validate()?;
            let adjacency = AdjacencyGraph::from_mesh(mesh)?;
            if !adjacency.is_symmetric() {
                return Err("adjacency is not symmetric".into());
            }
            if report.is_clean() {
                println!(
                    "✅ Mesh is valid ({} verts, {} tris).",
                    mesh.vertex_count(),
                    mesh.triangle_count()
                );
            } else {
                println!(
                    "⚠ Mesh loaded with {} diagnostics ({} verts, {} tris):",
                    report.diagnostics.len(),
                    mesh.vertex_count(),
                    mesh.triangle_count()
                );
                for d in &report.diagnostics {
                    println!("  {d}");
                }
            }
        }
        _ => {
            println!("Unsupported file format. Use .toml (config) or .obj (mesh).");
        }
    }

    Ok(())
}
