//! Pipeline metrics: counts and timings collected during a run.

use serde::{Deserialize, Serialize};
use lapsmooth_types::{SmoothError, SmoothResult};

/// Metrics collected from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Source mesh path.
    pub input: String,
    /// Written mesh path.
    pub output: String,
    /// Backend name (e.g., "cpu_fallback", "wgpu").
    pub backend: String,
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Polygons in the source, before triangulation.
    pub face_count: usize,
    /// Length of the flat neighbor array.
    pub neighbor_count: usize,
    pub edge_count: usize,
    pub max_valence: u32,
    pub isolated_vertices: usize,
    /// Import diagnostics raised.
    pub diagnostics: usize,
    /// Iterations requested.
    pub iterations: u32,
    /// Kernel dispatches actually issued.
    pub dispatches: u64,
    /// Position region the result was read from.
    pub authoritative: String,
    /// Wall-clock time per stage (seconds).
    pub import_time: f64,
    pub adjacency_time: f64,
    pub upload_time: f64,
    pub smoothing_time: f64,
    pub export_time: f64,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
}

impl PipelineMetrics {
    /// Average smoothing time per dispatch (seconds), 0 without dispatches.
    pub fn avg_iteration_time(&self) -> f64 {
        if self.dispatches == 0 {
            0.0
        } else {
            self.smoothing_time / self.dispatches as f64
        }
    }

    /// CSV header matching [`to_csv_row`](Self::to_csv_row).
    pub fn to_csv_header() -> String {
        "input,output,backend,vertex_count,triangle_count,face_count,neighbor_count,edge_count,max_valence,isolated_vertices,diagnostics,iterations,dispatches,authoritative,import_ms,adjacency_ms,upload_ms,smoothing_ms,export_ms,avg_iteration_ms,total_wall_time_s".to_string()
    }

    /// Format this metrics instance as a CSV data row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.6}",
            self.input,
            self.output,
            self.backend,
            self.vertex_count,
            self.triangle_count,
            self.face_count,
            self.neighbor_count,
            self.edge_count,
            self.max_valence,
            self.isolated_vertices,
            self.diagnostics,
            self.iterations,
            self.dispatches,
            self.authoritative,
            self.import_time * 1000.0,
            self.adjacency_time * 1000.0,
            self.upload_time * 1000.0,
            self.smoothing_time * 1000.0,
            self.export_time * 1000.0,
            self.avg_iteration_time() * 1000.0,
            self.total_wall_time,
        )
    }

    /// Format multiple metrics as a complete CSV string.
    pub fn to_csv(metrics: &[PipelineMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }

    pub fn to_json(&self) -> SmoothResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SmoothError::Serialization(e.to_string()))
    }
}
