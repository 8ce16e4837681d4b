//! Pipeline event types.
//!
//! Structured events emitted as the pipeline moves through its stages.
//! Events are lightweight value types that carry just enough data to be
//! useful for monitoring and debugging.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Import,
    Adjacency,
    Upload,
    Smoothing,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::Import,
        Self::Adjacency,
        Self::Upload,
        Self::Smoothing,
        Self::Export,
    ];

    /// Position in the pipeline (0-indexed).
    pub fn index(self) -> u32 {
        match self {
            Self::Import => 0,
            Self::Adjacency => 1,
            Self::Upload => 2,
            Self::Smoothing => 3,
            Self::Export => 4,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.index() == index)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Adjacency => "adjacency",
            Self::Upload => "upload",
            Self::Smoothing => "smoothing",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event emitted by the pipeline.
///
/// Events are tagged with the index of the stage that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Stage index (0-indexed, see [`Stage::index`]).
    pub stage_index: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Source mesh parsed.
    MeshImported {
        vertices: usize,
        triangles: usize,
        /// Polygons read before triangulation.
        faces: usize,
        diagnostics: usize,
        /// Wall-clock time of the stage (seconds).
        wall_time: f64,
    },

    /// Neighbor topology built.
    AdjacencyBuilt {
        /// Length of the flat neighbor array.
        neighbors: usize,
        edges: usize,
        max_valence: u32,
        isolated: usize,
        wall_time: f64,
    },

    /// Six device regions allocated and filled.
    BuffersUploaded {
        backend: String,
        vertices: usize,
        triangles: usize,
        neighbors: usize,
        wall_time: f64,
    },

    /// One smoothing pass completed, barrier included.
    IterationDispatched {
        /// Iteration number (1-indexed).
        iteration: u32,
        /// Region written by this pass.
        destination: String,
    },

    /// All smoothing passes completed and the result read back.
    SmoothingFinished {
        iterations: u32,
        dispatches: u64,
        /// Region the result was read from.
        authoritative: String,
        wall_time: f64,
    },

    /// Result written to disk.
    MeshExported {
        path: String,
        vertices: usize,
        triangles: usize,
        wall_time: f64,
    },

    /// Non-fatal problem (e.g. an import diagnostic).
    Diagnostic { message: String },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl PipelineEvent {
    /// Creates a new event with an explicit stage index.
    pub fn new(stage_index: u32, kind: EventKind) -> Self {
        Self { stage_index, kind }
    }

    /// Creates a new event for the given stage.
    pub fn at(stage: Stage, kind: EventKind) -> Self {
        Self::new(stage.index(), kind)
    }

    pub fn stage(&self) -> Option<Stage> {
        Stage::from_index(self.stage_index)
    }
}
