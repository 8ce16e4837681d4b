//! Per-vertex 1-ring adjacency in compressed (CSR) form.
//!
//! Neighbor sets are collected per vertex from triangle edges, then
//! flattened into three arrays that can be copied straight into device
//! memory:
//!
//! ```text
//! flat_neighbors: [n(0)..., n(1)..., n(2)..., ...]
//! valence:        [|n(0)|, |n(1)|, |n(2)|, ...]
//! offset:         [0, |n(0)|, |n(0)|+|n(1)|, ...]
//! ```
//!
//! `offset[i] == sum(valence[..i])` and `sum(valence) == flat_neighbors.len()`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use lapsmooth_types::{SmoothError, SmoothResult};

use crate::mesh::TriangleMesh;

/// Typical interior valence of a triangle mesh; used to pre-size neighbor sets.
const EXPECTED_VALENCE: usize = 8;

/// Deduplicated, symmetric 1-ring neighborhoods of every vertex.
///
/// Built once at import and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    flat_neighbors: Vec<u32>,
    valence: Vec<u32>,
    offset: Vec<u32>,
}

impl AdjacencyGraph {
    /// Build adjacency from a flat triangle index list.
    ///
    /// Every triangle `(v0, v1, v2)` contributes its six directed edges.
    /// Insertion is idempotent, so shared edges are counted once. A repeated
    /// index inside one triangle does not make a vertex its own neighbor.
    pub fn build(vertex_count: usize, triangles: &[u32]) -> SmoothResult<Self> {
        if triangles.len() % 3 != 0 {
            return Err(SmoothError::InvalidMesh(
                "Index count is not divisible by 3".into(),
            ));
        }
        if let Some(&bad) = triangles.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(SmoothError::InvalidMesh(format!(
                "Triangle references vertex {} but only {} vertices exist",
                bad, vertex_count
            )));
        }

        let mut sets: Vec<HashSet<u32>> = (0..vertex_count)
            .map(|_| HashSet::with_capacity(EXPECTED_VALENCE))
            .collect();

        for tri in triangles.chunks_exact(3) {
            let (v0, v1, v2) = (tri[0], tri[1], tri[2]);
            for (a, b) in [(v0, v1), (v0, v2), (v1, v0), (v1, v2), (v2, v0), (v2, v1)] {
                if a != b {
                    sets[a as usize].insert(b);
                }
            }
        }

        // Set iteration order is unspecified; sort so uploads are reproducible.
        let lists: Vec<Vec<u32>> = sets
            .into_iter()
            .map(|set| {
                let mut list: Vec<u32> = set.into_iter().collect();
                list.sort_unstable();
                list
            })
            .collect();

        let graph = Self::from_neighbor_lists(&lists)?;
        tracing::debug!(
            vertices = graph.vertex_count(),
            neighbors = graph.flat_neighbors.len(),
            edges = graph.edge_count(),
            "adjacency built"
        );
        Ok(graph)
    }

    /// Build adjacency from a mesh's triangle list.
    pub fn from_mesh(mesh: &TriangleMesh) -> SmoothResult<Self> {
        Self::build(mesh.vertex_count(), &mesh.indices)
    }

    /// Flatten per-vertex neighbor lists into CSR form, preserving list order.
    pub fn from_neighbor_lists(lists: &[Vec<u32>]) -> SmoothResult<Self> {
        let total: usize = lists.iter().map(Vec::len).sum();
        if u32::try_from(total).is_err() {
            return Err(SmoothError::InvalidMesh(format!(
                "{} neighbor entries exceed the 32-bit offset range",
                total
            )));
        }

        if let Some(&bad) = lists.iter().flatten().find(|&&v| v as usize >= lists.len()) {
            return Err(SmoothError::InvalidMesh(format!(
                "Neighbor {} is out of range (vertex count: {})",
                bad,
                lists.len()
            )));
        }

        let mut flat_neighbors = Vec::with_capacity(total);
        let mut valence = Vec::with_capacity(lists.len());
        let mut offset = Vec::with_capacity(lists.len());

        let mut cursor = 0u32;
        for list in lists {
            // Both fit: `total` was checked above.
            let count = list.len() as u32;
            offset.push(cursor);
            valence.push(count);
            cursor += count;
            flat_neighbors.extend_from_slice(list);
        }

        Ok(Self {
            flat_neighbors,
            valence,
            offset,
        })
    }

    /// Number of vertices covered by the graph.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.valence.len()
    }

    /// Neighbors of vertex `v`: `flat[offset[v] .. offset[v] + valence[v]]`.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[u32] {
        let start = self.offset[v] as usize;
        let end = start + self.valence[v] as usize;
        &self.flat_neighbors[start..end]
    }

    /// Neighbor count of vertex `v`.
    #[inline]
    pub fn valence(&self, v: usize) -> u32 {
        self.valence[v]
    }

    /// Start of vertex `v`'s neighbors in the flat sequence.
    #[inline]
    pub fn offset(&self, v: usize) -> u32 {
        self.offset[v]
    }

    pub fn flat_neighbors(&self) -> &[u32] {
        &self.flat_neighbors
    }

    pub fn valences(&self) -> &[u32] {
        &self.valence
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offset
    }

    /// Number of unique undirected edges.
    pub fn edge_count(&self) -> usize {
        self.flat_neighbors.len() / 2
    }

    /// Largest neighbor count, or 0 for an empty graph.
    pub fn max_valence(&self) -> u32 {
        self.valence.iter().copied().max().unwrap_or(0)
    }

    /// Vertices that belong to no triangle.
    pub fn isolated_vertices(&self) -> Vec<u32> {
        self.valence
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(v, _)| v as u32)
            .collect()
    }

    /// True when every `j in neighbors(i)` has `i in neighbors(j)`.
    pub fn is_symmetric(&self) -> bool {
        (0..self.vertex_count()).all(|i| {
            self.neighbors(i)
                .iter()
                .all(|&j| self.neighbors(j as usize).contains(&(i as u32)))
        })
    }
}
