//! Strongly-typed vertex identifier.
//!
//! Converts between 0-based storage indices and 1-based OBJ references.

use serde::{Deserialize, Serialize};

/// Index into the vertex arrays. Identity is import order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Returns the raw index as `usize` for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Converts a 1-based OBJ reference into a vertex id.
    ///
    /// Returns `None` for the `0` sentinel, which OBJ never uses.
    #[inline]
    pub fn from_one_based(value: u32) -> Option<Self> {
        value.checked_sub(1).map(Self)
    }

    /// Returns the 1-based OBJ reference for this vertex.
    #[inline]
    pub fn one_based(self) -> u64 {
        self.0 as u64 + 1
    }
}

impl From<u32> for VertexId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}
