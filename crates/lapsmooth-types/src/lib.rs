//! # lapsmooth-types
//!
//! Shared error types, identifiers and constants for the lapsmooth
//! mesh smoothing pipeline.
//!
//! This crate has no domain logic. It defines the vocabulary
//! that the other lapsmooth crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{SmoothError, SmoothResult};
pub use ids::VertexId;
