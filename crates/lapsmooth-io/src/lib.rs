//! # lapsmooth-io
//!
//! Text mesh import/export and the pipeline configuration contract.
//!
//! - [`obj`]: OBJ importer (fan triangulation, diagnostics) and exporter
//! - [`contract`]: [`PipelineConfig`](contract::PipelineConfig) and importer options
//! - [`validator`]: configuration checks run before the pipeline starts

pub mod contract;
pub mod obj;
pub mod validator;

pub use contract::{BackendKind, ImportOptions, PipelineConfig};
pub use obj::{export_obj, import_obj, parse_obj, write_obj, ImportDiagnostic, ImportReport};
