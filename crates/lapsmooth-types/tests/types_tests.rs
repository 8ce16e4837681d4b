//! Integration tests for lapsmooth-types.

use lapsmooth_types::constants::{DEFAULT_ITERATIONS, WORKGROUP_SIZE};
use lapsmooth_types::{SmoothError, VertexId};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn vertex_id_index() {
    let id = VertexId(42);
    assert_eq!(id.index(), 42);
}

#[test]
fn one_based_conversion() {
    assert_eq!(VertexId::from_one_based(1), Some(VertexId(0)));
    assert_eq!(VertexId::from_one_based(10), Some(VertexId(9)));
    assert_eq!(VertexId(9).one_based(), 10);
}

#[test]
fn zero_is_missing_sentinel() {
    assert_eq!(VertexId::from_one_based(0), None);
}

#[test]
fn one_based_does_not_overflow() {
    assert_eq!(VertexId(u32::MAX).one_based(), u32::MAX as u64 + 1);
}

#[test]
fn ids_are_serializable() {
    let id = VertexId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: VertexId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn error_display() {
    let err = SmoothError::InvalidMesh("index 12 out of range".into());
    assert!(err.to_string().contains("index 12"));
}

#[test]
fn file_access_display_names_path() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err = SmoothError::file_access("meshes/in.obj", io);
    let msg = err.to_string();
    assert!(msg.contains("meshes/in.obj"));
    assert!(msg.contains("missing"));
}

#[test]
fn io_error_converts() {
    fn fails() -> lapsmooth_types::SmoothResult<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(matches!(err, SmoothError::Io(_)));
}

#[test]
fn device_errors_are_flagged() {
    assert!(SmoothError::Device("lost".into()).is_device());
    assert!(!SmoothError::InvalidConfig("x".into()).is_device());
}

// ─── Constant Tests ───────────────────────────────────────────

#[test]
fn defaults_match_single_pass() {
    assert_eq!(DEFAULT_ITERATIONS, 1);
    assert!(WORKGROUP_SIZE.is_power_of_two());
}
