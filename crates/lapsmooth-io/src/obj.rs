//! Wavefront OBJ import and export.
//!
//! Import reads `v`, `vt`, `vn` and `f` statements, converts 1-based (or
//! negative, relative) references to 0-based indices and splits every
//! polygon into a triangle fan anchored at its first corner. Fans are only
//! correct for convex, planar polygons; concave faces are triangulated the
//! same way and may overlap.
//!
//! Bad geometry never aborts an import. Each problem becomes an
//! [`ImportDiagnostic`] on the returned [`ImportReport`] and a
//! `tracing::warn!` line. Only failing to open or read the source is fatal.
//!
//! Export writes positions and triangles back out as `v` and `f` lines
//! with 1-based indices. Floats use Rust's shortest round-trip formatting,
//! so re-importing reproduces the exported bits.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use lapsmooth_mesh::normals::{compute_tangents, compute_vertex_normals};
use lapsmooth_mesh::TriangleMesh;
use lapsmooth_types::constants::COMPONENTS_PER_VERTEX;
use lapsmooth_types::{SmoothError, SmoothResult, VertexId};

use crate::contract::ImportOptions;

/// Which per-corner attribute a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    TexCoord,
    Normal,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TexCoord => f.write_str("texcoord"),
            Self::Normal => f.write_str("normal"),
        }
    }
}

/// A non-fatal problem found while importing.
///
/// `line` is 1-based, matching what an editor shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDiagnostic {
    /// A face corner had no usable position index (empty, `0`, or garbage).
    MissingIndex { line: usize, token: String },
    /// A `vt`/`vn` reference differs from the corner's position index.
    IndexMismatch {
        line: usize,
        attribute: Attribute,
        position: u32,
        found: u32,
    },
    /// A `v` line with fewer than three readable coordinates.
    MalformedVertex { line: usize, text: String },
    /// A face left with fewer than three corners; dropped.
    DegenerateFace { line: usize, corners: usize },
    /// A face referencing a vertex that never appears; its triangles are dropped.
    IndexOutOfRange {
        line: usize,
        index: u32,
        vertex_count: usize,
    },
    /// `vt`/`vn` data that cannot be matched one-to-one with positions.
    AttributeCountMismatch {
        attribute: Attribute,
        found: usize,
        vertex_count: usize,
    },
    /// Tangents were requested but could not be generated.
    TangentsUnavailable { reason: String },
    /// Triangles with a zero UV determinant, left out of tangent generation.
    DegenerateUvTriangles { count: usize },
    /// A statement containing bytes that are not UTF-8; they were replaced
    /// with U+FFFD before parsing.
    InvalidText { line: usize },
}

impl fmt::Display for ImportDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIndex { line, token } => {
                write!(f, "line {line}: missing point index in '{token}'")
            }
            Self::IndexMismatch {
                line,
                attribute,
                position,
                found,
            } => write!(
                f,
                "line {line}: {attribute} index {} differs from position index {}",
                *found as u64 + 1,
                *position as u64 + 1
            ),
            Self::MalformedVertex { line, text } => {
                write!(f, "line {line}: malformed vertex '{text}'")
            }
            Self::DegenerateFace { line, corners } => {
                write!(f, "line {line}: face with {corners} usable corners dropped")
            }
            Self::IndexOutOfRange {
                line,
                index,
                vertex_count,
            } => write!(
                f,
                "line {line}: vertex {} does not exist ({vertex_count} vertices)",
                *index as u64 + 1
            ),
            Self::AttributeCountMismatch {
                attribute,
                found,
                vertex_count,
            } => write!(
                f,
                "{found} {attribute} entries do not match {vertex_count} vertices; ignored"
            ),
            Self::TangentsUnavailable { reason } => write!(f, "tangents not generated: {reason}"),
            Self::DegenerateUvTriangles { count } => {
                write!(f, "{count} triangles with degenerate UVs skipped for tangents")
            }
            Self::InvalidText { line } => {
                write!(f, "line {line}: invalid UTF-8 replaced")
            }
        }
    }
}

/// Result of an import: the mesh plus everything that went wrong along the way.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub mesh: TriangleMesh,
    pub diagnostics: Vec<ImportDiagnostic>,
    /// Number of polygons read (before triangulation, after dropping bad faces).
    pub face_count: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Splits a polygon into a fan anchored at its first corner:
/// `(v0, v1, v2), (v0, v2, v3), ..., (v0, v[k-1], v[k])`.
///
/// Returns an empty list for fewer than three corners.
pub fn triangulate_fan(corners: &[u32]) -> Vec<[u32; 3]> {
    if corners.len() < 3 {
        return Vec::new();
    }
    let v0 = corners[0];
    corners[1..]
        .windows(2)
        .map(|pair| [v0, pair[0], pair[1]])
        .collect()
}

/// Loads a mesh from an OBJ file.
///
/// Failing to open or read the file is fatal; everything else is a diagnostic.
pub fn import_obj(path: impl AsRef<Path>, options: &ImportOptions) -> SmoothResult<ImportReport> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SmoothError::file_access(path, e))?;
    let report = parse_obj(BufReader::new(file), options)?;

    tracing::info!(
        path = %path.display(),
        vertices = report.mesh.vertex_count(),
        triangles = report.mesh.triangle_count(),
        diagnostics = report.diagnostics.len(),
        "loaded mesh"
    );
    Ok(report)
}

/// Resolves an OBJ reference against the number of elements read so far.
///
/// Positive values are 1-based, negative values count back from the end.
/// `0` and unparsable text yield `None`.
fn resolve_index(text: &str, count_so_far: usize) -> Option<u32> {
    let value: i64 = text.parse().ok()?;
    let resolved = match value {
        v if v > 0 => return VertexId::from_one_based(u32::try_from(v).ok()?).map(|id| id.0),
        0 => return None,
        v => count_so_far as i64 + v,
    };
    u32::try_from(resolved).ok()
}

struct PendingTriangle {
    corners: [u32; 3],
    line: usize,
}

#[derive(Default)]
struct Parser {
    mesh: TriangleMesh,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    triangles: Vec<PendingTriangle>,
    face_count: usize,
    diagnostics: Vec<ImportDiagnostic>,
}

impl Parser {
    fn report(&mut self, diagnostic: ImportDiagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn parse_line(&mut self, line_no: usize, line: &str) {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return;
        };

        match keyword {
            "v" => {
                let coords: Vec<f32> = parts
                    .by_ref()
                    .take(COMPONENTS_PER_VERTEX)
                    .map_while(|s| s.parse().ok())
                    .collect();
                if coords.len() < COMPONENTS_PER_VERTEX {
                    self.report(ImportDiagnostic::MalformedVertex {
                        line: line_no,
                        text: line.to_string(),
                    });
                }
                // Always push so later indices keep pointing at the right vertex.
                let get = |i: usize| coords.get(i).copied().unwrap_or(0.0);
                self.mesh.push_vertex(get(0), get(1), get(2));
            }
            "vt" => {
                let mut uv = parts.map(|s| s.parse::<f32>().unwrap_or(0.0));
                let u = uv.next().unwrap_or(0.0);
                let v = uv.next().unwrap_or(0.0);
                self.tex_coords.push([u, v]);
            }
            "vn" => {
                let mut n = parts.map(|s| s.parse::<f32>().unwrap_or(0.0));
                let x = n.next().unwrap_or(0.0);
                let y = n.next().unwrap_or(0.0);
                let z = n.next().unwrap_or(0.0);
                self.normals.push([x, y, z]);
            }
            "f" => self.parse_face(line_no, parts),
            // Groups, objects, smoothing groups and materials carry no geometry.
            _ => {}
        }
    }

    fn parse_face<'a>(&mut self, line_no: usize, tokens: impl Iterator<Item = &'a str>) {
        let mut corners: Vec<u32> = Vec::new();

        for token in tokens {
            let mut fields = token.split('/');
            let position = fields
                .next()
                .and_then(|s| resolve_index(s, self.mesh.vertex_count()));
            let Some(position) = position else {
                self.report(ImportDiagnostic::MissingIndex {
                    line: line_no,
                    token: token.to_string(),
                });
                continue;
            };

            let texcoord = fields.next().filter(|s| !s.is_empty());
            let normal = fields.next().filter(|s| !s.is_empty());
            for (attribute, text, count) in [
                (Attribute::TexCoord, texcoord, self.tex_coords.len()),
                (Attribute::Normal, normal, self.normals.len()),
            ] {
                let Some(found) = text.and_then(|s| resolve_index(s, count)) else {
                    continue;
                };
                if found != position {
                    self.report(ImportDiagnostic::IndexMismatch {
                        line: line_no,
                        attribute,
                        position,
                        found,
                    });
                }
            }

            corners.push(position);
        }

        if corners.len() < 3 {
            self.report(ImportDiagnostic::DegenerateFace {
                line: line_no,
                corners: corners.len(),
            });
            return;
        }

        self.face_count += 1;
        self.triangles.extend(
            triangulate_fan(&corners)
                .into_iter()
                .map(|corners| PendingTriangle { corners, line: line_no }),
        );
    }

    fn finish(mut self, options: &ImportOptions) -> ImportReport {
        let vertex_count = self.mesh.vertex_count();

        // OBJ allows forward references, so range checks wait until every
        // vertex has been read.
        let triangles = std::mem::take(&mut self.triangles);
        self.mesh.indices.reserve(triangles.len() * 3);
        for tri in triangles {
            if let Some(&bad) = tri.corners.iter().find(|&&v| v as usize >= vertex_count) {
                self.report(ImportDiagnostic::IndexOutOfRange {
                    line: tri.line,
                    index: bad,
                    vertex_count,
                });
                continue;
            }
            self.mesh.indices.extend_from_slice(&tri.corners);
        }

        if options.load_tex_coords {
            if self.tex_coords.len() == vertex_count {
                self.mesh.uv_u = self.tex_coords.iter().map(|t| t[0]).collect();
                self.mesh.uv_v = self.tex_coords.iter().map(|t| t[1]).collect();
            } else {
                let found = self.tex_coords.len();
                self.report(ImportDiagnostic::AttributeCountMismatch {
                    attribute: Attribute::TexCoord,
                    found,
                    vertex_count,
                });
            }
        }

        if self.normals.len() == vertex_count && vertex_count > 0 {
            for (i, n) in self.normals.iter().enumerate() {
                self.mesh.normal_x[i] = n[0];
                self.mesh.normal_y[i] = n[1];
                self.mesh.normal_z[i] = n[2];
            }
        } else {
            if !self.normals.is_empty() {
                let found = self.normals.len();
                self.report(ImportDiagnostic::AttributeCountMismatch {
                    attribute: Attribute::Normal,
                    found,
                    vertex_count,
                });
            }
            compute_vertex_normals(&mut self.mesh);
        }

        if options.recenter {
            let shift = self.mesh.recenter();
            tracing::debug!(x = shift.x, y = shift.y, z = shift.z, "recentered mesh");
        }

        if options.generate_tangents {
            match compute_tangents(&mut self.mesh) {
                Ok(0) => {}
                Ok(count) => self.report(ImportDiagnostic::DegenerateUvTriangles { count }),
                Err(e) => self.report(ImportDiagnostic::TangentsUnavailable {
                    reason: e.to_string(),
                }),
            }
        }

        ImportReport {
            mesh: self.mesh,
            diagnostics: self.diagnostics,
            face_count: self.face_count,
        }
    }
}

/// Parses OBJ text from any buffered reader.
///
/// Lines are decoded lossily: stray non-UTF-8 bytes (Latin-1 names in
/// comments, `o` or `usemtl` lines) never fail the import. Only a read error
/// from the underlying source does.
pub fn parse_obj<R: BufRead>(mut reader: R, options: &ImportOptions) -> SmoothResult<ImportReport> {
    let mut parser = Parser::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(text, Cow::Owned(_)) {
            parser.report(ImportDiagnostic::InvalidText { line: line_no });
        }
        parser.parse_line(line_no, line);
    }

    Ok(parser.finish(options))
}

/// Writes positions and triangles as OBJ text.
///
/// `positions` is interleaved `[x0, y0, z0, ...]`; `triangles` holds 0-based
/// indices, written 1-based.
pub fn write_obj<W: Write>(writer: &mut W, positions: &[f32], triangles: &[u32]) -> SmoothResult<()> {
    check_export_input(positions, triangles)?;

    for p in positions.chunks_exact(COMPONENTS_PER_VERTEX) {
        writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
    }
    for t in triangles.chunks_exact(3) {
        writeln!(
            writer,
            "f {} {} {}",
            VertexId(t[0]).one_based(),
            VertexId(t[1]).one_based(),
            VertexId(t[2]).one_based()
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes positions and triangles to an OBJ file.
///
/// Input is checked before the file is created, so a rejected export
/// leaves nothing behind.
pub fn export_obj(path: impl AsRef<Path>, positions: &[f32], triangles: &[u32]) -> SmoothResult<()> {
    let path = path.as_ref();
    check_export_input(positions, triangles)?;

    let file = File::create(path).map_err(|e| SmoothError::file_access(path, e))?;
    let mut w = BufWriter::new(file);
    write_obj(&mut w, positions, triangles)?;

    tracing::info!(
        path = %path.display(),
        vertices = positions.len() / COMPONENTS_PER_VERTEX,
        triangles = triangles.len() / 3,
        "wrote mesh"
    );
    Ok(())
}

/// Writes a mesh's current positions and triangles to an OBJ file.
pub fn export_mesh(path: impl AsRef<Path>, mesh: &TriangleMesh) -> SmoothResult<()> {
    export_obj(path, &mesh.interleaved_positions(), &mesh.indices)
}

fn check_export_input(positions: &[f32], triangles: &[u32]) -> SmoothResult<()> {
    if positions.len() % COMPONENTS_PER_VERTEX != 0 {
        return Err(SmoothError::InvalidMesh(format!(
            "Position buffer length {} is not a multiple of 3",
            positions.len()
        )));
    }
    if triangles.len() % 3 != 0 {
        return Err(SmoothError::InvalidMesh(format!(
            "Triangle buffer length {} is not a multiple of 3",
            triangles.len()
        )));
    }
    let vertex_count = positions.len() / COMPONENTS_PER_VERTEX;
    if let Some(&bad) = triangles.iter().find(|&&v| v as usize >= vertex_count) {
        return Err(SmoothError::InvalidMesh(format!(
            "Triangle references vertex {} but only {} vertices exist",
            bad, vertex_count
        )));
    }
    Ok(())
}
