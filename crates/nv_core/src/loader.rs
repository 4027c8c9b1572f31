//! Synchronous file loading for tracings and compartment meshes.
//!
//! Interactive ingestion goes through the viewport's async pipeline; these
//! helpers serve tools, examples, and startup loading.

use std::path::Path;

use nv_math::Vec3;
use thiserror::Error;

use crate::format::TracingFormat;
use crate::mesh::Mesh;
use crate::tracing::{parse_tracing, ParsedTracing};

/// Errors that can occur while loading files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} does not appear to be a valid tracing file")]
    Empty { name: String },

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("No geometry found in {0}")]
    NoGeometry(String),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Load and parse a tracing file, selecting the format from its extension.
///
/// A file that parses to zero nodes is an error.
pub fn load_tracing<P: AsRef<Path>>(path: P) -> LoadResult<ParsedTracing> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let tracing = parse_tracing(&text, TracingFormat::from_path(path));

    if tracing.is_empty() {
        return Err(LoadError::Empty {
            name: display_name(path),
        });
    }

    log::info!(
        "Loaded {} nodes in {} parts from {}",
        tracing.node_count(),
        tracing.parts.len(),
        path.display()
    );
    Ok(tracing)
}

/// Load a Wavefront OBJ compartment mesh. All models in the file are merged
/// into one mesh with smooth normals.
pub fn load_compartment_obj<P: AsRef<Path>>(path: P) -> LoadResult<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )?;

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for model in &models {
        let base = positions.len() as u32;
        positions.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        indices.extend(model.mesh.indices.iter().map(|i| base + i));
    }

    if positions.is_empty() {
        return Err(LoadError::NoGeometry(display_name(path)));
    }

    let mut mesh = Mesh::new(positions, indices, None);
    mesh.ensure_normals();

    log::info!(
        "Loaded compartment {} ({} vertices, {} triangles)",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// File name (or the whole path if it has none) for messages and entity names.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::CompartmentRole;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("nv_core_loader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_swc_file() {
        let path = temp_file("cell.swc", "# test\n1 1 0 0 0 1 -1\n2 2 1 0 0 1 1\n");
        let tracing = load_tracing(&path).unwrap();

        assert_eq!(tracing.format, TracingFormat::Swc);
        assert_eq!(tracing.node_count(), 2);
        assert_eq!(tracing.parts[0].role, CompartmentRole::Whole);
    }

    #[test]
    fn test_load_empty_tracing_fails() {
        let path = temp_file("comments.swc", "# only\n# comments\n");
        let err = load_tracing(&path).unwrap_err();

        assert!(matches!(err, LoadError::Empty { .. }));
        assert_eq!(
            err.to_string(),
            "comments.swc does not appear to be a valid tracing file"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_tracing("/definitely/not/here.swc").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_load_compartment_obj() {
        let path = temp_file(
            "region.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n",
        );
        let mesh = load_compartment_obj(&path).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.has_normals());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/data/AA0001.json")), "AA0001.json");
    }
}
