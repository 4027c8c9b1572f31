//! Neuroview Core - tracing model, parsers and scene contents.
//!
//! This crate provides:
//!
//! - **Node records**: `NodeRecord`, `NodeCollection`, `StructureKind`
//! - **Parsers**: flat line files (`parse_swc`) and hierarchical JSON
//!   documents (`parse_json`), dispatched by `TracingFormat`
//! - **Scene contents**: `Scene` with neuron and compartment entity groups
//!
//! # Example
//!
//! ```ignore
//! use nv_core::{parse_tracing, TracingFormat};
//!
//! let text = std::fs::read_to_string("AA0001.swc")?;
//! let tracing = parse_tracing(&text, TracingFormat::from_file_name("AA0001.swc"));
//! println!("Parsed {} nodes", tracing.node_count());
//! ```

pub mod collection;
pub mod format;
pub mod json;
pub mod loader;
pub mod mesh;
pub mod node;
pub mod points;
pub mod scene;
pub mod swc;
pub mod tracing;

// Re-export commonly used types
pub use collection::NodeCollection;
pub use format::TracingFormat;
pub use json::{parse_json, try_parse_json, JsonTracing, StructureError};
pub use loader::{display_name, load_compartment_obj, load_tracing, LoadError, LoadResult};
pub use mesh::Mesh;
pub use node::{NodeRecord, StructureKind, ROOT_PARENT};
pub use points::PointCloud;
pub use scene::{DirectionalLight, Entity, EntityGroup, EntityId, Geometry, Scene};
pub use swc::parse_swc;
pub use tracing::{parse_tracing, CompartmentRole, ParsedTracing, TracingPart};
