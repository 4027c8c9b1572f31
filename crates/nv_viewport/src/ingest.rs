//! Asynchronous tracing-file ingestion.
//!
//! [`IngestPipeline::ingest`] reads a file, parses it by extension and swaps
//! the scene's neurons for the result. The pipeline holds the scene manager
//! mutably for the whole call, so ingests are serialized and nothing else
//! can touch the scene while a read is pending.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nv_core::{display_name, parse_tracing, CompartmentRole, EntityId, TracingFormat};
use thiserror::Error;

use crate::config::IngestConfig;
use crate::manager::SceneManager;

/// Errors that can occur while ingesting a file.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out reading {name} after {timeout:?}")]
    ReadTimeout { name: String, timeout: Duration },

    #[error("{name} does not appear to be a valid tracing file")]
    EmptyTracing { name: String },
}

/// A file handed to the pipeline.
///
/// In-memory files compare by identity of their contents buffer, so handing
/// the same drop twice is a no-op while a fresh buffer with the same bytes
/// is reloaded.
#[derive(Clone, Debug)]
pub enum FileRef {
    Path(PathBuf),
    Memory { name: String, contents: Arc<str> },
}

impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FileRef::Path(a), FileRef::Path(b)) => a == b,
            (
                FileRef::Memory { name: a, contents: x },
                FileRef::Memory { name: b, contents: y },
            ) => a == b && Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl FileRef {
    pub fn path<P: AsRef<Path>>(path: P) -> Self {
        FileRef::Path(path.as_ref().to_path_buf())
    }

    pub fn memory(name: impl Into<String>, contents: impl Into<Arc<str>>) -> Self {
        FileRef::Memory {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Display name used for entities and messages.
    pub fn name(&self) -> String {
        match self {
            FileRef::Path(path) => display_name(path),
            FileRef::Memory { name, .. } => name.clone(),
        }
    }

    async fn read_text(&self) -> std::io::Result<String> {
        match self {
            FileRef::Path(path) => {
                let bytes = tokio::fs::read(path).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            FileRef::Memory { contents, .. } => Ok(contents.to_string()),
        }
    }
}

/// What a successful ingest did.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The file is the one already loaded
    Unchanged,
    /// No file was given; all neurons were removed
    Cleared,
    Loaded(IngestSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub file: FileRef,
    pub name: String,
    pub format: TracingFormat,
    pub label: Option<String>,
    pub node_count: usize,
    /// One entity per non-empty collection, in collection order
    pub entities: Vec<EntityId>,
}

/// Entity name for one collection of a tracing. Whole tracings use the
/// display name as-is; split tracings get a role suffix so both parts
/// survive the scene's replace-by-name rule.
pub fn part_entity_name(display: &str, role: CompartmentRole) -> String {
    match role {
        CompartmentRole::Whole => display.to_string(),
        CompartmentRole::Axon => format!("{} (axon)", display),
        CompartmentRole::Dendrite => format!("{} (dendrite)", display),
    }
}

/// Loads tracing files into a scene manager, remembering the current file.
#[derive(Debug, Default)]
pub struct IngestPipeline {
    config: IngestConfig,
    current: Option<FileRef>,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// The file most recently ingested successfully
    pub fn current(&self) -> Option<&FileRef> {
        self.current.as_ref()
    }

    /// Replace the scene's neurons with the contents of `file`.
    ///
    /// - The same file as last time is a no-op.
    /// - `None` removes all neurons and forgets the current file.
    /// - A file that yields no nodes is an error; the scene and the current
    ///   file are left as they were.
    pub async fn ingest(
        &mut self,
        manager: &mut SceneManager,
        file: Option<FileRef>,
    ) -> Result<IngestOutcome, IngestError> {
        if file == self.current {
            return Ok(IngestOutcome::Unchanged);
        }

        let Some(file) = file else {
            manager.remove_all_neurons();
            self.current = None;
            log::info!("Cleared neurons");
            return Ok(IngestOutcome::Cleared);
        };

        let name = file.name();
        let timeout = self.config.read_timeout();
        let text = match tokio::time::timeout(timeout, file.read_text()).await {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => return Err(IngestError::Io { name, source }),
            Err(_) => return Err(IngestError::ReadTimeout { name, timeout }),
        };

        let format = TracingFormat::from_file_name(&name);
        let tracing = parse_tracing(&text, format);
        if tracing.is_empty() {
            log::warn!("{} does not appear to be a valid tracing file", name);
            return Err(IngestError::EmptyTracing { name });
        }

        let node_count = tracing.node_count();
        manager.remove_all_neurons();
        let entities: Vec<EntityId> = tracing
            .non_empty_parts()
            .map(|part| {
                let color = if part.role.slot() == 0 {
                    self.config.primary_color
                } else {
                    self.config.secondary_color
                };
                manager.load_neuron(&part_entity_name(&name, part.role), color, &part.nodes)
            })
            .collect();

        log::info!(
            "Ingested {} ({} nodes, {:?})",
            name,
            node_count,
            format
        );
        self.current = Some(file.clone());

        Ok(IngestOutcome::Loaded(IngestSummary {
            file,
            name,
            format,
            label: tracing.label,
            node_count,
            entities,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use nv_math::Color;

    fn setup() -> (IngestPipeline, SceneManager) {
        let config = ViewerConfig::default();
        (
            IngestPipeline::new(config.ingest.clone()),
            SceneManager::new(config),
        )
    }

    const CELL: &str = "# cell\n1 1 0 0 0 5 -1\n2 3 1 2 3 1 1\n";

    const SPLIT: &str = r#"{"neurons": [{
        "idString": "AA0001",
        "axon": [{"sampleNumber": 1, "structureIdentifier": 2, "x": 1, "y": 2, "z": 3, "radius": 1, "parentNumber": -1}],
        "dendrite": [{"sampleNumber": 1, "structureIdentifier": 3, "x": 4, "y": 5, "z": 6, "radius": 1, "parentNumber": -1}]
    }]}"#;

    #[tokio::test]
    async fn test_ingest_flat_file() {
        let (mut pipeline, mut manager) = setup();
        let outcome = pipeline
            .ingest(&mut manager, Some(FileRef::memory("cell.swc", CELL)))
            .await
            .unwrap();

        let IngestOutcome::Loaded(summary) = outcome else {
            panic!("expected a load");
        };
        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.file.name(), "cell.swc");
        assert_eq!(summary.format, TracingFormat::Swc);
        assert_eq!(summary.entities.len(), 1);

        let entity = manager.scene().neurons.get("cell.swc").unwrap();
        assert_eq!(entity.color, Color::BLUE);
        assert_eq!(entity.geometry.vertex_count(), 2);
    }

    #[tokio::test]
    async fn test_ingest_split_json_colors_parts() {
        let (mut pipeline, mut manager) = setup();
        let outcome = pipeline
            .ingest(&mut manager, Some(FileRef::memory("AA0001.JSON", SPLIT)))
            .await
            .unwrap();

        let IngestOutcome::Loaded(summary) = outcome else {
            panic!("expected a load");
        };
        assert_eq!(summary.format, TracingFormat::Json);
        assert_eq!(summary.label.as_deref(), Some("AA0001"));
        assert_eq!(summary.entities.len(), 2);

        let neurons = &manager.scene().neurons;
        assert_eq!(neurons.len(), 2);
        assert_eq!(neurons.get("AA0001.JSON (axon)").unwrap().color, Color::BLUE);
        assert_eq!(
            neurons.get("AA0001.JSON (dendrite)").unwrap().color,
            Color::GREEN
        );
    }

    #[tokio::test]
    async fn test_empty_tracing_keeps_previous_scene() {
        let (mut pipeline, mut manager) = setup();
        let good = FileRef::memory("cell.swc", CELL);
        pipeline.ingest(&mut manager, Some(good.clone())).await.unwrap();

        let err = pipeline
            .ingest(
                &mut manager,
                Some(FileRef::memory("notes.swc", "# just\n# comments\n")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::EmptyTracing { .. }));
        assert_eq!(
            err.to_string(),
            "notes.swc does not appear to be a valid tracing file"
        );
        assert!(manager.scene().neurons.contains("cell.swc"));
        assert_eq!(pipeline.current(), Some(&good));
    }

    #[tokio::test]
    async fn test_same_file_is_noop() {
        let (mut pipeline, mut manager) = setup();
        let file = FileRef::memory("cell.swc", CELL);

        pipeline.ingest(&mut manager, Some(file.clone())).await.unwrap();
        let revision = manager.scene().revision();

        let outcome = pipeline.ingest(&mut manager, Some(file)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Unchanged);
        assert_eq!(manager.scene().revision(), revision);
    }

    #[tokio::test]
    async fn test_fresh_buffer_reloads() {
        let (mut pipeline, mut manager) = setup();
        pipeline
            .ingest(&mut manager, Some(FileRef::memory("cell.swc", CELL)))
            .await
            .unwrap();

        let outcome = pipeline
            .ingest(&mut manager, Some(FileRef::memory("cell.swc", CELL)))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Loaded(_)));
        assert_eq!(manager.scene().neurons.len(), 1);
    }

    #[tokio::test]
    async fn test_none_clears_and_forgets() {
        let (mut pipeline, mut manager) = setup();
        pipeline
            .ingest(&mut manager, Some(FileRef::memory("cell.swc", CELL)))
            .await
            .unwrap();

        let outcome = pipeline.ingest(&mut manager, None).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Cleared);
        assert!(manager.scene().neurons.is_empty());
        assert!(pipeline.current().is_none());

        // Nothing loaded and nothing requested
        assert_eq!(
            pipeline.ingest(&mut manager, None).await.unwrap(),
            IngestOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_new_file_replaces_neurons() {
        let (mut pipeline, mut manager) = setup();
        pipeline
            .ingest(&mut manager, Some(FileRef::memory("a.swc", CELL)))
            .await
            .unwrap();
        pipeline
            .ingest(&mut manager, Some(FileRef::memory("b.swc", CELL)))
            .await
            .unwrap();

        let names: Vec<&str> = manager.scene().neurons.names().collect();
        assert_eq!(names, vec!["b.swc"]);
    }

    #[tokio::test]
    async fn test_ingest_from_disk() {
        let dir = std::env::temp_dir().join(format!("nv_viewport_ingest_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("disk.swc");
        std::fs::write(&path, CELL).unwrap();

        let (mut pipeline, mut manager) = setup();
        let outcome = pipeline
            .ingest(&mut manager, Some(FileRef::path(&path)))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Loaded(_)));
        assert!(manager.scene().neurons.contains("disk.swc"));

        let missing = pipeline
            .ingest(&mut manager, Some(FileRef::path(dir.join("missing.swc"))))
            .await
            .unwrap_err();
        assert!(matches!(missing, IngestError::Io { .. }));
        assert!(manager.scene().neurons.contains("disk.swc"));
    }
}
