//! Persistence contract and the filesystem-backed adapter.
//!
//! The editing engine only talks to persistence through
//! [`PersistenceClient`]; a server-backed client and the bundled
//! [`FsPersistence`] adapter are interchangeable behind it.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::EditorStore;
use crate::GraphDoc;

pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("diagram '{0}' not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Partial metadata update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A diagram as returned by the persistence collaborator. `graph_data`
/// is an opaque JSON string parsed leniently by [`GraphDoc::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDiagram {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub graph_data: String,
}

#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Persist the serialized `{nodes, edges, viewport}` payload.
    async fn save_graph(&self, diagram_id: &str, graph_json: &str) -> Result<()>;

    /// Patch title/description without touching graph content.
    async fn update_metadata(&self, diagram_id: &str, patch: &MetadataPatch) -> Result<()>;

    async fn load_diagram(&self, diagram_id: &str) -> Result<StoredDiagram>;
}

/// Fetch a diagram and populate the store wholesale. Malformed graph
/// payloads load as an empty graph rather than erroring into the UI.
pub async fn load_into_store(
    store: &Arc<Mutex<EditorStore>>,
    client: &dyn PersistenceClient,
    diagram_id: &str,
) -> Result<()> {
    let stored = client.load_diagram(diagram_id).await?;
    let doc = GraphDoc::from_json(&stored.graph_data);
    store.lock().unwrap().load_diagram(
        diagram_id,
        stored.title,
        stored.description,
        doc.nodes,
        doc.edges,
        doc.viewport,
    );
    Ok(())
}

// --- Filesystem adapter ---

const DIAGRAM_EXT: &str = ".draft.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramFile {
    title: String,
    #[serde(default)]
    description: String,
    graph_data: String,
}

/// Stores each diagram as a pretty-printed JSON file under a data
/// directory (`~/.stackdraft/` by default).
#[derive(Debug, Clone)]
pub struct FsPersistence {
    dir: PathBuf,
}

impl FsPersistence {
    /// Resolve the default data directory (~/.stackdraft/).
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stackdraft")
    }

    pub fn new() -> Self {
        FsPersistence {
            dir: Self::data_dir(),
        }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        FsPersistence { dir: dir.into() }
    }

    fn path_for(&self, diagram_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", diagram_id, DIAGRAM_EXT))
    }

    /// List all diagram ids, sorted.
    pub fn list_diagrams(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(DIAGRAM_EXT).map(|n| n.to_string())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn delete_diagram(&self, diagram_id: &str) -> Result<()> {
        let path = self.path_for(diagram_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn read_file(&self, diagram_id: &str) -> Result<DiagramFile> {
        let path = self.path_for(diagram_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(diagram_id.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Atomic write (temp file + rename) so concurrent readers and file
    /// watchers never observe a half-written diagram.
    fn write_file(&self, diagram_id: &str, file: &DiagramFile) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(file)?;
        let tmp = self.dir.join(format!(".{}{}.tmp", diagram_id, DIAGRAM_EXT));
        let path = self.path_for(diagram_id);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Default for FsPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceClient for FsPersistence {
    async fn save_graph(&self, diagram_id: &str, graph_json: &str) -> Result<()> {
        let mut file = match self.read_file(diagram_id) {
            Ok(f) => f,
            Err(PersistenceError::NotFound(_)) => DiagramFile {
                title: String::new(),
                description: String::new(),
                graph_data: String::new(),
            },
            Err(e) => return Err(e),
        };
        file.graph_data = graph_json.to_string();
        self.write_file(diagram_id, &file)
    }

    async fn update_metadata(&self, diagram_id: &str, patch: &MetadataPatch) -> Result<()> {
        let mut file = self.read_file(diagram_id)?;
        if let Some(title) = &patch.title {
            file.title = title.clone();
        }
        if let Some(description) = &patch.description {
            file.description = description.clone();
        }
        self.write_file(diagram_id, &file)
    }

    async fn load_diagram(&self, diagram_id: &str) -> Result<StoredDiagram> {
        let file = self.read_file(diagram_id)?;
        Ok(StoredDiagram {
            title: file.title,
            description: file.description,
            graph_data: file.graph_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, NodeData, Position, Viewport};

    fn sample_doc() -> GraphDoc {
        GraphDoc {
            nodes: vec![Node {
                id: "node-1".to_string(),
                type_id: "worker".to_string(),
                position: Position { x: 1.0, y: 2.0 },
                data: NodeData {
                    label: "API".to_string(),
                    ..Default::default()
                },
                selected: false,
            }],
            edges: vec![],
            viewport: Viewport::default(),
        }
    }

    #[tokio::test]
    async fn fs_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FsPersistence::with_dir(tmp.path());

        let json = sample_doc().to_json().unwrap();
        fs.save_graph("alpha", &json).await.unwrap();
        fs.update_metadata(
            "alpha",
            &MetadataPatch {
                title: Some("Alpha".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();

        let stored = fs.load_diagram("alpha").await.unwrap();
        assert_eq!(stored.title, "Alpha");
        let doc = GraphDoc::from_json(&stored.graph_data);
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].data.label, "API");

        assert_eq!(fs.list_diagrams().unwrap(), vec!["alpha".to_string()]);
        fs.delete_diagram("alpha").unwrap();
        assert!(fs.list_diagrams().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_diagram_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FsPersistence::with_dir(tmp.path());
        let err = fs.load_diagram("ghost").await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn load_into_store_fails_closed_on_bad_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FsPersistence::with_dir(tmp.path());
        fs.save_graph("broken", "{{{ not json").await.unwrap();

        let store = EditorStore::shared();
        load_into_store(&store, &fs, "broken").await.unwrap();
        let s = store.lock().unwrap();
        assert!(s.nodes().is_empty());
        assert!(s.edges().is_empty());
        assert!(!s.is_dirty());
    }
}
