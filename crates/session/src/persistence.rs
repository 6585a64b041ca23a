//! Persistence collaborator: opaque async save/load of notebook snapshots.
//!
//! The core only needs success or failure to drive notifications; the
//! document format on disk (or wire) belongs to the implementation.

use crate::cell::Cell;
use crate::metadata::NotebookMetadata;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

/// Point-in-time copy of everything a notebook document persists. Selection
/// state and notifications are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookSnapshot {
    pub notebook_id: String,
    pub metadata: NotebookMetadata,
    pub cells: Vec<Cell>,
}

#[async_trait]
pub trait NotebookStore: Send + Sync {
    async fn save(&self, snapshot: &NotebookSnapshot) -> anyhow::Result<()>;
    async fn load(&self, notebook_id: &str) -> anyhow::Result<NotebookSnapshot>;
}

/// Stores each notebook as pretty-printed JSON under `<root>/<id>.json`.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, notebook_id: &str) -> PathBuf {
        self.root.join(format!("{notebook_id}.json"))
    }
}

#[async_trait]
impl NotebookStore for JsonFileStore {
    async fn save(&self, snapshot: &NotebookSnapshot) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&snapshot.notebook_id);
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&path, format!("{json}\n")).await?;
        info!(
            "[persist] Saved notebook {} ({} cells) to {}",
            snapshot.notebook_id,
            snapshot.cells.len(),
            path.display()
        );
        Ok(())
    }

    async fn load(&self, notebook_id: &str) -> anyhow::Result<NotebookSnapshot> {
        let path = self.path_for(notebook_id);
        let contents = tokio::fs::read_to_string(&path).await?;
        let snapshot: NotebookSnapshot = serde_json::from_str(&contents)?;
        info!(
            "[persist] Loaded notebook {} ({} cells) from {}",
            notebook_id,
            snapshot.cells.len(),
            path.display()
        );
        Ok(snapshot)
    }
}

/// In-memory store, mainly for tests and demos.
#[derive(Default)]
pub struct InMemoryStore {
    docs: StdMutex<HashMap<String, NotebookSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookStore for InMemoryStore {
    async fn save(&self, snapshot: &NotebookSnapshot) -> anyhow::Result<()> {
        self.docs
            .lock()
            .unwrap()
            .insert(snapshot.notebook_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, notebook_id: &str) -> anyhow::Result<NotebookSnapshot> {
        self.docs
            .lock()
            .unwrap()
            .get(notebook_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("notebook not found: {notebook_id}"))
    }
}

// Path helper kept separate so callers can point the store at a per-user
// location without knowing the layout.
pub fn default_store_root(base: &Path) -> PathBuf {
    base.join("notebooks")
}
