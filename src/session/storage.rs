//! Permission stores
//!
//! The store is the persistence collaborator: it supplies the graph on load
//! and accepts or rejects a diff on save. `FileGraphStore` keeps the graph in
//! a directory on disk, `InMemoryStore` is for embedding and tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::permissions::PermissionGraph;

use super::diff::DiffSummary;

/// Default directory for graph storage
const PERMISSIONS_DIR: &str = "permissions";

/// Persistence collaborator for a permission graph
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Load the current graph
    async fn load(&self) -> Result<PermissionGraph>;

    /// Persist a diff; an error means the save was rejected
    ///
    /// The error's message is shown to the user verbatim.
    async fn save(&self, diff: &DiffSummary) -> Result<()>;

    /// Accepted saves, oldest first; stores without a log return nothing
    async fn history(&self) -> Result<Vec<RevisionRecord>> {
        Ok(Vec::new())
    }

    /// Store name for logging
    fn name(&self) -> &str;
}

/// One accepted save, appended to the revision log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
    pub diff: DiffSummary,
}

/// Graph stored as `graph.json` with a `revisions.jsonl` log beside it
#[derive(Debug)]
pub struct FileGraphStore {
    base_dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileGraphStore {
    /// Create a store with the default directory
    pub fn new() -> Self {
        Self::with_dir(PERMISSIONS_DIR)
    }

    /// Create a store with a custom directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn graph_path(&self) -> PathBuf {
        self.base_dir.join("graph.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir.join("revisions.jsonl")
    }

    /// Read the graph file
    pub fn read_graph(&self) -> Result<PermissionGraph> {
        let path = self.graph_path();
        let file = File::open(&path)
            .with_context(|| format!("No permission graph at {}", path.display()))?;
        let graph = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Malformed permission graph in {}", path.display()))?;
        Ok(graph)
    }

    /// Replace the graph file
    ///
    /// Writes to a temporary file first so a crash never leaves a
    /// half-written graph behind.
    pub fn write_graph(&self, graph: &PermissionGraph) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.graph_path();
        let tmp = path.with_extension("json.tmp");

        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, graph)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Every accepted save, oldest first
    pub fn load_history(&self) -> Result<Vec<RevisionRecord>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    fn append_record(&self, record: &RevisionRecord) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }
}

impl Default for FileGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for FileGraphStore {
    async fn load(&self) -> Result<PermissionGraph> {
        self.read_graph()
    }

    async fn save(&self, diff: &DiffSummary) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut graph = self.read_graph()?;
        graph.apply(diff);
        self.write_graph(&graph)?;
        self.append_record(&RevisionRecord {
            revision: graph.revision,
            saved_at: Utc::now(),
            diff: diff.clone(),
        })?;

        tracing::info!(
            store = %self.base_dir.display(),
            revision = graph.revision,
            changes = diff.len(),
            "Saved permission graph"
        );
        Ok(())
    }

    async fn history(&self) -> Result<Vec<RevisionRecord>> {
        self.load_history()
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Graph held in memory
///
/// Saves can be made to fail with a fixed message, which is how the editor's
/// rejection path is exercised.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graph: Mutex<PermissionGraph>,
    reject: Mutex<Option<String>>,
    saved: Mutex<Vec<DiffSummary>>,
}

impl InMemoryStore {
    pub fn new(graph: PermissionGraph) -> Self {
        Self {
            graph: Mutex::new(graph),
            ..Default::default()
        }
    }

    /// Reject every following save with `message`
    pub fn reject_with(&self, message: impl Into<String>) {
        *self.reject.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// Accept saves again
    pub fn accept_saves(&self) {
        *self.reject.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Diffs accepted so far
    pub fn saved(&self) -> Vec<DiffSummary> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current graph with accepted diffs applied
    pub fn graph(&self) -> PermissionGraph {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn load(&self) -> Result<PermissionGraph> {
        Ok(self.graph())
    }

    async fn save(&self, diff: &DiffSummary) -> Result<()> {
        if let Some(message) = self
            .reject
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(anyhow!(message));
        }

        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(diff);
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diff.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
