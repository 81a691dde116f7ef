//! Persistence for tasks and the user profile.
//!
//! Both stores follow the same model: the whole document is loaded, modified
//! in memory, and written back in full on every mutation. The document
//! backend is pluggable:
//! - `file`: pretty-printed JSON file, replaced atomically via rename
//! - `memory`: in-memory snapshot (non-persistent, for testing)
//!
//! ## Layout
//!
//! ```text
//! {data_dir}/
//! ├── tasks.json          # { "tasks": [...], "categories": [...] }
//! ├── user_profile.json   # single UserProfile object
//! ├── task_folders/       # one task_<id8>/ directory per task
//! └── avatars/            # avatar_<hex8>.<ext> image files
//! ```

mod file;
mod memory;
mod profile;
mod stats;
mod tasks;

pub use file::JsonFileDocument;
pub use memory::InMemoryDocument;
pub use profile::{ProfileStore, ProfileUpdate, UserProfile};
pub use stats::{PriorityBreakdown, Statistics};
pub use tasks::{TaskDocument, TaskFilter, TaskStore};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::task::TaskError;

/// Errors surfaced by the task and profile stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<TaskError> for StoreError {
    fn from(err: TaskError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Whole-snapshot storage for a single document.
#[async_trait]
pub trait Document<T>: Send + Sync {
    /// Whether this backend persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Load the current snapshot, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<T>, StoreError>;

    /// Replace the snapshot.
    async fn save(&self, value: &T) -> Result<(), StoreError>;
}

/// Paths derived from the configured data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    pub fn profile_file(&self) -> PathBuf {
        self.root.join("user_profile.json")
    }

    pub fn task_folders_dir(&self) -> PathBuf {
        self.root.join("task_folders")
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.root.join("avatars")
    }

    /// Create the data directory tree.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        for dir in [
            self.root.clone(),
            self.task_folders_dir(),
            self.avatars_dir(),
        ] {
            create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

pub(crate) async fn create_dir_all(dir: &Path) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::io(format!("Failed to create {}", dir.display()), e))
}
