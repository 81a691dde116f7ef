//! Task store: CRUD, search, ordering and statistics over the task document.
//!
//! # Invariants
//! - Every stored task has exactly one folder under `folders_dir`, created
//!   with the task and removed with it.
//! - Category names are unique; a category is registered the first time a
//!   task references it and never removed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{DataPaths, Document, JsonFileDocument, Statistics, StoreError};
use crate::task::{new_task_id, task_folder_name, Category, NewTask, Task, TaskStatus, TaskUpdate};

/// How many fresh ids to try before giving up on a folder name collision.
const MAX_FOLDER_ATTEMPTS: usize = 8;

/// The persisted task document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl TaskDocument {
    /// Register a category by name if it is not known yet.
    fn register_category(&mut self, name: &str) {
        if !self.categories.iter().any(|c| c.name == name) {
            self.categories.push(Category::new(name));
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

/// Filter for [`TaskStore::list`]. All provided fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        let category_ok = match self.category.as_deref() {
            Some(category) if !category.is_empty() => task.category == category,
            _ => true,
        };
        let status_ok = self.status.map(|s| task.status == s).unwrap_or(true);
        category_ok && status_ok
    }
}

/// Owner of the task document and the task folder tree.
pub struct TaskStore {
    document: Arc<dyn Document<TaskDocument>>,
    folders_dir: PathBuf,
    persist_lock: Mutex<()>,
}

impl TaskStore {
    /// Open the JSON-backed store under the given data directory, creating
    /// the directory tree and an empty document if needed.
    pub async fn open(paths: &DataPaths) -> Result<Self, StoreError> {
        paths.ensure().await?;
        let document: Arc<dyn Document<TaskDocument>> =
            Arc::new(JsonFileDocument::new(paths.tasks_file()));
        Self::with_document(document, paths.task_folders_dir()).await
    }

    /// Build a store over any document backend.
    pub async fn with_document(
        document: Arc<dyn Document<TaskDocument>>,
        folders_dir: PathBuf,
    ) -> Result<Self, StoreError> {
        super::create_dir_all(&folders_dir).await?;
        if document.load().await?.is_none() {
            document.save(&TaskDocument::default()).await?;
            tracing::info!("Initialized empty task document");
        }
        tracing::info!(
            persistent = document.is_persistent(),
            folders = %folders_dir.display(),
            "Opened task store"
        );
        Ok(Self {
            document,
            folders_dir,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn folders_dir(&self) -> &PathBuf {
        &self.folders_dir
    }

    async fn load(&self) -> Result<TaskDocument, StoreError> {
        Ok(self.document.load().await?.unwrap_or_default())
    }

    /// Create a task together with its folder.
    ///
    /// If the document cannot be written, the freshly created folder is
    /// removed again before the error is returned.
    pub async fn create(&self, fields: NewTask) -> Result<Task, StoreError> {
        fields.validate()?;
        let _guard = self.persist_lock.lock().await;
        let mut doc = self.load().await?;

        let (id, folder_path) = self.allocate_folder().await?;
        let task = match Task::new(id, fields, folder_path.clone()) {
            Ok(task) => task,
            Err(e) => {
                remove_folder_quietly(&folder_path).await;
                return Err(e.into());
            }
        };

        doc.register_category(&task.category);
        doc.tasks.push(task.clone());

        if let Err(e) = self.document.save(&doc).await {
            tracing::error!("Failed to persist new task {}: {}", task.id, e);
            remove_folder_quietly(&folder_path).await;
            return Err(e);
        }

        tracing::info!(
            task_id = %task.id,
            folder = %task.folder_path.display(),
            "Created task"
        );
        Ok(task)
    }

    /// Pick a fresh id whose folder does not exist yet and create the folder.
    async fn allocate_folder(&self) -> Result<(String, PathBuf), StoreError> {
        super::create_dir_all(&self.folders_dir).await?;
        for _ in 0..MAX_FOLDER_ATTEMPTS {
            let id = new_task_id();
            let folder = self.folders_dir.join(task_folder_name(&id));
            match tokio::fs::create_dir(&folder).await {
                Ok(()) => return Ok((id, folder)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!("Task folder {} already exists, retrying", folder.display());
                }
                Err(e) => {
                    return Err(StoreError::io(
                        format!("Failed to create task folder {}", folder.display()),
                        e,
                    ))
                }
            }
        }
        Err(StoreError::io(
            "Failed to allocate a unique task folder",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "folder name collision"),
        ))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let doc = self.load().await?;
        Ok(doc.tasks.into_iter().find(|t| t.id == id))
    }

    /// List tasks in stored order.
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let doc = self.load().await?;
        Ok(doc.tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    /// Overwrite only the fields present in `update`.
    pub async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let mut doc = self.load().await?;
        let index = doc
            .position(id)
            .ok_or_else(|| StoreError::NotFound(format!("Task {}", id)))?;
        if update.is_empty() {
            return Ok(doc.tasks[index].clone());
        }

        doc.tasks[index].apply(update)?;
        let category = doc.tasks[index].category.clone();
        doc.register_category(&category);
        self.document.save(&doc).await?;

        tracing::debug!(task_id = %id, "Updated task");
        Ok(doc.tasks[index].clone())
    }

    /// Delete a task and its folder. Returns `false` if no such task exists.
    ///
    /// The folder is first renamed to a hidden sibling, then the document is
    /// saved, then the renamed folder is removed. If the save fails the folder
    /// is renamed back so the record keeps its folder. A folder that is
    /// already gone is not an error.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let mut doc = self.load().await?;
        let Some(index) = doc.position(id) else {
            return Ok(false);
        };

        let folder = doc.tasks[index].folder_path.clone();
        let tombstone = tombstone_path(&folder);
        let moved = match tokio::fs::rename(&folder, &tombstone).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Task folder {} was already missing", folder.display());
                false
            }
            Err(e) => {
                return Err(StoreError::io(
                    format!("Failed to remove task folder {}", folder.display()),
                    e,
                ))
            }
        };

        doc.tasks.remove(index);
        if let Err(e) = self.document.save(&doc).await {
            tracing::error!("Failed to persist deletion of task {}: {}", id, e);
            if moved {
                if let Err(restore) = tokio::fs::rename(&tombstone, &folder).await {
                    tracing::error!(
                        "Failed to restore task folder {}: {}",
                        folder.display(),
                        restore
                    );
                }
            }
            return Err(e);
        }

        if moved {
            remove_folder_quietly(&tombstone).await;
        }
        tracing::info!(task_id = %id, "Deleted task");
        Ok(true)
    }

    /// Tasks whose title or description contains `query`, case-insensitively.
    pub async fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        let query_lower = query.to_lowercase();
        let doc = self.load().await?;
        Ok(doc
            .tasks
            .into_iter()
            .filter(|t| t.matches_query(&query_lower))
            .collect())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.load().await?.categories)
    }

    pub async fn statistics(&self) -> Result<Statistics, StoreError> {
        let doc = self.load().await?;
        Ok(Statistics::compute(&doc.tasks))
    }

    /// Rewrite the stored order to follow `order`.
    ///
    /// Stored tasks missing from `order` keep their relative order and are
    /// appended after the listed ones. Unknown and repeated ids are ignored.
    pub async fn reorder(&self, order: &[String]) -> Result<Vec<Task>, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let mut doc = self.load().await?;

        let positions: HashMap<String, usize> = doc
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        let mut slots: Vec<Option<Task>> = std::mem::take(&mut doc.tasks)
            .into_iter()
            .map(Some)
            .collect();

        let mut reordered = Vec::with_capacity(slots.len());
        for id in order {
            match positions.get(id) {
                Some(&i) => {
                    if let Some(task) = slots[i].take() {
                        reordered.push(task);
                    }
                }
                None => tracing::debug!("Ignoring unknown task id {} in reorder", id),
            }
        }
        reordered.extend(slots.into_iter().flatten());

        doc.tasks = reordered;
        self.document.save(&doc).await?;
        Ok(doc.tasks)
    }
}

/// Hidden sibling a folder is parked under while its deletion is persisted.
fn tombstone_path(folder: &std::path::Path) -> PathBuf {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    folder.with_file_name(format!(".{}.deleting", name))
}

async fn remove_folder_quietly(folder: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_dir_all(folder).await {
        tracing::warn!("Failed to clean up task folder {}: {}", folder.display(), e);
    }
}
