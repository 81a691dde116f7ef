//! Core Task type, its enums, and the create/update payloads.
//!
//! # Invariants
//! - `id` is assigned once at creation and never changes
//! - `title` is non-empty
//! - `created_at` is set once at creation and never mutated
//! - `folder_path` names exactly one directory owned by this task

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Prefix used for per-task folder names (`task_<first 8 chars of id>`).
pub const TASK_FOLDER_PREFIX: &str = "task_";

/// Number of id characters used in a task folder name.
const TASK_FOLDER_ID_LEN: usize = 8;

/// Default display color for implicitly registered categories.
pub const DEFAULT_CATEGORY_COLOR: &str = "#007bff";

/// Current local wall-clock time, without offset.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Generate a fresh opaque task identifier.
pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Folder name derived from a task id.
pub fn task_folder_name(id: &str) -> String {
    let short: String = id.chars().take(TASK_FOLDER_ID_LEN).collect();
    format!("{}{}", TASK_FOLDER_PREFIX, short)
}

/// Task priority.
///
/// Ordering for scheduling is `High`, `Medium`, `Low` (see [`TaskPriority::rank`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Scheduling rank: lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TaskError::InvalidValue {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of a task in its lifecycle.
///
/// ```text
/// Pending -> InProgress -> Completed
/// ```
///
/// Transitions are not enforced; any status may be written by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(TaskError::InvalidValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub folder_path: PathBuf,
    #[serde(default)]
    pub ai_suggested_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub has_ai_button: bool,
}

impl Task {
    /// Build a task from creation fields.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    pub fn new(id: String, fields: NewTask, folder_path: PathBuf) -> Result<Self, TaskError> {
        fields.validate()?;
        Ok(Self {
            id,
            title: fields.title,
            description: fields.description,
            category: fields.category,
            priority: fields.priority,
            status: TaskStatus::Pending,
            due_date: fields.due_date,
            created_at: local_now(),
            folder_path,
            ai_suggested_time: None,
            has_ai_button: false,
        })
    }

    /// Apply a partial update. Absent fields are left untouched.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyTitle` if the update sets a blank title; the
    /// task is unchanged in that case.
    pub fn apply(&mut self, update: TaskUpdate) -> Result<(), TaskError> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(TaskError::EmptyTitle);
            }
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
        if let Some(ai_suggested_time) = update.ai_suggested_time {
            self.ai_suggested_time = ai_suggested_time;
        }
        if let Some(has_ai_button) = update.has_ai_button {
            self.has_ai_button = has_ai_button;
        }
        Ok(())
    }

    /// Case-insensitive substring match against title and description.
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.title.to_lowercase().contains(query_lower)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(query_lower))
                .unwrap_or(false)
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: category.into(),
            priority: TaskPriority::default(),
            due_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDateTime) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial update of a task.
///
/// Nullable fields use `Option<Option<T>>`: `None` leaves the field alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDateTime>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_suggested_time: Option<Option<NaiveDateTime>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_ai_button: Option<bool>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.ai_suggested_time.is_none()
            && self.has_ai_button.is_none()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn suggested_time(time: Option<NaiveDateTime>) -> Self {
        Self {
            ai_suggested_time: Some(time),
            ..Self::default()
        }
    }
}

/// Maps a present JSON field (including `null`) to `Some(..)`; absence is
/// handled by `#[serde(default)]`.
pub(crate) fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A task category. The name is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default = "default_category_color")]
    pub color: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
        }
    }
}

fn default_category_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

/// Errors raised by task model validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
