//! Task module - defines tasks, categories, and their update payloads.
//!
//! Pure data and validation only; persistence lives in `store`.

pub mod task;

pub use task::{
    local_now, new_task_id, task_folder_name, Category, NewTask, Task, TaskError, TaskPriority,
    TaskStatus, TaskUpdate, DEFAULT_CATEGORY_COLOR, TASK_FOLDER_PREFIX,
};
