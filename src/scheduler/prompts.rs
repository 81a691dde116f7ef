//! Prompt construction for assistant requests.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::task::Task;

const NO_DESCRIPTION: &str = "No description provided";

#[derive(Serialize)]
struct ScheduleEntry<'a> {
    id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    category: &'a str,
    priority: &'a str,
    due_date: Option<String>,
}

pub fn schedule_prompt(tasks: &[Task], start: NaiveDateTime) -> String {
    let entries: Vec<ScheduleEntry<'_>> = tasks
        .iter()
        .map(|t| ScheduleEntry {
            id: &t.id,
            title: &t.title,
            description: t.description.as_deref(),
            category: &t.category,
            priority: t.priority.as_str(),
            due_date: t.due_date.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
        })
        .collect();
    let tasks_json = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a task scheduling assistant. Given the following tasks with priorities and due dates,
suggest optimal times to work on each task. Consider:
1. Priority order (high > medium > low)
2. Due date constraints
3. Time needed for each task (estimate 1-2 hours per task)

Tasks:
{tasks_json}

Return a JSON object with task IDs and suggested times in ISO 8601 format.
Start scheduling from {start}. Work hours are 09:00 to 18:00.

Format:
{{
  "schedules": [
    {{"task_id": "id1", "suggested_time": "2024-01-01T09:00:00"}}
  ]
}}"#,
        start = start.format("%Y-%m-%dT%H:%M:%S"),
    )
}

pub fn permission_prompt(task: &Task) -> String {
    format!(
        r#"Analyze this task and determine if executing it will require modifying files or directories
OUTSIDE of the task's isolated folder ({folder}).

Task:
Title: {title}
Description: {description}
Category: {category}
Priority: {priority}

Consider:
- Does the task need to modify system files, global configs, or user home directory?
- Does it need to install packages globally?
- Does it need to access files outside the task folder?

Return ONLY "true" if permission is needed, or "false" if execution can be contained within the task folder."#,
        folder = task.folder_path.display(),
        title = task.title,
        description = task.description.as_deref().unwrap_or(NO_DESCRIPTION),
        category = task.category,
        priority = task.priority,
    )
}

pub fn execute_prompt(task: &Task) -> String {
    format!(
        r#"Execute the following task. Work within the task folder: {folder}

Task Details:
Title: {title}
Description: {description}
Category: {category}
Priority: {priority}

Please execute this task and report the results."#,
        folder = task.folder_path.display(),
        title = task.title,
        description = task.description.as_deref().unwrap_or(NO_DESCRIPTION),
        category = task.category,
        priority = task.priority,
    )
}
