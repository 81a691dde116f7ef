//! Aggregate statistics over the current task set.
//!
//! Never persisted; recomputed from the task list on every call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskPriority, TaskStatus};

/// Task counts per priority. All three buckets are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityBreakdown {
    fn bump(&mut self, priority: TaskPriority) {
        match priority {
            TaskPriority::Low => self.low += 1,
            TaskPriority::Medium => self.medium += 1,
            TaskPriority::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    /// Percentage of completed tasks, rounded to 2 decimal places; 0 when empty.
    pub completion_rate: f64,
    pub tasks_by_category: BTreeMap<String, usize>,
    pub tasks_by_priority: PriorityBreakdown,
    pub ai_action_enabled: usize,
    pub ai_action_disabled: usize,
}

impl Statistics {
    pub fn compute(tasks: &[Task]) -> Self {
        let total_tasks = tasks.len();
        let count_status = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let completed_tasks = count_status(TaskStatus::Completed);

        let completion_rate = if total_tasks == 0 {
            0.0
        } else {
            round2(completed_tasks as f64 / total_tasks as f64 * 100.0)
        };

        let mut tasks_by_category = BTreeMap::new();
        let mut tasks_by_priority = PriorityBreakdown::default();
        for task in tasks {
            *tasks_by_category.entry(task.category.clone()).or_insert(0) += 1;
            tasks_by_priority.bump(task.priority);
        }

        let ai_action_enabled = tasks.iter().filter(|t| t.has_ai_button).count();

        Self {
            total_tasks,
            completed_tasks,
            pending_tasks: count_status(TaskStatus::Pending),
            in_progress_tasks: count_status(TaskStatus::InProgress),
            completion_rate,
            tasks_by_category,
            tasks_by_priority,
            ai_action_enabled,
            ai_action_disabled: total_tasks - ai_action_enabled,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use std::path::PathBuf;

    fn task(category: &str, priority: TaskPriority, status: TaskStatus, ai: bool) -> Task {
        let mut task = Task::new(
            crate::task::new_task_id(),
            NewTask::new("t", category).with_priority(priority),
            PathBuf::from("/tmp/t"),
        )
        .unwrap();
        task.status = status;
        task.has_ai_button = ai;
        task
    }

    #[test]
    fn empty_task_set_is_all_zero() {
        let stats = Statistics::compute(&[]);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.pending_tasks, 0);
        assert_eq!(stats.in_progress_tasks, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(stats.tasks_by_category.is_empty());
        assert_eq!(stats.tasks_by_priority, PriorityBreakdown::default());
        assert_eq!(stats.ai_action_enabled, 0);
        assert_eq!(stats.ai_action_disabled, 0);

        let json = serde_json::to_value(&stats).unwrap();
        let priorities = &json["tasks_by_priority"];
        for key in ["low", "medium", "high"] {
            assert_eq!(priorities[key], 0, "bucket {key} present at zero");
        }
    }

    #[test]
    fn counts_and_rate_are_derived_from_tasks() {
        let tasks = vec![
            task("work", TaskPriority::High, TaskStatus::Completed, true),
            task("work", TaskPriority::Low, TaskStatus::Pending, false),
            task("home", TaskPriority::High, TaskStatus::InProgress, false),
        ];
        let stats = Statistics::compute(&tasks);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.completion_rate, 33.33);
        assert_eq!(stats.tasks_by_category.get("work"), Some(&2));
        assert_eq!(stats.tasks_by_category.get("home"), Some(&1));
        assert_eq!(
            stats.tasks_by_priority,
            PriorityBreakdown {
                low: 1,
                medium: 0,
                high: 2
            }
        );
        assert_eq!(stats.ai_action_enabled, 1);
        assert_eq!(stats.ai_action_disabled, 2);
    }
}
