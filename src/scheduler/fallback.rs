//! Deterministic substitutes for assistant answers.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use crate::task::Task;

/// First slot of a working day.
pub const WORKDAY_START_HOUR: u32 = 9;
/// Slots starting at or after this hour roll over to the next day.
pub const WORKDAY_END_HOUR: u32 = 18;
/// Length of one scheduling slot.
pub const SLOT_HOURS: i64 = 2;

/// Substrings that suggest a task reaches outside its own folder.
pub const RISK_KEYWORDS: &[&str] = &[
    "system",
    "global",
    "config",
    "settings",
    "install",
    "uninstall",
    "modify system",
    "change settings",
    "update config",
    "root",
    "admin",
    "permission",
    "outside",
    "external",
    "home directory",
    "/etc",
    "/usr",
    "/opt",
    "~",
    "home",
    "desktop",
    "documents",
];

/// 09:00 on the calendar day after `now`.
pub fn next_workday_start(now: NaiveDateTime) -> NaiveDateTime {
    day_start(now + Duration::days(1))
}

fn day_start(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(NaiveTime::MIN) + Duration::hours(WORKDAY_START_HOUR as i64)
}

/// Assign sequential two-hour slots in priority/due-date order.
///
/// Tasks are stably sorted by priority (high, medium, low) then due date,
/// with a missing due date sorting last. Slots start at 09:00 the day after
/// `now`; a slot that would start at or after 18:00 moves to 09:00 the next
/// day. Returns the tasks in scheduled order.
pub fn rule_based_schedule(mut tasks: Vec<Task>, now: NaiveDateTime) -> Vec<Task> {
    tasks.sort_by_key(|t| (t.priority.rank(), t.due_date.unwrap_or(NaiveDateTime::MAX)));

    let mut slot = next_workday_start(now);
    for task in &mut tasks {
        task.ai_suggested_time = Some(slot);
        slot += Duration::hours(SLOT_HOURS);
        if slot.hour() >= WORKDAY_END_HOUR {
            slot = day_start(slot + Duration::days(1));
        }
    }
    tasks
}

/// Keyword classifier: `true` if the title or description mentions any risk
/// keyword, case-insensitively.
pub fn requires_permission(task: &Task) -> bool {
    let title = task.title.to_lowercase();
    let description = task.description.as_deref().unwrap_or_default().to_lowercase();
    RISK_KEYWORDS
        .iter()
        .any(|keyword| title.contains(keyword) || description.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{NewTask, TaskPriority};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn task(title: &str, priority: TaskPriority, due: Option<NaiveDateTime>) -> Task {
        let mut fields = NewTask::new(title, "general").with_priority(priority);
        fields.due_date = due;
        Task::new(
            format!("id-{}", title),
            fields,
            PathBuf::from(format!("/tmp/{}", title)),
        )
        .unwrap()
    }

    fn titled(title: &str, description: Option<&str>) -> Task {
        let mut fields = NewTask::new(title, "general");
        fields.description = description.map(str::to_string);
        Task::new("id".to_string(), fields, PathBuf::from("/tmp/id")).unwrap()
    }

    #[test]
    fn high_priority_gets_first_slot_tomorrow_morning() {
        let now = at(2026, 3, 10, 15, 30);
        let a = task("a", TaskPriority::Low, Some(now + Duration::days(10)));
        let b = task("b", TaskPriority::High, Some(now + Duration::days(1)));

        let scheduled = rule_based_schedule(vec![a, b], now);
        assert_eq!(scheduled[0].title, "b");
        assert_eq!(scheduled[0].ai_suggested_time, Some(at(2026, 3, 11, 9, 0)));
        assert_eq!(scheduled[1].title, "a");
        assert!(scheduled[0].ai_suggested_time < scheduled[1].ai_suggested_time);
    }

    #[test]
    fn fifth_slot_is_17_and_sixth_rolls_over() {
        let now = at(2026, 3, 10, 8, 0);
        let due = Some(at(2026, 3, 20, 12, 0));
        let tasks: Vec<Task> = (0..6)
            .map(|i| task(&format!("t{}", i), TaskPriority::Medium, due))
            .collect();

        let scheduled = rule_based_schedule(tasks, now);
        let slots: Vec<NaiveDateTime> = scheduled
            .iter()
            .map(|t| t.ai_suggested_time.unwrap())
            .collect();
        assert_eq!(
            slots,
            vec![
                at(2026, 3, 11, 9, 0),
                at(2026, 3, 11, 11, 0),
                at(2026, 3, 11, 13, 0),
                at(2026, 3, 11, 15, 0),
                at(2026, 3, 11, 17, 0),
                at(2026, 3, 12, 9, 0),
            ]
        );
        let titles: Vec<&str> = scheduled.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t0", "t1", "t2", "t3", "t4", "t5"], "stable order");
    }

    #[test]
    fn missing_due_date_sorts_after_dated_tasks() {
        let now = at(2026, 3, 10, 8, 0);
        let undated = task("undated", TaskPriority::High, None);
        let dated = task("dated", TaskPriority::High, Some(at(2027, 1, 1, 0, 0)));
        let low = task("low", TaskPriority::Low, Some(at(2026, 3, 11, 0, 0)));

        let scheduled = rule_based_schedule(vec![low, undated, dated], now);
        let titles: Vec<&str> = scheduled.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["dated", "undated", "low"]);
    }

    #[test]
    fn empty_input_schedules_nothing() {
        assert!(rule_based_schedule(Vec::new(), at(2026, 1, 1, 0, 0)).is_empty());
    }

    #[test]
    fn keyword_classifier() {
        assert!(requires_permission(&titled("Update system config", None)));
        assert!(!requires_permission(&titled("Write blog post draft", None)));
        assert!(requires_permission(&titled(
            "Tidy up",
            Some("Move files into ~/Documents")
        )));
        assert!(requires_permission(&titled("Edit /ETC/hosts", None)));
    }
}
