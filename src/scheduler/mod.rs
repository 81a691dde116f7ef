//! AI-assisted scheduling, permission checks and task execution.
//!
//! Every operation asks the external assistant first. Scheduling and
//! permission checks never fail: any assistant error, timeout or unusable
//! answer is logged and replaced by the deterministic policy in
//! [`fallback`]. Execution reports three distinct outcomes: a real run, a
//! simulated run (assistant not installed), or a failed run.
//!
//! ## Flow
//!
//! ```text
//!   schedule_tasks ──► assistant ──ok──► parse JSON ──ok──► suggested times
//!                          │                 │
//!                          └──err──┐   ┌─────┘ malformed
//!                                  ▼   ▼
//!                         fallback::rule_based_schedule
//! ```

pub mod assistant;
pub mod fallback;
mod prompts;

pub use assistant::{Assistant, AssistantError, CliAssistant};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::task::{local_now, Task};

/// Why an assistant scheduling answer was discarded.
#[derive(Debug, thiserror::Error)]
enum ScheduleError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error("response contains no JSON object")]
    NoJson,

    #[error("invalid schedule JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unparseable time {value:?} for task {task_id}")]
    BadTime { task_id: String, value: String },

    #[error("response matched none of the {0} tasks")]
    NoMatches(usize),
}

#[derive(Debug, Deserialize)]
struct ScheduleItem {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    suggested_time: Option<String>,
}

/// Accepted response shapes: `{"schedules": [...]}` or `{"<id>": "<time>"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScheduleResponse {
    List { schedules: Vec<ScheduleItem> },
    Map(HashMap<String, String>),
}

impl ScheduleResponse {
    fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            Self::List { schedules } => schedules
                .into_iter()
                .filter_map(|item| Some((item.task_id?, item.suggested_time?)))
                .collect(),
            Self::Map(map) => map.into_iter().collect(),
        }
    }
}

fn fenced_json_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").ok())
        .as_ref()
}

/// Pull the JSON object out of an answer: the body of a fenced code block
/// if present, else the outermost `{ ... }`.
fn extract_json_object(output: &str) -> Option<&str> {
    if let Some(captures) = fenced_json_pattern().and_then(|re| re.captures(output)) {
        if let Some(body) = captures.get(1) {
            return Some(body.as_str());
        }
    }
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

/// Parse an ISO-8601 timestamp, with or without offset, or a bare date.
pub fn parse_suggested_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = value.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    value
        .parse::<NaiveDate>()
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Identifying details echoed back by a simulated execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub task_id: String,
    pub title: String,
    pub folder_path: PathBuf,
}

/// Outcome of [`AiScheduler::execute_task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    /// Raw assistant output for a real execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Set when the assistant was not available and nothing actually ran.
    #[serde(default)]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_details: Option<TaskDetails>,
}

/// Front end to the external assistant with deterministic fallbacks.
pub struct AiScheduler {
    assistant: Arc<dyn Assistant>,
    timeout: Duration,
    clock: fn() -> NaiveDateTime,
}

impl AiScheduler {
    pub fn new(assistant: Arc<dyn Assistant>, timeout: Duration) -> Self {
        Self {
            assistant,
            timeout,
            clock: local_now,
        }
    }

    /// Scheduler backed by the configured assistant command.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CliAssistant::new(config.assistant_command.clone())),
            config.assistant_timeout,
        )
    }

    /// Replace the wall clock used for "tomorrow at 09:00".
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Suggest a start time for each task.
    ///
    /// On success the tasks keep their input order and carry the assistant's
    /// times. On any failure the result is exactly
    /// [`fallback::rule_based_schedule`] on the same input.
    pub async fn schedule_tasks(&self, tasks: Vec<Task>) -> Vec<Task> {
        if tasks.is_empty() {
            return tasks;
        }
        let now = (self.clock)();

        match self.try_schedule(&tasks, now).await {
            Ok(scheduled) => {
                tracing::info!("Assistant scheduled {} tasks", scheduled.len());
                scheduled
            }
            Err(e) => {
                tracing::warn!("Assistant scheduling failed, falling back to rule-based: {}", e);
                fallback::rule_based_schedule(tasks, now)
            }
        }
    }

    async fn try_schedule(
        &self,
        tasks: &[Task],
        now: NaiveDateTime,
    ) -> Result<Vec<Task>, ScheduleError> {
        let prompt = prompts::schedule_prompt(tasks, fallback::next_workday_start(now));
        let output = self.assistant.run(&prompt, self.timeout, None).await?;

        let json = extract_json_object(&output).ok_or(ScheduleError::NoJson)?;
        let response: ScheduleResponse = serde_json::from_str(json)?;

        let mut scheduled = tasks.to_vec();
        let index: HashMap<String, usize> = scheduled
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut matched = 0;
        for (task_id, value) in response.into_pairs() {
            let Some(&i) = index.get(&task_id) else {
                tracing::debug!("Assistant scheduled unknown task {}", task_id);
                continue;
            };
            let time = parse_suggested_time(&value).ok_or_else(|| ScheduleError::BadTime {
                task_id: task_id.clone(),
                value: value.clone(),
            })?;
            scheduled[i].ai_suggested_time = Some(time);
            matched += 1;
        }

        if matched == 0 {
            return Err(ScheduleError::NoMatches(tasks.len()));
        }
        Ok(scheduled)
    }

    /// Whether executing `task` would touch anything outside its folder.
    ///
    /// Only an answer of `true` (any case) is taken from the assistant; every
    /// other answer, `false` included, is decided by the keyword check.
    pub async fn check_execution_permission(&self, task: &Task) -> bool {
        let prompt = prompts::permission_prompt(task);
        match self.assistant.run(&prompt, self.timeout, None).await {
            Ok(output) if output.trim().eq_ignore_ascii_case("true") => true,
            Ok(output) => {
                tracing::debug!(
                    task_id = %task.id,
                    "Assistant permission answer {:?}, using keyword check",
                    output.trim()
                );
                fallback::requires_permission(task)
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %task.id,
                    "Assistant permission check failed, using keyword check: {}",
                    e
                );
                fallback::requires_permission(task)
            }
        }
    }

    /// Ask the assistant to carry out `task` inside its folder.
    pub async fn execute_task(&self, task: &Task) -> ExecutionResult {
        let prompt = prompts::execute_prompt(task);
        let working_dir = task
            .folder_path
            .is_dir()
            .then_some(task.folder_path.as_path());

        match self.assistant.run(&prompt, self.timeout, working_dir).await {
            Ok(output) => {
                tracing::info!(task_id = %task.id, "Assistant executed task");
                ExecutionResult {
                    success: true,
                    message: "Task execution triggered successfully".to_string(),
                    response: Some(output),
                    simulated: false,
                    task_details: None,
                }
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(
                    task_id = %task.id,
                    "Assistant not available, simulating execution: {}",
                    e
                );
                ExecutionResult {
                    success: true,
                    message: "Task execution simulated (assistant not available)".to_string(),
                    response: None,
                    simulated: true,
                    task_details: Some(TaskDetails {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                        folder_path: task.folder_path.clone(),
                    }),
                }
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, "Assistant execution failed: {}", e);
                ExecutionResult {
                    success: false,
                    message: format!("Assistant execution failed: {}", e),
                    response: None,
                    simulated: false,
                    task_details: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{NewTask, TaskPriority};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    enum Reply {
        Output(&'static str),
        Unavailable,
        Broken,
        Timeout,
        NonZero,
        Empty,
    }

    /// Test double returning one canned reply for every call.
    struct CannedAssistant {
        reply: Reply,
        calls: Mutex<Vec<(String, Option<PathBuf>)>>,
    }

    impl CannedAssistant {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Assistant for CannedAssistant {
        async fn run(
            &self,
            prompt: &str,
            timeout: Duration,
            working_dir: Option<&Path>,
        ) -> Result<String, AssistantError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), working_dir.map(Path::to_path_buf)));
            match &self.reply {
                Reply::Output(text) => Ok(text.to_string()),
                Reply::Unavailable => Err(AssistantError::Unavailable(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such command",
                ))),
                Reply::Broken => Err(AssistantError::Output(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pipe closed",
                ))),
                Reply::Timeout => Err(AssistantError::Timeout(timeout)),
                Reply::NonZero => Err(AssistantError::NonZeroExit {
                    code: Some(1),
                    stderr: "bad".to_string(),
                }),
                Reply::Empty => Err(AssistantError::EmptyOutput),
            }
        }
    }

    fn scheduler(assistant: Arc<CannedAssistant>) -> AiScheduler {
        AiScheduler::new(assistant, Duration::from_secs(60)).with_clock(fixed_now)
    }

    fn task(id: &str, title: &str, priority: TaskPriority) -> Task {
        Task::new(
            id.to_string(),
            NewTask::new(title, "general").with_priority(priority),
            PathBuf::from(format!("/nonexistent/task_{}", id)),
        )
        .unwrap()
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            task("a", "Low thing", TaskPriority::Low),
            task("b", "Urgent thing", TaskPriority::High),
            task("c", "Normal thing", TaskPriority::Medium),
        ]
    }

    #[tokio::test]
    async fn assistant_schedule_is_applied_in_input_order() {
        let assistant = CannedAssistant::new(Reply::Output(
            r#"{"schedules": [
                {"task_id": "b", "suggested_time": "2026-05-05T09:00:00"},
                {"task_id": "a", "suggested_time": "2026-05-05T13:30:00"},
                {"task_id": "zzz", "suggested_time": "2026-05-05T10:00:00"}
            ]}"#,
        ));
        let result = scheduler(assistant.clone()).schedule_tasks(sample_tasks()).await;

        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            result[0].ai_suggested_time,
            Some(NaiveDate::from_ymd_opt(2026, 5, 5).unwrap().and_hms_opt(13, 30, 0).unwrap())
        );
        assert_eq!(result[1].ai_suggested_time, Some(at(5, 9)));
        assert_eq!(result[2].ai_suggested_time, None);
        assert_eq!(assistant.call_count(), 1);

        let (prompt, dir) = &assistant.calls.lock().unwrap()[0];
        assert!(prompt.contains("2026-05-05T09:00:00"), "prompt names the start slot");
        assert!(prompt.contains("\"id\": \"b\""));
        assert!(dir.is_none());
    }

    #[tokio::test]
    async fn fenced_flat_map_with_offsets_is_accepted() {
        let assistant = CannedAssistant::new(Reply::Output(
            "Here you go:\n```json\n{\"a\": \"2026-05-06T10:00:00+02:00\", \"b\": \"2026-05-06\"}\n```",
        ));
        let result = scheduler(assistant).schedule_tasks(sample_tasks()).await;
        assert_eq!(result[0].ai_suggested_time, Some(at(6, 10)));
        assert_eq!(result[1].ai_suggested_time, Some(at(6, 0)));
    }

    #[tokio::test]
    async fn every_failure_matches_rule_based_schedule() {
        let tasks = sample_tasks();
        let expected = fallback::rule_based_schedule(tasks.clone(), fixed_now());
        assert_eq!(expected[0].id, "b");
        assert_eq!(expected[0].ai_suggested_time, Some(at(5, 9)));

        let replies = vec![
            Reply::Unavailable,
            Reply::Broken,
            Reply::Timeout,
            Reply::NonZero,
            Reply::Empty,
            Reply::Output("I cannot help with that"),
            Reply::Output("{\"schedules\": [oops]}"),
            Reply::Output(r#"{"schedules": [{"task_id": "a", "suggested_time": "next week"}]}"#),
            Reply::Output(r#"{"schedules": [{"task_id": "other", "suggested_time": "2026-05-05T09:00:00"}]}"#),
        ];
        for reply in replies {
            let result = scheduler(CannedAssistant::new(reply))
                .schedule_tasks(tasks.clone())
                .await;
            assert_eq!(result, expected);
        }
    }

    #[tokio::test]
    async fn empty_task_list_skips_the_assistant() {
        let assistant = CannedAssistant::new(Reply::Output("{}"));
        let result = scheduler(assistant.clone()).schedule_tasks(Vec::new()).await;
        assert!(result.is_empty());
        assert_eq!(assistant.call_count(), 0);
    }

    #[tokio::test]
    async fn permission_trusts_a_true_answer() {
        let harmless = task("h", "Write blog post draft", TaskPriority::Medium);
        let yes = scheduler(CannedAssistant::new(Reply::Output(" TRUE\n")));
        assert!(yes.check_execution_permission(&harmless).await);
    }

    #[tokio::test]
    async fn permission_falls_back_to_keywords() {
        let risky = task("r", "Update system config", TaskPriority::Medium);
        let harmless = task("h", "Write blog post draft", TaskPriority::Medium);

        for reply in [
            Reply::Output("false"),
            Reply::Output("Probably yes."),
            Reply::Timeout,
        ] {
            let s = scheduler(CannedAssistant::new(reply));
            assert!(s.check_execution_permission(&risky).await);
            assert!(!s.check_execution_permission(&harmless).await);
        }
    }

    #[tokio::test]
    async fn execute_success_returns_raw_response() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut t = task("e", "Draft notes", TaskPriority::Medium);
        t.folder_path = temp.path().to_path_buf();

        let assistant = CannedAssistant::new(Reply::Output("Wrote notes.md"));
        let result = scheduler(assistant.clone()).execute_task(&t).await;
        assert!(result.success);
        assert!(!result.simulated);
        assert_eq!(result.response.as_deref(), Some("Wrote notes.md"));

        let (prompt, dir) = &assistant.calls.lock().unwrap()[0];
        assert!(prompt.contains("Draft notes"));
        assert_eq!(dir.as_deref(), Some(temp.path()));
    }

    #[tokio::test]
    async fn execute_without_assistant_is_simulated() {
        let t = task("s", "Draft notes", TaskPriority::Medium);
        let result = scheduler(CannedAssistant::new(Reply::Unavailable))
            .execute_task(&t)
            .await;
        assert!(result.success);
        assert!(result.simulated);
        assert!(result.response.is_none());
        let details = result.task_details.expect("details");
        assert_eq!(details.task_id, "s");
        assert_eq!(details.title, "Draft notes");
        assert_eq!(details.folder_path, t.folder_path);
    }

    #[tokio::test]
    async fn execute_failure_is_not_simulated() {
        let t = task("f", "Draft notes", TaskPriority::Medium);
        for reply in [Reply::NonZero, Reply::Empty, Reply::Timeout, Reply::Broken] {
            let result = scheduler(CannedAssistant::new(reply)).execute_task(&t).await;
            assert!(!result.success);
            assert!(!result.simulated);
            assert!(result.task_details.is_none());
        }
    }

    #[test]
    fn json_extraction_prefers_fenced_block() {
        let answer = "Plan {draft}:\n```json\n{\"a\": \"2026-05-05\"}\n```\nDone {ok}";
        assert_eq!(extract_json_object(answer), Some("{\"a\": \"2026-05-05\"}"));
        assert_eq!(extract_json_object("x {\"a\": 1} y"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn suggested_time_formats() {
        assert_eq!(parse_suggested_time("2026-05-05T09:00:00"), Some(at(5, 9)));
        assert_eq!(parse_suggested_time("2026-05-05 09:00:00"), Some(at(5, 9)));
        assert_eq!(parse_suggested_time("2026-05-05T09:00"), Some(at(5, 9)));
        assert_eq!(parse_suggested_time("2026-05-05T09:00:00Z"), Some(at(5, 9)));
        assert_eq!(parse_suggested_time("2026-05-05"), Some(at(5, 0)));
        assert_eq!(parse_suggested_time("tomorrow"), None);
    }
}
