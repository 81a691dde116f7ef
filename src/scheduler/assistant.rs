//! External assistant runner.
//!
//! The assistant is a command-line tool invoked as `<command> -p <prompt>`.
//! Each call spawns a fresh process; the answer is read from stdout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Why an assistant invocation produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The process could not be launched (not installed, not executable).
    #[error("Assistant could not be started: {0}")]
    Unavailable(#[source] std::io::Error),

    /// The process started but its output could not be collected.
    #[error("Failed to read assistant output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Assistant timed out after {0:?}")]
    Timeout(Duration),

    #[error("Assistant exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Assistant produced no output")]
    EmptyOutput,
}

impl AssistantError {
    /// Whether the assistant could not be run at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Capability to ask the assistant something.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Run one prompt and return the trimmed stdout.
    ///
    /// `working_dir` sets the process working directory when given.
    async fn run(
        &self,
        prompt: &str,
        timeout: Duration,
        working_dir: Option<&Path>,
    ) -> Result<String, AssistantError>;
}

/// Assistant backed by an external CLI.
#[derive(Debug, Clone)]
pub struct CliAssistant {
    command: String,
}

impl CliAssistant {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Assistant for CliAssistant {
    async fn run(
        &self,
        prompt: &str,
        timeout: Duration,
        working_dir: Option<&Path>,
    ) -> Result<String, AssistantError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-p")
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out child is dropped with the output future; make sure it dies.
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            "Spawning assistant: command={}, prompt_len={}, working_dir={:?}",
            self.command,
            prompt.len(),
            working_dir
        );

        let child = cmd.spawn().map_err(|e| {
            tracing::warn!("Failed to spawn assistant '{}': {}", self.command, e);
            AssistantError::Unavailable(e)
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AssistantError::Output(e)),
            Err(_) => {
                tracing::warn!("Assistant '{}' timed out after {:?}", self.command, timeout);
                return Err(AssistantError::Timeout(timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AssistantError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(AssistantError::EmptyOutput);
        }
        Ok(stdout)
    }
}
