//! Result of one build invocation: overall status, per-task outcomes and output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use kfix_util::errors::FixtureError;

/// Overall status reported by the build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Failure,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "succeeded"),
            BuildStatus::Failure => write!(f, "failed"),
        }
    }
}

/// Outcome of a single task within a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    /// Executed and completed successfully.
    Success,
    Failed,
    #[serde(alias = "UP-TO-DATE")]
    UpToDate,
    Skipped,
    #[serde(alias = "FROM-CACHE")]
    FromCache,
    #[serde(alias = "NO-SOURCE")]
    NoSource,
}

impl TaskOutcome {
    /// Parse the label printed after a task path on the plain console.
    ///
    /// A task line without a label means the task executed successfully.
    pub fn from_console_label(label: Option<&str>) -> Option<Self> {
        match label.map(str::trim) {
            None | Some("") => Some(TaskOutcome::Success),
            Some("FAILED") => Some(TaskOutcome::Failed),
            Some("UP-TO-DATE") => Some(TaskOutcome::UpToDate),
            Some("SKIPPED") => Some(TaskOutcome::Skipped),
            Some("FROM-CACHE") => Some(TaskOutcome::FromCache),
            Some("NO-SOURCE") => Some(TaskOutcome::NoSource),
            Some(_) => None,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskOutcome::Success => "SUCCESS",
            TaskOutcome::Failed => "FAILED",
            TaskOutcome::UpToDate => "UP_TO_DATE",
            TaskOutcome::Skipped => "SKIPPED",
            TaskOutcome::FromCache => "FROM_CACHE",
            TaskOutcome::NoSource => "NO_SOURCE",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TaskOutcome {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUCCESS" => Ok(TaskOutcome::Success),
            "FAILED" => Ok(TaskOutcome::Failed),
            "UP_TO_DATE" => Ok(TaskOutcome::UpToDate),
            "SKIPPED" => Ok(TaskOutcome::Skipped),
            "FROM_CACHE" => Ok(TaskOutcome::FromCache),
            "NO_SOURCE" => Ok(TaskOutcome::NoSource),
            _ => Err(FixtureError::Generic {
                message: format!("Unknown task outcome: {s}"),
            }),
        }
    }
}

/// A task that ran as part of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTask {
    /// Full task path, e.g. `:compileKotlin` or `:sub:jar`.
    pub path: String,
    pub outcome: TaskOutcome,
}

/// Everything observable about one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub status: BuildStatus,
    /// Tasks in the order they were reported.
    pub tasks: Vec<BuildTask>,
    /// Combined stdout and stderr of the build.
    pub output: String,
}

impl BuildResult {
    /// Build a result from raw process output, parsing task lines from it.
    pub fn from_output(status: BuildStatus, output: String) -> Self {
        let tasks = parse_tasks(&output);
        Self {
            status,
            tasks,
            output,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Success
    }

    /// The task with the given path, if it ran.
    pub fn task(&self, path: &str) -> Option<&BuildTask> {
        self.tasks.iter().rev().find(|t| t.path == path)
    }

    /// Outcome of the task with the given path, if it ran.
    pub fn outcome_of(&self, path: &str) -> Option<TaskOutcome> {
        self.task(path).map(|t| t.outcome)
    }

    /// Paths of all tasks with the given outcome.
    pub fn task_paths(&self, outcome: TaskOutcome) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.outcome == outcome)
            .map(|t| t.path.as_str())
            .collect()
    }
}

/// Extract `> Task :path [LABEL]` lines from plain console output.
pub fn parse_tasks(output: &str) -> Vec<BuildTask> {
    let mut tasks = Vec::new();

    for line in output.lines() {
        let Some(rest) = line.trim().strip_prefix("> Task ") else {
            continue;
        };
        let mut parts = rest.splitn(2, char::is_whitespace);
        let Some(path) = parts.next().filter(|p| p.starts_with(':')) else {
            continue;
        };
        let label = parts.next();
        match TaskOutcome::from_console_label(label) {
            Some(outcome) => tasks.push(BuildTask {
                path: path.to_string(),
                outcome,
            }),
            None => tracing::debug!("Ignoring task line with unknown label: {line}"),
        }
    }

    tasks
}
