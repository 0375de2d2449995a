//! Task graph execution
//!
//! The pipeline describes its work as a graph of tasks and hands it to a
//! [`TaskEngine`]. Shell tasks run a generated script; native tasks run a
//! closure in-process. A task whose dependency did not succeed is never
//! started and ends as [`TaskState::Skipped`].

pub mod local;

pub use local::LocalEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// In-process work
pub type NativeFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum TaskKind {
    /// Script body written to `<work>/<name>.sh`
    Shell(String),
    Native(NativeFn),
}

/// A unit of work; `name` is unique within a graph and file-system safe
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn shell(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Shell(script.into()),
        }
    }

    pub fn native<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: TaskKind::Native(Arc::new(work)),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TaskKind::Shell(_) => "shell",
            TaskKind::Native(_) => "native",
        };
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// Terminal state of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum TaskState {
    Succeeded,
    Failed(String),
    Skipped,
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Succeeded => "succeeded",
            TaskState::Failed(_) => "failed",
            TaskState::Skipped => "skipped",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Succeeded)
    }
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub name: String,
    #[serde(flatten)]
    pub state: TaskState,
    pub elapsed_secs: f64,
}

/// Terminal states of every task in a graph, in submission order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub tasks: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn outcome(&self, id: TaskId) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn state(&self, id: TaskId) -> Option<&TaskState> {
        self.outcome(id).map(|t| &t.state)
    }

    pub fn succeeded(&self, id: TaskId) -> bool {
        self.state(id).is_some_and(TaskState::is_success)
    }

    pub fn by_name(&self, name: &str) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn all_succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state.is_success())
    }

    /// `(succeeded, failed, skipped)`
    pub fn counts(&self) -> (usize, usize, usize) {
        self.tasks.iter().fold((0, 0, 0), |(ok, failed, skipped), t| match t.state {
            TaskState::Succeeded => (ok + 1, failed, skipped),
            TaskState::Failed(_) => (ok, failed + 1, skipped),
            TaskState::Skipped => (ok, failed, skipped + 1),
        })
    }
}

/// Executes a dependency graph of tasks
#[async_trait]
pub trait TaskEngine: Send {
    /// Add a task that starts once every task in `depends_on` succeeded
    fn submit(&mut self, task: Task, depends_on: &[TaskId]) -> TaskId;

    /// One independent task per item
    fn expand_parallel<T, F>(&mut self, template: F, over: &[T]) -> Vec<TaskId>
    where
        Self: Sized,
        F: Fn(&T) -> Task,
    {
        over.iter().map(|item| self.submit(template(item), &[])).collect()
    }

    /// Run the graph to completion
    async fn run(
        &mut self,
        max_concurrency: usize,
        poll_interval: Duration,
    ) -> anyhow::Result<RunReport>;
}
