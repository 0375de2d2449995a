//! Single-host task engine
//!
//! Shell tasks are written to `<work>/<name>.sh` and run with the configured
//! interpreter, stdout and stderr captured in `<work>/<name>.log`. Native
//! tasks run on the blocking pool. A semaphore bounds how many run at once.

use super::{NativeFn, RunReport, Task, TaskEngine, TaskId, TaskKind, TaskOutcome, TaskState};
use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// `tokio::time::interval` panics on a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

struct Node {
    task: Task,
    deps: Vec<TaskId>,
}

/// Runs a task graph with `tokio` on the local machine
pub struct LocalEngine {
    work_dir: PathBuf,
    shell: String,
    nodes: Vec<Node>,
    progress: bool,
}

impl LocalEngine {
    pub fn new(work_dir: impl Into<PathBuf>, shell: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            shell: shell.into(),
            nodes: Vec::new(),
            progress: false,
        }
    }

    /// Draw an indicatif bar on stderr while running
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new(self.nodes.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    }
}

async fn run_shell(shell: String, work_dir: PathBuf, name: String, script: String) -> TaskState {
    let script_path = work_dir.join(format!("{}.sh", name));
    let log_path = work_dir.join(format!("{}.log", name));

    let result: anyhow::Result<std::process::ExitStatus> = async {
        tokio::fs::write(&script_path, script)
            .await
            .with_context(|| format!("Failed to write {}", script_path.display()))?;
        let log = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create {}", log_path.display()))?;
        let log_err = log.try_clone()?;

        let status = tokio::process::Command::new(&shell)
            .arg(&script_path)
            .current_dir(&work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .await
            .with_context(|| format!("Failed to start {} {}", shell, script_path.display()))?;
        Ok(status)
    }
    .await;

    match result {
        Ok(status) if status.success() => TaskState::Succeeded,
        Ok(status) => TaskState::Failed(format!("{}; see {}", status, log_path.display())),
        Err(e) => TaskState::Failed(format!("{:#}", e)),
    }
}

async fn run_native(work: NativeFn) -> TaskState {
    match tokio::task::spawn_blocking(move || work()).await {
        Ok(Ok(())) => TaskState::Succeeded,
        Ok(Err(e)) => TaskState::Failed(format!("{:#}", e)),
        Err(e) => TaskState::Failed(format!("task panicked or was cancelled: {}", e)),
    }
}

#[async_trait]
impl TaskEngine for LocalEngine {
    fn submit(&mut self, task: Task, depends_on: &[TaskId]) -> TaskId {
        let id = TaskId(self.nodes.len());
        debug!(task = %task.name, %id, deps = depends_on.len(), "Submitted task");
        self.nodes.push(Node {
            task,
            deps: depends_on.to_vec(),
        });
        id
    }

    async fn run(
        &mut self,
        max_concurrency: usize,
        poll_interval: Duration,
    ) -> anyhow::Result<RunReport> {
        if max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be greater than 0");
        }
        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("Failed to create work dir {}", self.work_dir.display()))?;
        // Scripts run inside the work dir, so their own path must not be relative
        let work_dir = std::path::absolute(&self.work_dir)?;

        let total = self.nodes.len();
        info!(tasks = total, max_concurrency, "Starting task graph");

        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let mut states: Vec<Option<TaskState>> = vec![None; total];
        let mut elapsed: Vec<f64> = vec![0.0; total];
        let mut started = vec![false; total];
        let mut running: JoinSet<(usize, TaskState, f64)> = JoinSet::new();
        let mut ticker = interval(poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let pb = self.progress_bar();
        let run_started = Instant::now();

        loop {
            // Submission order is a topological order: dependencies always
            // have smaller ids, so one forward pass settles skips.
            for idx in 0..total {
                if started[idx] || states[idx].is_some() {
                    continue;
                }
                let deps = &self.nodes[idx].deps;
                let blocked = deps.iter().any(|d| match states.get(d.0) {
                    Some(Some(state)) => !state.is_success(),
                    Some(None) => false,
                    None => true,
                });
                if blocked {
                    warn!(task = %self.nodes[idx].task.name, "Skipping task; a dependency did not succeed");
                    states[idx] = Some(TaskState::Skipped);
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    continue;
                }

                let ready = deps
                    .iter()
                    .all(|d| states.get(d.0).is_some_and(|s| s.as_ref().is_some_and(TaskState::is_success)));
                if !ready {
                    continue;
                }

                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    break;
                };
                started[idx] = true;

                let task = self.nodes[idx].task.clone();
                let shell = self.shell.clone();
                let work_dir = work_dir.clone();
                debug!(task = %task.name, "Starting task");
                running.spawn(async move {
                    let _permit = permit;
                    let t0 = Instant::now();
                    let state = match task.kind {
                        TaskKind::Shell(script) => run_shell(shell, work_dir, task.name, script).await,
                        TaskKind::Native(work) => run_native(work).await,
                    };
                    (idx, state, t0.elapsed().as_secs_f64())
                });
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                joined = running.join_next() => {
                    let Some(joined) = joined else { continue };
                    let (idx, state, secs) = joined.context("Task runner failed")?;
                    let name = &self.nodes[idx].task.name;
                    match &state {
                        TaskState::Failed(reason) => error!(task = %name, %reason, "Task failed"),
                        _ => info!(task = %name, elapsed_secs = secs, "Task finished"),
                    }
                    if let Some(pb) = &pb {
                        pb.inc(1);
                        pb.set_message(name.clone());
                    }
                    states[idx] = Some(state);
                    elapsed[idx] = secs;
                }
                _ = ticker.tick() => {
                    let done = states.iter().filter(|s| s.is_some()).count();
                    info!(
                        done,
                        running = running.len(),
                        total,
                        elapsed_secs = run_started.elapsed().as_secs(),
                        "Task graph progress"
                    );
                }
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let tasks: Vec<TaskOutcome> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| TaskOutcome {
                id: TaskId(idx),
                name: node.task.name.clone(),
                state: states[idx].clone().unwrap_or(TaskState::Skipped),
                elapsed_secs: elapsed[idx],
            })
            .collect();
        let report = RunReport { tasks };

        let (ok, failed, skipped) = report.counts();
        info!(succeeded = ok, failed, skipped, "Task graph finished");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dependencies_and_skips() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::new(dir.path(), "sh");

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let ok = engine.submit(
            Task::native("ok", move || {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            &[],
        );
        let bad = engine.submit(Task::native("bad", || anyhow::bail!("no database")), &[]);
        let after_ok = engine.submit(Task::native("after_ok", || Ok(())), &[ok]);
        let after_bad = engine.submit(Task::native("after_bad", || Ok(())), &[bad]);
        let transitive = engine.submit(Task::native("transitive", || Ok(())), &[after_bad, ok]);

        let report = engine.run(2, Duration::from_millis(50)).await.unwrap();

        assert!(report.succeeded(ok));
        assert!(report.succeeded(after_ok));
        assert_eq!(report.state(bad), Some(&TaskState::Failed("no database".into())));
        assert_eq!(report.state(after_bad), Some(&TaskState::Skipped));
        assert_eq!(report.state(transitive), Some(&TaskState::Skipped));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_poll_interval() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::new(dir.path(), "sh");
        let id = engine.submit(Task::native("noop", || Ok(())), &[]);

        let report = engine.run(1, Duration::ZERO).await.unwrap();
        assert!(report.succeeded(id));
    }

    #[tokio::test]
    async fn test_shell_task_writes_script_and_log() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("hello.txt");
        let mut engine = LocalEngine::new(dir.path(), "sh");
        let id = engine.submit(
            Task::shell("hello", format!("echo hello > '{}'\necho logged\n", out.display())),
            &[],
        );
        let fail = engine.submit(Task::shell("fail", "exit 3\n"), &[]);

        let report = engine.run(4, Duration::from_secs(1)).await.unwrap();

        assert!(report.succeeded(id));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
        assert!(dir.path().join("hello.sh").is_file());
        assert_eq!(std::fs::read_to_string(dir.path().join("hello.log")).unwrap(), "logged\n");
        assert!(matches!(report.state(fail), Some(TaskState::Failed(_))));
    }

    #[tokio::test]
    async fn test_expand_parallel_respects_concurrency() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::new(dir.path(), "sh");
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..8).collect();
        let ids = engine.expand_parallel(
            |i| {
                let active = active.clone();
                let peak = peak.clone();
                Task::native(format!("item_{}", i), move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            },
            &items,
        );

        let report = engine.run(3, Duration::from_millis(10)).await.unwrap();
        assert_eq!(ids.len(), 8);
        assert!(report.all_succeeded());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::new(dir.path(), "sh");
        assert!(engine.run(0, Duration::from_secs(1)).await.is_err());
    }
}
