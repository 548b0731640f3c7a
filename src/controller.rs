//! Project-wide cleanup run: discovery, per-file cleanup, progress and
//! cooperative cancellation.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::cleanup::CleanupCoordinator;
use crate::config::CleanupConfig;
use crate::discover::discover;
use crate::model::{FileHandle, ProjectProgress};
use crate::ports::Host;

/// Cancellation request shared between the run and whoever may stop it.
/// Only observed between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where a run is. `Cancelled`, `Completed`, `NoProject` and `NoFiles` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Discovering,
    Iterating,
    Cancelled,
    Completed,
    NoProject,
    NoFiles,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::NoProject | Self::NoFiles)
    }
}

/// How a run ended. `NoProject` and `NoFiles` end the run before any file
/// is visited and are neither failures nor completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoProject,
    NoFiles,
    Cancelled(ProjectProgress),
    Completed(ProjectProgress),
}

impl RunOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::NoProject => "No workspace folder is open.".to_string(),
            Self::NoFiles => "No JavaScript/TypeScript files found in the workspace.".to_string(),
            Self::Cancelled(_) => "Project cleanup was cancelled.".to_string(),
            Self::Completed(p) => format!(
                "Project clean-up complete ✅ ({} files modified out of {} processed)",
                p.modified_files, p.total_files
            ),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::NoProject)
    }

    pub fn progress(&self) -> Option<&ProjectProgress> {
        match self {
            Self::Cancelled(p) | Self::Completed(p) => Some(p),
            Self::NoProject | Self::NoFiles => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoProject => "no_project",
            Self::NoFiles => "no_files",
            Self::Cancelled(_) => "cancelled",
            Self::Completed(_) => "completed",
        }
    }
}

/// Receives progress updates and the terminal message of a run.
pub trait ProgressSink {
    fn started(&mut self, _total_files: usize) {}

    fn report(&mut self, progress: &ProjectProgress);

    fn finished(&mut self, outcome: &RunOutcome);
}

pub struct CleanupController {
    coordinator: CleanupCoordinator,
    cancel: CancelFlag,
    yield_delay: Duration,
    state: RunState,
}

impl CleanupController {
    pub fn new(host: Host, config: CleanupConfig, cancel: CancelFlag) -> Self {
        Self {
            coordinator: CleanupCoordinator::new(host, config),
            cancel,
            yield_delay: Duration::from_millis(10),
            state: RunState::NotStarted,
        }
    }

    /// Pause after each file; zero only yields to the scheduler.
    pub fn with_yield_delay(mut self, delay: Duration) -> Self {
        self.yield_delay = delay;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub async fn run<S>(&mut self, roots: &[PathBuf], sink: &mut S) -> RunOutcome
    where
        S: ProgressSink + ?Sized,
    {
        info!(roots = roots.len(), config = ?self.coordinator.config(), "starting project cleanup");
        let outcome = self.run_inner(roots, sink).await;
        info!(outcome = outcome.kind(), state = ?self.state, "project cleanup finished");
        sink.finished(&outcome);
        outcome
    }

    async fn run_inner<S>(&mut self, roots: &[PathBuf], sink: &mut S) -> RunOutcome
    where
        S: ProgressSink + ?Sized,
    {
        let Some(base) = roots.first() else {
            self.transition(RunState::NoProject);
            return RunOutcome::NoProject;
        };

        self.transition(RunState::Discovering);
        let files = discover(roots);
        if files.is_empty() {
            self.transition(RunState::NoFiles);
            return RunOutcome::NoFiles;
        }

        self.transition(RunState::Iterating);
        let mut progress = ProjectProgress::new(files.len());
        sink.started(files.len());

        for file in &files {
            if self.cancel.is_cancelled() {
                self.transition(RunState::Cancelled);
                return RunOutcome::Cancelled(progress);
            }

            progress.current_file = relative_display(base, file);
            progress.processed_files += 1;
            sink.report(&progress);

            if self.coordinator.cleanup_file(file).await {
                progress.modified_files += 1;
            }

            self.pause().await;
        }

        self.transition(RunState::Completed);
        RunOutcome::Completed(progress)
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    async fn pause(&self) {
        if self.yield_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.yield_delay).await;
        }
    }
}

/// `file` relative to `base`, climbing with `..` for files under other roots.
fn relative_display(base: &Path, file: &FileHandle) -> String {
    let path = file.path();
    if let Ok(rel) = path.strip_prefix(base) {
        return rel.display().to_string();
    }

    let base_parts: Vec<Component> = base.components().collect();
    let path_parts: Vec<Component> = path.components().collect();
    let common = base_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();
    // Different prefixes (e.g. drives) have no relative form.
    if common == 0 {
        return path.display().to_string();
    }

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    rel.display().to_string()
}
