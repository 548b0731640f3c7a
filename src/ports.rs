//! Capabilities the cleanup engine consumes from its host.
//!
//! The engine never talks to an analyzer or the file system directly; the CLI
//! wires in the report-backed implementations and tests substitute their own.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{ActionKind, CandidateFix, Diagnostic, FileHandle, FixCommand, TextRange, WorkspaceEdit};

/// Snapshot of the diagnostics the analyzer currently knows for a file.
///
/// May be stale; asking does not trigger a new analysis.
pub trait DiagnosticsSource: Send + Sync {
    fn diagnostics(&self, file: &FileHandle) -> Vec<Diagnostic>;
}

#[async_trait]
pub trait FixProvider: Send + Sync {
    async fn candidate_fixes(
        &self,
        file: &FileHandle,
        range: TextRange,
        kind: &ActionKind,
    ) -> Result<Vec<CandidateFix>>;
}

#[async_trait]
pub trait EditApplier: Send + Sync {
    /// Returns whether the edit was applied.
    async fn apply_edit(&self, edit: &WorkspaceEdit) -> Result<bool>;

    async fn invoke_command(&self, command: &FixCommand) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub text: String,
    pub is_dirty: bool,
}

impl DocumentState {
    pub fn line_count(&self) -> u32 {
        self.text.lines().count().max(1) as u32
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn open(&self, file: &FileHandle) -> Result<DocumentState>;

    async fn save(&self, file: &FileHandle) -> Result<()>;
}

/// Everything the coordinator needs from the outside world.
#[derive(Clone)]
pub struct Host {
    pub diagnostics: Arc<dyn DiagnosticsSource>,
    pub fixes: Arc<dyn FixProvider>,
    pub edits: Arc<dyn EditApplier>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Host {
    /// Host backed by one analyzer adapter and a separate document store.
    pub fn from_parts<A>(analyzer: Arc<A>, documents: Arc<dyn DocumentStore>) -> Self
    where
        A: DiagnosticsSource + FixProvider + EditApplier + 'static,
    {
        Self {
            diagnostics: analyzer.clone(),
            fixes: analyzer.clone(),
            edits: analyzer,
            documents,
        }
    }
}
