//! Analyzer adapter backed by a JSON analysis report.
//!
//! An external analyzer (e.g. a TypeScript language server export) records,
//! per file, the diagnostics it found and the code actions it offers. This
//! adapter serves them through the diagnostics/fix/edit ports; it never looks
//! at source syntax itself.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::FsDocumentStore;
use crate::model::{
    ActionKind, CandidateFix, Diagnostic, FileHandle, FixCommand, TextEdit, TextRange, WorkspaceEdit,
};
use crate::ports::{DiagnosticsSource, EditApplier, FixProvider};

/// Command whose arguments are `{ "file": ..., "edits": [...] }` objects.
pub const APPLY_EDITS_COMMAND: &str = "cleanup.applyEdits";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed reading report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing report {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported command `{0}`")]
    UnsupportedCommand(String),

    #[error("malformed arguments for `{name}`: {source}")]
    CommandArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    path: PathBuf,
    sha256: Option<String>,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    title: String,
    kind: Option<ActionKind>,
    range: Option<TextRange>,
    edit: Option<Vec<TextEdit>>,
    command: Option<FixCommand>,
}

#[derive(Debug, Deserialize)]
struct ApplyEditsArgs {
    file: PathBuf,
    edits: Vec<TextEdit>,
}

#[derive(Debug, Clone)]
struct Action {
    range: Option<TextRange>,
    fix: CandidateFix,
}

#[derive(Debug, Clone, Default)]
struct FileEntry {
    diagnostics: Vec<Diagnostic>,
    actions: Vec<Action>,
}

#[derive(Debug)]
pub struct ReportAnalyzer {
    base: PathBuf,
    files: HashMap<PathBuf, FileEntry>,
    documents: Arc<FsDocumentStore>,
}

impl ReportAnalyzer {
    pub fn load(path: &Path, documents: Arc<FsDocumentStore>) -> Result<Self, ReportError> {
        let raw = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::parse(&raw, &base, documents).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a report whose relative paths are anchored at `base`.
    pub fn parse(
        raw: &str,
        base: &Path,
        documents: Arc<FsDocumentStore>,
    ) -> Result<Self, serde_json::Error> {
        let report: RawReport = serde_json::from_str(raw)?;
        let mut analyzer = Self {
            base: base.to_path_buf(),
            files: HashMap::new(),
            documents,
        };

        for file in report.files {
            let Some(path) = analyzer.resolve(&file.path) else {
                warn!(path = %file.path.display(), "report references a missing file");
                continue;
            };
            if let Some(expected) = &file.sha256 {
                if !matches_digest(&path, expected) {
                    warn!(path = %path.display(), "file changed since analysis, ignoring its report entry");
                    continue;
                }
            }

            let handle = FileHandle::new(&path);
            let actions: Vec<Action> = file
                .actions
                .into_iter()
                .map(|a| Action {
                    range: a.range,
                    fix: CandidateFix {
                        title: a.title,
                        kind: a.kind,
                        edit: a.edit.map(|edits| WorkspaceEdit {
                            file: handle.clone(),
                            edits,
                        }),
                        command: a.command,
                    },
                })
                .collect();

            let entry = analyzer.files.entry(path).or_default();
            entry.diagnostics.extend(file.diagnostics);
            entry.actions.extend(actions);
        }

        debug!(files = analyzer.files.len(), "loaded analysis report");
        Ok(analyzer)
    }

    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };
        fs::canonicalize(joined).ok()
    }

    fn entry(&self, file: &FileHandle) -> Option<&FileEntry> {
        self.files.get(file.path()).or_else(|| {
            fs::canonicalize(file.path())
                .ok()
                .and_then(|p| self.files.get(&p))
        })
    }
}

fn matches_digest(path: &Path, expected: &str) -> bool {
    match fs::read(path) {
        Ok(bytes) => sha256_hex(&bytes).eq_ignore_ascii_case(expected.trim()),
        Err(_) => false,
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl DiagnosticsSource for ReportAnalyzer {
    fn diagnostics(&self, file: &FileHandle) -> Vec<Diagnostic> {
        self.entry(file)
            .map(|e| e.diagnostics.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FixProvider for ReportAnalyzer {
    async fn candidate_fixes(
        &self,
        file: &FileHandle,
        range: TextRange,
        kind: &ActionKind,
    ) -> Result<Vec<CandidateFix>> {
        let Some(entry) = self.entry(file) else {
            return Ok(Vec::new());
        };

        let fixes = entry
            .actions
            .iter()
            .filter(|a| match &a.fix.kind {
                Some(k) => kind.contains(k),
                // Untyped actions only ever show up as quick fixes.
                None => kind.is_quick_fix(),
            })
            .filter(|a| a.range.is_none_or(|r| r.intersects(&range)))
            .map(|a| a.fix.clone())
            .collect();
        Ok(fixes)
    }
}

#[async_trait]
impl EditApplier for ReportAnalyzer {
    async fn apply_edit(&self, edit: &WorkspaceEdit) -> Result<bool> {
        self.documents.apply_edit(edit).await
    }

    async fn invoke_command(&self, command: &FixCommand) -> Result<serde_json::Value> {
        if command.name != APPLY_EDITS_COMMAND {
            return Err(ReportError::UnsupportedCommand(command.name.clone()).into());
        }

        let mut applied = false;
        for arg in &command.arguments {
            let args: ApplyEditsArgs =
                serde_json::from_value(arg.clone()).map_err(|source| ReportError::CommandArguments {
                    name: command.name.clone(),
                    source,
                })?;
            let path = self.resolve(&args.file).unwrap_or_else(|| self.base.join(&args.file));
            let edit = WorkspaceEdit {
                file: FileHandle::new(path),
                edits: args.edits,
            };
            applied |= self.documents.apply_edit(&edit).await?;
        }
        Ok(serde_json::json!({ "applied": applied }))
    }
}
