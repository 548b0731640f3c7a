//! In-memory doubles for the host ports, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::document::offset_at;
use crate::model::{
    ActionKind, CandidateFix, Diagnostic, DiagnosticCode, FileHandle, FixCommand, Position, TextEdit, TextRange,
    WorkspaceEdit,
};
use crate::ports::{DiagnosticsSource, DocumentState, DocumentStore, EditApplier, FixProvider, Host};

pub fn range(line: u32, start: u32, end: u32) -> TextRange {
    TextRange::new(Position::new(line, start), Position::new(line, end))
}

pub fn fix_with_edit(title: &str, file: &FileHandle, at: TextRange, new_text: &str) -> CandidateFix {
    CandidateFix {
        title: title.to_string(),
        kind: Some(ActionKind::quick_fix()),
        edit: Some(WorkspaceEdit {
            file: file.clone(),
            edits: vec![TextEdit {
                range: at,
                new_text: new_text.to_string(),
            }],
        }),
        command: None,
    }
}

#[derive(Default)]
pub struct MemoryDocuments {
    docs: Mutex<HashMap<PathBuf, DocumentState>>,
    saves: Mutex<Vec<FileHandle>>,
    failing_saves: Mutex<HashSet<PathBuf>>,
}

impl MemoryDocuments {
    pub fn insert(&self, file: &FileHandle, text: &str) {
        self.docs.lock().expect("lock").insert(
            file.path().to_path_buf(),
            DocumentState {
                text: text.to_string(),
                is_dirty: false,
            },
        );
    }

    pub fn text(&self, file: &FileHandle) -> String {
        self.docs.lock().expect("lock")[file.path()].text.clone()
    }

    pub fn saves(&self) -> Vec<FileHandle> {
        self.saves.lock().expect("lock").clone()
    }

    pub fn fail_saves_for(&self, file: &FileHandle) {
        self.failing_saves
            .lock()
            .expect("lock")
            .insert(file.path().to_path_buf());
    }

    /// Applies edits against the current text, last edit first.
    fn edit(&self, edit: &WorkspaceEdit) -> bool {
        let mut docs = self.docs.lock().expect("lock");
        let Some(doc) = docs.get_mut(edit.file.path()) else {
            return false;
        };
        let mut spans: Vec<_> = edit
            .edits
            .iter()
            .map(|e| {
                (
                    offset_at(&doc.text, e.range.start),
                    offset_at(&doc.text, e.range.end),
                    e.new_text.clone(),
                )
            })
            .collect();
        spans.sort_by_key(|(s, _, _)| *s);
        let before = doc.text.clone();
        for (s, e, t) in spans.into_iter().rev() {
            doc.text.replace_range(s..e, &t);
        }
        if doc.text != before {
            doc.is_dirty = true;
        }
        true
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn open(&self, file: &FileHandle) -> Result<DocumentState> {
        self.docs
            .lock()
            .expect("lock")
            .get(file.path())
            .cloned()
            .ok_or_else(|| anyhow!("no document {file}"))
    }

    async fn save(&self, file: &FileHandle) -> Result<()> {
        if self.failing_saves.lock().expect("lock").contains(file.path()) {
            return Err(anyhow!("disk full"));
        }
        if let Some(doc) = self.docs.lock().expect("lock").get_mut(file.path()) {
            doc.is_dirty = false;
        }
        self.saves.lock().expect("lock").push(file.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAnalyzer {
    pub docs: Arc<MemoryDocuments>,
    diagnostics: Mutex<HashMap<PathBuf, Vec<Diagnostic>>>,
    fixes: Mutex<Vec<(PathBuf, Option<TextRange>, CandidateFix)>>,
    failing: Mutex<HashSet<PathBuf>>,
    queries: Mutex<Vec<(FileHandle, TextRange, ActionKind)>>,
    commands: Mutex<Vec<FixCommand>>,
}

impl FakeAnalyzer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn host(self: &Arc<Self>) -> Host {
        Host::from_parts(self.clone(), self.docs.clone())
    }

    pub fn file(&self, name: &str, text: &str) -> FileHandle {
        self.file_at(&PathBuf::from("/project").join(name), text)
    }

    pub fn file_at(&self, path: &Path, text: &str) -> FileHandle {
        let file = FileHandle::new(path);
        self.docs.insert(&file, text);
        file
    }

    pub fn diagnostic(&self, file: &FileHandle, code: Option<i64>, at: TextRange) {
        self.push_diagnostic(file, code.map(DiagnosticCode::Number), at);
    }

    pub fn diagnostic_text(&self, file: &FileHandle, code: &str, at: TextRange) {
        self.push_diagnostic(file, Some(DiagnosticCode::Text(code.to_string())), at);
    }

    fn push_diagnostic(&self, file: &FileHandle, code: Option<DiagnosticCode>, at: TextRange) {
        self.diagnostics
            .lock()
            .expect("lock")
            .entry(file.path().to_path_buf())
            .or_default()
            .push(Diagnostic {
                code,
                range: at,
                message: String::new(),
            });
    }

    pub fn clear_diagnostics(&self, file: &FileHandle) {
        self.diagnostics.lock().expect("lock").remove(file.path());
    }

    pub fn fix(&self, file: &FileHandle, at: Option<TextRange>, fix: CandidateFix) {
        self.fixes
            .lock()
            .expect("lock")
            .push((file.path().to_path_buf(), at, fix));
    }

    pub fn fail_queries_for(&self, file: &FileHandle) {
        self.failing.lock().expect("lock").insert(file.path().to_path_buf());
    }

    pub fn queries(&self) -> Vec<(FileHandle, TextRange, ActionKind)> {
        self.queries.lock().expect("lock").clone()
    }

    pub fn commands(&self) -> Vec<FixCommand> {
        self.commands.lock().expect("lock").clone()
    }
}

impl DiagnosticsSource for FakeAnalyzer {
    fn diagnostics(&self, file: &FileHandle) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .expect("lock")
            .get(file.path())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FixProvider for FakeAnalyzer {
    async fn candidate_fixes(
        &self,
        file: &FileHandle,
        range: TextRange,
        kind: &ActionKind,
    ) -> Result<Vec<CandidateFix>> {
        self.queries
            .lock()
            .expect("lock")
            .push((file.clone(), range, kind.clone()));
        if self.failing.lock().expect("lock").contains(file.path()) {
            return Err(anyhow!("analyzer crashed on {file}"));
        }
        Ok(self
            .fixes
            .lock()
            .expect("lock")
            .iter()
            .filter(|(path, _, _)| path == file.path())
            .filter(|(_, at, fix)| {
                let kind_ok = match &fix.kind {
                    Some(k) => kind.contains(k),
                    None => kind.is_quick_fix(),
                };
                kind_ok && at.is_none_or(|r| r.intersects(&range))
            })
            .map(|(_, _, fix)| fix.clone())
            .collect())
    }
}

#[async_trait]
impl EditApplier for FakeAnalyzer {
    async fn apply_edit(&self, edit: &WorkspaceEdit) -> Result<bool> {
        Ok(self.docs.edit(edit))
    }

    async fn invoke_command(&self, command: &FixCommand) -> Result<serde_json::Value> {
        self.commands.lock().expect("lock").push(command.clone());
        Ok(serde_json::Value::Null)
    }
}
