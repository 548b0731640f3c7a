//! File-backed documents with dirty tracking.
//!
//! Analyzer edits are expressed against the text the analyzer saw (the
//! baseline). Every applied edit is logged in baseline coordinates so later
//! edits can be shifted onto the current text, and edits touching text that
//! was already rewritten are refused instead of corrupting the file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::model::{FileHandle, Position, TextEdit, WorkspaceEdit};
use crate::ports::{DocumentState, DocumentStore};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("overlapping edits in a single change to {path}")]
    OverlappingEdits { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rewrite {
    start: usize,
    end: usize,
    inserted: usize,
}

impl Rewrite {
    fn delta(&self) -> isize {
        self.inserted as isize - (self.end - self.start) as isize
    }

    fn conflicts_with(&self, start: usize, end: usize) -> bool {
        if self.start == self.end {
            let p = self.start;
            return (start < p && p < end) || (start == end && start == p);
        }
        if start == end {
            return self.start < start && start < self.end;
        }
        start < self.end && self.start < end
    }
}

#[derive(Debug, Clone)]
struct Document {
    baseline: String,
    text: String,
    dirty: bool,
    rewrites: Vec<Rewrite>,
}

impl Document {
    fn new(text: String) -> Self {
        Self {
            baseline: text.clone(),
            text,
            dirty: false,
            rewrites: Vec::new(),
        }
    }

    fn state(&self) -> DocumentState {
        DocumentState {
            text: self.text.clone(),
            is_dirty: self.dirty,
        }
    }

    /// Applies a batch of edits atomically. `Ok(false)` when any edit lands on
    /// text that an earlier edit already rewrote.
    fn apply(&mut self, path: &std::path::Path, edits: &[TextEdit]) -> Result<bool, DocumentError> {
        let mut spans: Vec<(usize, usize, &str)> = edits
            .iter()
            .map(|e| {
                let start = offset_at(&self.baseline, e.range.start);
                let end = offset_at(&self.baseline, e.range.end).max(start);
                (start, end, e.new_text.as_str())
            })
            .collect();
        spans.sort_by_key(|(start, end, _)| (*start, *end));

        if spans.windows(2).any(|w| w[0].1 > w[1].0) {
            return Err(DocumentError::OverlappingEdits {
                path: path.to_path_buf(),
            });
        }

        if spans
            .iter()
            .any(|(s, e, _)| self.rewrites.iter().any(|r| r.conflicts_with(*s, *e)))
        {
            debug!(path = %path.display(), "edit overlaps text already rewritten");
            return Ok(false);
        }

        let before = self.text.len();
        let mut changed = false;
        for (start, end, new_text) in spans.iter().rev() {
            let shift: isize = self
                .rewrites
                .iter()
                .filter(|r| r.end <= *start)
                .map(Rewrite::delta)
                .sum();
            let cur_start = (*start as isize + shift) as usize;
            let cur_end = (*end as isize + shift) as usize;
            if &self.text[cur_start..cur_end] != *new_text {
                self.text.replace_range(cur_start..cur_end, new_text);
                changed = true;
            }
        }
        for (start, end, new_text) in spans {
            self.rewrites.push(Rewrite {
                start,
                end,
                inserted: new_text.len(),
            });
        }

        if changed {
            self.dirty = true;
        }
        debug!(
            path = %path.display(),
            edits = edits.len(),
            bytes_before = before,
            bytes_after = self.text.len(),
            "applied edits"
        );
        Ok(true)
    }
}

/// Byte offset of `pos` in `text`; positions past a line or the document
/// clamp to the nearest end.
pub fn offset_at(text: &str, pos: Position) -> usize {
    let mut line_start = 0usize;
    for _ in 0..pos.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }

    let rest = &text[line_start..];
    let line = match rest.find('\n') {
        Some(i) => rest[..i].strip_suffix('\r').unwrap_or(&rest[..i]),
        None => rest,
    };

    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= pos.character {
            return line_start + idx;
        }
        units += ch.len_utf16() as u32;
    }
    line_start + line.len()
}

/// Documents loaded from disk on first use and cached for the process.
#[derive(Debug, Default)]
pub struct FsDocumentStore {
    docs: Mutex<HashMap<PathBuf, Document>>,
}

impl FsDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> MutexGuard<'_, HashMap<PathBuf, Document>> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn ensure_loaded(&self, file: &FileHandle) -> Result<(), DocumentError> {
        if self.docs().contains_key(file.path()) {
            return Ok(());
        }
        let text = tokio::fs::read_to_string(file.path())
            .await
            .map_err(|source| DocumentError::Read {
                path: file.path().to_path_buf(),
                source,
            })?;
        self.docs()
            .entry(file.path().to_path_buf())
            .or_insert_with(|| Document::new(text));
        Ok(())
    }

    pub async fn apply_edit(&self, edit: &WorkspaceEdit) -> Result<bool> {
        self.ensure_loaded(&edit.file).await?;
        let mut docs = self.docs();
        let Some(doc) = docs.get_mut(edit.file.path()) else {
            return Ok(false);
        };
        Ok(doc.apply(edit.file.path(), &edit.edits)?)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn open(&self, file: &FileHandle) -> Result<DocumentState> {
        self.ensure_loaded(file).await?;
        self.docs()
            .get(file.path())
            .map(Document::state)
            .ok_or_else(|| anyhow::anyhow!("document {} was evicted", file))
    }

    async fn save(&self, file: &FileHandle) -> Result<()> {
        let text = match self.docs().get(file.path()) {
            Some(doc) if doc.dirty => doc.text.clone(),
            _ => return Ok(()),
        };
        tokio::fs::write(file.path(), &text)
            .await
            .map_err(|source| DocumentError::Write {
                path: file.path().to_path_buf(),
                source,
            })?;
        if let Some(doc) = self.docs().get_mut(file.path()) {
            if doc.text == text {
                doc.dirty = false;
            }
        }
        debug!(file = %file, "saved");
        Ok(())
    }
}
