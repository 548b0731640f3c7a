use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Human,
    Ai,
}

/// Reference to a source file picked up by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Zero-based position; `character` counts UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering every line of a document with `line_count` lines.
    pub const fn whole_document(line_count: u32) -> Self {
        Self::new(Position::new(0, 0), Position::new(line_count, 0))
    }

    pub fn intersects(&self, other: &TextRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Classification code as reported by the analyzer. Only numeric codes
/// take part in fix matching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticCode {
    Number(i64),
    Text(String),
}

impl DiagnosticCode {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Diagnostic {
    pub code: Option<DiagnosticCode>,
    pub range: TextRange,
    #[serde(default)]
    pub message: String,
}

/// Hierarchical, dot-separated action kind (`quickfix`, `source.organizeImports`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ActionKind(String);

impl ActionKind {
    pub const QUICK_FIX: &'static str = "quickfix";
    pub const ORGANIZE_IMPORTS: &'static str = "source.organizeImports";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn quick_fix() -> Self {
        Self::new(Self::QUICK_FIX)
    }

    pub fn organize_imports() -> Self {
        Self::new(Self::ORGANIZE_IMPORTS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `quickfix` contains `quickfix` and `quickfix.remove`, not `quickfixes`.
    pub fn contains(&self, other: &ActionKind) -> bool {
        other.0 == self.0
            || other
                .0
                .strip_prefix(self.0.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }

    pub fn is_quick_fix(&self) -> bool {
        Self::quick_fix().contains(self)
    }

    pub fn is_organize_imports(&self) -> bool {
        Self::organize_imports().contains(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextEdit {
    pub range: TextRange,
    #[serde(rename = "newText")]
    pub new_text: String,
}

/// Edits against a single file, expressed in the coordinates of the text
/// the analyzer saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEdit {
    pub file: FileHandle,
    pub edits: Vec<TextEdit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixCommand {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFix {
    pub title: String,
    pub kind: Option<ActionKind>,
    pub edit: Option<WorkspaceEdit>,
    pub command: Option<FixCommand>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectProgress {
    pub total_files: usize,
    pub processed_files: usize,
    pub modified_files: usize,
    pub current_file: String,
}

impl ProjectProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    pub fn percentage(&self) -> u32 {
        if self.total_files == 0 {
            return 0;
        }
        ((self.processed_files as f64 / self.total_files as f64) * 100.0).round() as u32
    }
}
