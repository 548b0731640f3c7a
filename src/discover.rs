//! Candidate file discovery.
//!
//! Walks each project root depth-first, pruning dependency caches, VCS
//! metadata and build output, and keeps JS/TS sources.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::model::FileHandle;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

pub const SKIP_DIRECTORIES: [&str; 9] = [
    "node_modules",
    "dist",
    ".git",
    ".next",
    "out",
    ".vscode",
    "coverage",
    "build",
    ".nyc_output",
];

/// Files under `roots` with a supported extension, in traversal order.
///
/// Unreadable directories are logged and contribute nothing.
pub fn discover(roots: &[PathBuf]) -> Vec<FileHandle> {
    let mut out = Vec::new();
    for root in roots {
        out.extend(discover_in_root(root));
    }
    debug!(files = out.len(), roots = roots.len(), "discovery finished");
    out
}

fn discover_in_root(root: &Path) -> Vec<FileHandle> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|ent| ent.depth() == 0 || is_candidate_entry(ent));

    for ent in walker {
        let ent = match ent {
            Ok(ent) => ent,
            Err(err) => {
                let at = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                warn!(path = %at, error = %err, "error reading directory");
                continue;
            }
        };

        if ent.file_type().is_file() && has_supported_extension(ent.path()) {
            files.push(FileHandle::new(ent.into_path()));
        }
    }
    files
}

fn is_candidate_entry(ent: &DirEntry) -> bool {
    let name = ent.file_name().to_string_lossy();
    if name.starts_with('.') {
        // `.eslintrc.js` and friends are still sources; hidden dirs never are.
        if ent.file_type().is_dir() || !(name.ends_with(".js") || name.ends_with(".ts")) {
            return false;
        }
    }
    !SKIP_DIRECTORIES.contains(&&*name)
}

pub fn has_supported_extension(path: &Path) -> bool {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
    SUPPORTED_EXTENSIONS.contains(&ext)
}
