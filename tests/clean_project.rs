use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cleanup_buddy::config::CleanupConfig;
use cleanup_buddy::controller::{CancelFlag, CleanupController, ProgressSink, RunOutcome, RunState};
use cleanup_buddy::document::FsDocumentStore;
use cleanup_buddy::model::ProjectProgress;
use cleanup_buddy::ports::Host;
use cleanup_buddy::report::{ReportAnalyzer, sha256_hex};
use serde_json::{Value, json};
use tempfile::TempDir;

const A_TS: &str = "import z from 'z';\nconst x = 1;\nexport {};\n";

#[derive(Default)]
struct Recorder {
    visited: Vec<String>,
    outcome: Option<RunOutcome>,
}

impl ProgressSink for Recorder {
    fn report(&mut self, progress: &ProjectProgress) {
        self.visited.push(progress.current_file.clone());
    }

    fn finished(&mut self, outcome: &RunOutcome) {
        self.outcome = Some(outcome.clone());
    }
}

fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Value {
    json!({ "start": { "line": sl, "character": sc }, "end": { "line": el, "character": ec } })
}

/// Report entry for `A_TS`: an unused import cleared by organize imports and
/// an unused `x` (TS6133) with a removal quick fix.
fn a_ts_entry(path: &str, sha256: Option<String>) -> Value {
    let mut entry = json!({
        "path": path,
        "diagnostics": [
            { "code": 6133, "message": "'x' is declared but its value is never read.", "range": range(1, 6, 1, 7) }
        ],
        "actions": [
            {
                "title": "Organize Imports",
                "kind": "source.organizeImports",
                "command": {
                    "name": "cleanup.applyEdits",
                    "arguments": [ { "file": path, "edits": [ { "range": range(0, 0, 1, 0), "newText": "" } ] } ]
                }
            },
            {
                "title": "Remove unused declaration for: 'x'",
                "kind": "quickfix",
                "range": range(1, 6, 1, 7),
                "edit": [ { "range": range(1, 0, 2, 0), "newText": "" } ]
            }
        ]
    });
    if let Some(digest) = sha256 {
        entry["sha256"] = digest.into();
    }
    entry
}

fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tmp");
    let root = fs::canonicalize(dir.path()).expect("canonicalize");
    (dir, root)
}

fn write_report(root: &Path, files: Vec<Value>) -> PathBuf {
    let path = root.join("report.json");
    fs::write(&path, json!({ "files": files }).to_string()).expect("write report");
    path
}

fn controller(report: &Path) -> CleanupController {
    let documents = Arc::new(FsDocumentStore::new());
    let analyzer = ReportAnalyzer::load(report, documents.clone()).expect("load report");
    let host = Host::from_parts(Arc::new(analyzer), documents);
    CleanupController::new(host, CleanupConfig::default(), CancelFlag::new()).with_yield_delay(Duration::ZERO)
}

#[tokio::test]
async fn cleans_sources_and_skips_dependencies() {
    let (_dir, root) = project();
    fs::write(root.join("a.ts"), A_TS).expect("write");
    fs::create_dir_all(root.join("node_modules")).expect("mkdir");
    fs::write(root.join("node_modules/b.ts"), "let unused = 1;\n").expect("write");
    let report = write_report(&root, vec![a_ts_entry("a.ts", None)]);

    let mut controller = controller(&report);
    let mut sink = Recorder::default();
    let outcome = controller.run(&[root.clone()], &mut sink).await;

    assert_eq!(sink.visited, vec!["a.ts".to_string()]);
    assert_eq!(controller.state(), RunState::Completed);
    assert_eq!(
        outcome.message(),
        "Project clean-up complete ✅ (1 files modified out of 1 processed)"
    );
    assert_eq!(fs::read_to_string(root.join("a.ts")).expect("read"), "export {};\n");
    assert_eq!(
        fs::read_to_string(root.join("node_modules/b.ts")).expect("read"),
        "let unused = 1;\n"
    );
}

#[tokio::test]
async fn empty_project_reports_no_files() {
    let (_dir, root) = project();
    let report = write_report(&root, vec![]);

    let mut controller = controller(&report);
    let mut sink = Recorder::default();
    let outcome = controller.run(&[root], &mut sink).await;

    assert_eq!(outcome, RunOutcome::NoFiles);
    assert_ne!(controller.state(), RunState::Iterating);
    assert!(sink.visited.is_empty());
    assert_eq!(sink.outcome, Some(RunOutcome::NoFiles));
}

#[tokio::test]
async fn rerun_in_same_session_changes_nothing() {
    let (_dir, root) = project();
    fs::write(root.join("a.ts"), A_TS).expect("write");
    let report = write_report(&root, vec![a_ts_entry("a.ts", None)]);

    let mut controller = controller(&report);
    let first = controller.run(&[root.clone()], &mut Recorder::default()).await;
    assert_eq!(first.progress().map(|p| p.modified_files), Some(1));

    let second = controller.run(&[root.clone()], &mut Recorder::default()).await;
    assert_eq!(second.progress().map(|p| p.modified_files), Some(0));
    assert_eq!(fs::read_to_string(root.join("a.ts")).expect("read"), "export {};\n");
}

#[tokio::test]
async fn stale_report_is_ignored_on_a_later_run() {
    let (_dir, root) = project();
    fs::write(root.join("a.ts"), A_TS).expect("write");
    let report = write_report(&root, vec![a_ts_entry("a.ts", Some(sha256_hex(A_TS.as_bytes())))]);

    let first = controller(&report).run(&[root.clone()], &mut Recorder::default()).await;
    assert_eq!(first.progress().map(|p| p.modified_files), Some(1));

    // A fresh process with the same report: the digest no longer matches.
    let second = controller(&report).run(&[root.clone()], &mut Recorder::default()).await;
    assert_eq!(second.progress().map(|p| p.modified_files), Some(0));
    assert_eq!(fs::read_to_string(root.join("a.ts")).expect("read"), "export {};\n");
}

#[tokio::test]
async fn failing_file_does_not_stop_the_run() {
    let (_dir, root) = project();
    fs::write(root.join("a.ts"), A_TS).expect("write");
    let b_tsx = "function Unused() { return null; }\nexport const App = () => null;\n";
    fs::write(root.join("b.tsx"), b_tsx).expect("write");
    let b_entry = json!({
        "path": "b.tsx",
        "diagnostics": [ { "code": 6196, "range": range(0, 9, 0, 15) } ],
        "actions": [
            {
                "title": "Remove unused declaration for: 'Unused'",
                "kind": "quickfix",
                "command": { "name": "editor.unknownRefactor", "arguments": [] }
            }
        ]
    });
    let report = write_report(&root, vec![a_ts_entry("a.ts", None), b_entry]);

    let mut controller = controller(&report);
    let mut sink = Recorder::default();
    let outcome = controller.run(&[root.clone()], &mut sink).await;

    let mut visited = sink.visited.clone();
    visited.sort();
    assert_eq!(visited, vec!["a.ts".to_string(), "b.tsx".to_string()]);
    assert_eq!(outcome.progress().map(|p| (p.processed_files, p.modified_files)), Some((2, 1)));
    assert_eq!(fs::read_to_string(root.join("b.tsx")).expect("read"), b_tsx);
    assert_eq!(fs::read_to_string(root.join("a.ts")).expect("read"), "export {};\n");
}

#[tokio::test]
async fn disabled_variable_removal_keeps_declaration() {
    let (_dir, root) = project();
    fs::write(root.join("a.ts"), A_TS).expect("write");
    let report = write_report(&root, vec![a_ts_entry("a.ts", None)]);

    let documents = Arc::new(FsDocumentStore::new());
    let analyzer = ReportAnalyzer::load(&report, documents.clone()).expect("load report");
    let config = CleanupConfig {
        remove_unused_variables: false,
        ..CleanupConfig::default()
    };
    let mut controller = CleanupController::new(Host::from_parts(Arc::new(analyzer), documents), config, CancelFlag::new())
        .with_yield_delay(Duration::ZERO);
    controller.run(&[root.clone()], &mut Recorder::default()).await;

    assert_eq!(fs::read_to_string(root.join("a.ts")).expect("read"), "const x = 1;\nexport {};\n");
}
