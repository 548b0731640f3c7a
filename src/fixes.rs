//! Cleanup rules: organize imports, diagnostic-driven removals and the
//! unused-props placeholder.
//!
//! Every rule swallows its own analyzer failures: a rule that errors is
//! logged and reported as "not modified", exactly like a rule that found
//! nothing to do.

use async_trait::async_trait;
use anyhow::Result;
use tracing::{debug, error};

use crate::config::CleanupConfig;
use crate::model::{ActionKind, CandidateFix, DiagnosticCode, FileHandle, TextRange};
use crate::ports::Host;

/// `'x' is declared but its value is never read.`
pub const UNUSED_VARIABLE_CODES: &[i64] = &[6133];
/// `All imports in import declaration are unused.` / `'x' is declared but never used.`
pub const UNUSED_FUNCTION_CODES: &[i64] = &[6192, 6196];

#[async_trait]
pub trait CleanupRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self, config: &CleanupConfig) -> bool;

    async fn apply(&self, host: &Host, file: &FileHandle) -> bool;
}

/// Rules in the order they run on each file.
pub fn default_rules() -> Vec<Box<dyn CleanupRule>> {
    vec![
        Box::new(OrganizeImports),
        Box::new(DiagnosticRule::unused_variables()),
        Box::new(DiagnosticRule::unused_functions()),
        Box::new(UnusedReactProps),
    ]
}

pub struct OrganizeImports;

#[async_trait]
impl CleanupRule for OrganizeImports {
    fn name(&self) -> &'static str {
        "organize-imports"
    }

    fn enabled(&self, _config: &CleanupConfig) -> bool {
        true
    }

    async fn apply(&self, host: &Host, file: &FileHandle) -> bool {
        organize_imports(host, file).await
    }
}

/// Applies one quick fix per diagnostic carrying one of `codes`.
pub struct DiagnosticRule {
    name: &'static str,
    codes: &'static [i64],
    toggle: fn(&CleanupConfig) -> bool,
}

impl DiagnosticRule {
    pub fn unused_variables() -> Self {
        Self {
            name: "unused-variables",
            codes: UNUSED_VARIABLE_CODES,
            toggle: |c| c.remove_unused_variables,
        }
    }

    pub fn unused_functions() -> Self {
        Self {
            name: "unused-functions",
            codes: UNUSED_FUNCTION_CODES,
            toggle: |c| c.remove_unused_functions,
        }
    }
}

#[async_trait]
impl CleanupRule for DiagnosticRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self, config: &CleanupConfig) -> bool {
        (self.toggle)(config)
    }

    async fn apply(&self, host: &Host, file: &FileHandle) -> bool {
        apply_fixes_for_codes(host, file, self.codes).await
    }
}

/// Placeholder for removing unused React component props.
///
/// Not implemented: doing this properly needs prop-usage analysis over the
/// component's syntax tree, which this tool leaves to analyzers. Always
/// reports "not modified".
pub struct UnusedReactProps;

#[async_trait]
impl CleanupRule for UnusedReactProps {
    fn name(&self) -> &'static str {
        "unused-props"
    }

    fn enabled(&self, config: &CleanupConfig) -> bool {
        config.remove_unused_props
    }

    async fn apply(&self, _host: &Host, file: &FileHandle) -> bool {
        debug!(file = %file, "unused prop removal is not implemented, skipping");
        false
    }
}

/// Fixes every diagnostic of `file` whose numeric code is in `codes`.
/// Returns whether at least one fix was applied.
pub async fn apply_fixes_for_codes(host: &Host, file: &FileHandle, codes: &[i64]) -> bool {
    match try_apply_fixes_for_codes(host, file, codes).await {
        Ok(modified) => modified,
        Err(err) => {
            error!(file = %file, error = %format!("{err:#}"), "error applying code actions");
            false
        }
    }
}

async fn try_apply_fixes_for_codes(host: &Host, file: &FileHandle, codes: &[i64]) -> Result<bool> {
    let targets: Vec<_> = host
        .diagnostics
        .diagnostics(file)
        .into_iter()
        .filter(|d| {
            d.code
                .as_ref()
                .and_then(DiagnosticCode::as_number)
                .is_some_and(|c| codes.contains(&c))
        })
        .collect();

    if targets.is_empty() {
        return Ok(false);
    }

    let mut modified = false;
    for diagnostic in &targets {
        let fixes = host
            .fixes
            .candidate_fixes(file, diagnostic.range, &ActionKind::quick_fix())
            .await?;
        let Some(fix) = select_quick_fix(&fixes) else {
            debug!(file = %file, line = diagnostic.range.start.line, "no quick fix offered");
            continue;
        };
        if apply_fix(host, fix).await? {
            debug!(file = %file, title = %fix.title, "applied quick fix");
            modified = true;
        }
    }
    Ok(modified)
}

/// Prefers a removal, then any quick fix.
pub fn select_quick_fix(fixes: &[CandidateFix]) -> Option<&CandidateFix> {
    fixes
        .iter()
        .find(|f| {
            let title = f.title.to_lowercase();
            title.contains("remove") || title.contains("delete")
        })
        .or_else(|| {
            fixes
                .iter()
                .find(|f| f.kind.as_ref().is_some_and(ActionKind::is_quick_fix))
        })
}

/// First organize-imports action in the order the analyzer offered them.
pub fn select_organize_imports(fixes: &[CandidateFix]) -> Option<&CandidateFix> {
    fixes.iter().find(|f| {
        f.kind.as_ref().is_some_and(ActionKind::is_organize_imports)
            || f.title.to_lowercase().contains("organize imports")
    })
}

/// Edit if the fix carries one, otherwise its command.
async fn apply_fix(host: &Host, fix: &CandidateFix) -> Result<bool> {
    if let Some(edit) = &fix.edit {
        return host.edits.apply_edit(edit).await;
    }
    if let Some(command) = &fix.command {
        host.edits.invoke_command(command).await?;
        return Ok(true);
    }
    Ok(false)
}

/// Runs the analyzer's organize-imports action on `file`. True only when the
/// document text actually changed, whatever the action reported.
pub async fn organize_imports(host: &Host, file: &FileHandle) -> bool {
    match try_organize_imports(host, file).await {
        Ok(modified) => modified,
        Err(err) => {
            error!(file = %file, error = %format!("{err:#}"), "error organizing imports");
            false
        }
    }
}

async fn try_organize_imports(host: &Host, file: &FileHandle) -> Result<bool> {
    let before = host.documents.open(file).await?;
    let range = TextRange::whole_document(before.line_count());
    let fixes = host
        .fixes
        .candidate_fixes(file, range, &ActionKind::organize_imports())
        .await?;

    let Some(fix) = select_organize_imports(&fixes) else {
        return Ok(false);
    };
    apply_fix(host, fix).await?;

    let after = host.documents.open(file).await?;
    Ok(after.text != before.text)
}
