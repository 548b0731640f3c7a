use std::io::{self, IsTerminal, Write};
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Deserialize;
use tracing::warn;

use crate::config::EffectiveConfig;
use crate::controller::{ProgressSink, RunOutcome};
use crate::model::{FileHandle, OutputFormat, ProjectProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPolicy {
    Auto,
    Always,
    Never,
}

impl ColorPolicy {
    pub fn enabled(self) -> bool {
        self.enabled_with(io::stdout().is_terminal(), |key| std::env::var(key).ok())
    }

    pub fn enabled_with<F>(self, stdout_is_tty: bool, env: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Always => return true,
            Self::Never => return false,
            Self::Auto => {}
        }

        if env("NO_COLOR").is_some() {
            return false;
        }
        if env("CLICOLOR").as_deref() == Some("0") || env("TERM").as_deref() == Some("dumb") {
            return false;
        }
        if env("CLICOLOR_FORCE").as_deref() == Some("1") || env("FORCE_COLOR").as_deref() == Some("1") {
            return true;
        }
        stdout_is_tty
    }
}

/// The sink a `clean` run reports to, picked from the output format.
pub fn sink_for(cfg: &EffectiveConfig) -> Box<dyn ProgressSink> {
    match cfg.format {
        OutputFormat::Ai => Box::new(AiSink::new(io::stdout())),
        OutputFormat::Human => Box::new(HumanSink::new(
            io::stdout(),
            cfg.color.enabled(),
            ProgressDrawTarget::stderr(),
        )),
    }
}

/// Progress bar on stderr, terminal message on `out`.
pub struct HumanSink<W: Write> {
    out: W,
    color: bool,
    target: Option<ProgressDrawTarget>,
    bar: Option<ProgressBar>,
}

impl<W: Write> HumanSink<W> {
    pub fn new(out: W, color: bool, target: ProgressDrawTarget) -> Self {
        Self {
            out,
            color,
            target: Some(target),
            bar: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn bar_style() -> ProgressStyle {
    match ProgressStyle::with_template("Cleaning project code... [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}") {
        Ok(style) => style.progress_chars("=>-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

impl<W: Write> ProgressSink for HumanSink<W> {
    fn started(&mut self, total_files: usize) {
        let target = self.target.take().unwrap_or_else(ProgressDrawTarget::hidden);
        let bar = ProgressBar::with_draw_target(Some(total_files as u64), target);
        bar.set_style(bar_style());
        self.bar = Some(bar);
    }

    fn report(&mut self, progress: &ProjectProgress) {
        if let Some(bar) = &self.bar {
            bar.set_position(progress.processed_files as u64);
            bar.set_message(format!("Processing {}", progress.current_file));
        }
    }

    fn finished(&mut self, outcome: &RunOutcome) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        let message = outcome.message();
        let line = match (self.color, outcome) {
            (false, _) => message,
            (true, RunOutcome::NoProject) => message.yellow().to_string(),
            (true, RunOutcome::Completed(_)) => message.green().to_string(),
            (true, RunOutcome::Cancelled(_)) => message.bold().to_string(),
            (true, RunOutcome::NoFiles) => message.cyan().to_string(),
        };
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(error = %err, "failed writing run summary");
        }
    }
}

/// One JSON object per line: `"e":"p"` for progress, `"e":"done"` for the
/// outcome.
pub struct AiSink<W: Write> {
    out: W,
}

impl<W: Write> AiSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) {
        if let Err(err) = writeln!(self.out, "{value}") {
            warn!(error = %err, "failed writing progress line");
        }
    }
}

impl<W: Write> ProgressSink for AiSink<W> {
    fn report(&mut self, progress: &ProjectProgress) {
        self.emit(serde_json::json!({
            "e": "p",
            "n": progress.total_files,
            "i": progress.processed_files,
            "m": progress.modified_files,
            "f": progress.current_file,
            "pct": progress.percentage(),
        }));
    }

    fn finished(&mut self, outcome: &RunOutcome) {
        let mut line = serde_json::json!({
            "e": "done",
            "o": outcome.kind(),
            "msg": outcome.message(),
        });
        if let Some(p) = outcome.progress() {
            line["n"] = p.total_files.into();
            line["i"] = p.processed_files.into();
            line["m"] = p.modified_files.into();
        }
        self.emit(line);
    }
}

/// Prints the candidate list for `files`, relative to `base`.
pub fn print_files<W: Write>(out: &mut W, files: &[FileHandle], base: &Path, cfg: &EffectiveConfig) -> Result<()> {
    let color = matches!(cfg.format, OutputFormat::Human) && cfg.color.enabled();
    for file in files {
        let rel = file.path().strip_prefix(base).unwrap_or(file.path()).display().to_string();
        match cfg.format {
            OutputFormat::Ai => writeln!(out, "{}", serde_json::json!({ "f": rel }))?,
            OutputFormat::Human if color => writeln!(out, "{}", rel.blue())?,
            OutputFormat::Human => writeln!(out, "{rel}")?,
        }
    }
    Ok(())
}
