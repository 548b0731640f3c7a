use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{Cli, model::OutputFormat, output::ColorPolicy};

pub const CONFIG_FILE: &str = "cleanup-buddy.toml";

pub const REMOVE_UNUSED_VARIABLES: &str = "removeUnusedVariables";
pub const REMOVE_UNUSED_FUNCTIONS: &str = "removeUnusedFunctions";
pub const REMOVE_UNUSED_PROPS: &str = "removeUnusedProps";

const DEFAULT_YIELD_MS: u64 = 10;

/// Key/value settings, read once when a run's configuration is built.
pub trait SettingsStore {
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    cleanup: TomlSettings,
}

/// The `[cleanup]` table of `cleanup-buddy.toml`. Unknown keys and values of
/// the wrong type are load errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TomlSettings {
    remove_unused_variables: Option<bool>,
    remove_unused_functions: Option<bool>,
    remove_unused_props: Option<bool>,
    report: Option<PathBuf>,
    yield_ms: Option<u64>,
    format: Option<OutputFormat>,
    color: Option<ColorPolicy>,
}

impl TomlSettings {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<FileConfig>(raw)?.cleanup)
    }
}

impl SettingsStore for TomlSettings {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        let value = match key {
            REMOVE_UNUSED_VARIABLES => self.remove_unused_variables,
            REMOVE_UNUSED_FUNCTIONS => self.remove_unused_functions,
            REMOVE_UNUSED_PROPS => self.remove_unused_props,
            _ => None,
        };
        value.unwrap_or(default)
    }
}

/// Which fix categories a run applies. Frozen for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupConfig {
    pub remove_unused_variables: bool,
    pub remove_unused_functions: bool,
    pub remove_unused_props: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_unused_variables: true,
            remove_unused_functions: true,
            remove_unused_props: true,
        }
    }
}

impl CleanupConfig {
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        Self {
            remove_unused_variables: settings.get_bool(REMOVE_UNUSED_VARIABLES, true),
            remove_unused_functions: settings.get_bool(REMOVE_UNUSED_FUNCTIONS, true),
            remove_unused_props: settings.get_bool(REMOVE_UNUSED_PROPS, true),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub cleanup: CleanupConfig,
    pub report: Option<PathBuf>,
    pub yield_delay: Duration,
    pub format: OutputFormat,
    pub color: ColorPolicy,
}

impl EffectiveConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli.config.clone().or_else(|| {
            let p = PathBuf::from(CONFIG_FILE);
            if p.exists() { Some(p) } else { None }
        });

        let settings = if let Some(path) = &path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config {}", path.display()))?;
            TomlSettings::parse(&raw)
                .with_context(|| format!("failed parsing config {}", path.display()))?
        } else {
            TomlSettings::default()
        };

        let mut cleanup = CleanupConfig::from_settings(&settings);
        if cli.no_unused_variables {
            cleanup.remove_unused_variables = false;
        }
        if cli.no_unused_functions {
            cleanup.remove_unused_functions = false;
        }
        if cli.no_unused_props {
            cleanup.remove_unused_props = false;
        }

        // A report named in the config file is relative to that file.
        let report = cli.report.clone().or_else(|| {
            settings.report.as_ref().map(|r| {
                let base = path
                    .as_ref()
                    .and_then(|p| p.parent())
                    .map(PathBuf::from)
                    .unwrap_or_default();
                base.join(r)
            })
        });

        let yield_ms = cli.yield_ms.or(settings.yield_ms).unwrap_or(DEFAULT_YIELD_MS);
        let format = cli.format.or(settings.format).unwrap_or(OutputFormat::Human);
        let color = cli.color.or(settings.color).unwrap_or(ColorPolicy::Auto);

        Ok(Self {
            cleanup,
            report,
            yield_delay: Duration::from_millis(yield_ms),
            format,
            color,
        })
    }
}
