use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::config::CleanupConfig;
use crate::fixes::{CleanupRule, default_rules};
use crate::model::FileHandle;
use crate::ports::Host;

/// Runs every enabled rule on one file and saves it once at the end.
pub struct CleanupCoordinator {
    host: Host,
    config: CleanupConfig,
    rules: Vec<Box<dyn CleanupRule>>,
}

impl CleanupCoordinator {
    pub fn new(host: Host, config: CleanupConfig) -> Self {
        Self {
            host,
            config,
            rules: default_rules(),
        }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Whether any rule modified `file`. Failures are logged and count as
    /// "not modified"; they never escape to the caller.
    pub async fn cleanup_file(&self, file: &FileHandle) -> bool {
        match self.try_cleanup_file(file).await {
            Ok(modified) => modified,
            Err(err) => {
                error!(file = %file, error = %format!("{err:#}"), "error cleaning up file");
                false
            }
        }
    }

    async fn try_cleanup_file(&self, file: &FileHandle) -> Result<bool> {
        self.host
            .documents
            .open(file)
            .await
            .with_context(|| format!("failed opening {file}"))?;

        let mut modified = false;
        for rule in self.rules.iter().filter(|r| r.enabled(&self.config)) {
            let changed = rule.apply(&self.host, file).await;
            debug!(file = %file, rule = rule.name(), changed, "rule finished");
            modified |= changed;
        }

        if modified && self.host.documents.open(file).await?.is_dirty {
            self.host
                .documents
                .save(file)
                .await
                .with_context(|| format!("failed saving {file}"))?;
        }
        Ok(modified)
    }
}
