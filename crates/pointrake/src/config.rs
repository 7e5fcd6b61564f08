//! Persisted CLI configuration: the ingest endpoint address and the
//! per-source scan toggles.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use pointrake_core::ScanOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ingest endpoint URL (`https://host/api/ingest`).
    pub endpoint: Option<String>,
    /// Per-source toggles, camelCase keys on disk.
    pub options: ScanOptions,
}

impl CliConfig {
    /// Config file location: `POINTRAKE_CONFIG` when set, otherwise
    /// `<config-dir>/pointrake/config.json`.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("POINTRAKE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("pointrake").join("config.json"))
            .context("no configuration directory available")
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))
    }
}
