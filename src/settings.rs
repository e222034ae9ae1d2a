use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::modes::{FocusModeDefinition, ModeCatalog};

/// Environment override for the clock period, handy for watching a full
/// study/break cycle in a few seconds.
pub const TICK_ENV_VAR: &str = "FOCUSXP_TICK_MS";

const DEFAULT_TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_interval_ms: u64,
    /// Mode opened when the caller does not pick one.
    #[serde(default)]
    pub default_mode: Option<String>,
    /// Replaces the builtin catalog when present.
    #[serde(default)]
    pub modes: Option<Vec<FocusModeDefinition>>,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_MS,
            default_mode: None,
            modes: None,
        }
    }
}

impl FocusConfig {
    /// Reads the config file if it exists, otherwise starts from defaults.
    /// The env override is applied on top either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(TICK_ENV_VAR) {
            self.tick_interval_ms = value
                .trim()
                .parse()
                .with_context(|| format!("{TICK_ENV_VAR} must be a whole number of ms"))?;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        if self.tick_interval_ms == 0 {
            bail!("tick interval must be greater than zero");
        }
        Ok(Duration::from_millis(self.tick_interval_ms))
    }

    pub fn catalog(&self) -> Result<ModeCatalog> {
        let catalog = match &self.modes {
            Some(modes) => ModeCatalog::from_modes(modes.iter().cloned())
                .context("invalid focus modes in config")?,
            None => ModeCatalog::builtin(),
        };

        if let Some(id) = &self.default_mode {
            if !catalog.contains(id) {
                bail!("default mode '{id}' is not in the mode catalog");
            }
        }

        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}
