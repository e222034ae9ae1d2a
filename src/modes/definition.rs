use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A named focus configuration: default study/break lengths and the points
/// awarded for each completed study phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusModeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub study_secs: u64,
    pub break_secs: u64,
    pub points: u32,
    /// Alternate study lengths (seconds) selectable while the timer is idle.
    #[serde(default)]
    pub duration_options: Vec<u64>,
    #[serde(default)]
    pub accent: Option<String>,
}

impl FocusModeDefinition {
    pub fn new(id: &str, name: &str, study_secs: u64, break_secs: u64, points: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            study_secs,
            break_secs,
            points,
            duration_options: vec![study_secs],
            accent: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration_minutes(mut self, minutes: &[u64]) -> Self {
        self.duration_options = minutes.iter().map(|m| m * 60).collect();
        self
    }

    pub fn with_accent(mut self, accent: &str) -> Self {
        self.accent = Some(accent.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("focus mode id must not be empty");
        }
        if self.study_secs == 0 {
            bail!("focus mode '{}' has a zero study duration", self.id);
        }
        if self.break_secs == 0 {
            bail!("focus mode '{}' has a zero break duration", self.id);
        }
        if let Some(bad) = self.duration_options.iter().find(|secs| **secs == 0) {
            bail!(
                "focus mode '{}' lists an invalid duration option {bad}",
                self.id
            );
        }
        Ok(())
    }

    /// Whether `secs` may be picked as the study length for this mode.
    pub fn allows_duration(&self, secs: u64) -> bool {
        secs > 0 && (secs == self.study_secs || self.duration_options.contains(&secs))
    }

    /// More than one study length to choose from.
    pub fn has_duration_choice(&self) -> bool {
        self.duration_options.iter().any(|secs| *secs != self.study_secs)
    }
}
