use std::{collections::BTreeMap, sync::Arc};

use anyhow::{bail, Context, Result};

use super::FocusModeDefinition;

pub const DEFAULT_MODE_ID: &str = "pomodoro";

/// Immutable id -> mode mapping, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct ModeCatalog {
    modes: Arc<BTreeMap<String, Arc<FocusModeDefinition>>>,
}

impl ModeCatalog {
    pub fn builtin() -> Self {
        let modes = vec![
            FocusModeDefinition::new("pomodoro", "Pomodoro", 25 * 60, 5 * 60, 20)
                .with_description("25 min study, 5 min break")
                .with_duration_minutes(&[25])
                .with_accent("destructive"),
            FocusModeDefinition::new("deep-focus", "Deep Focus", 60 * 60, 10 * 60, 30)
                .with_description("60-90 min focused work")
                .with_duration_minutes(&[60, 75, 90])
                .with_accent("accent"),
            FocusModeDefinition::new("sprint", "Sprint", 15 * 60, 3 * 60, 10)
                .with_description("10-15 min quick tasks")
                .with_duration_minutes(&[10, 15])
                .with_accent("success"),
            FocusModeDefinition::new("study-with-friends", "Study Together", 25 * 60, 5 * 60, 20)
                .with_description("Sync with friends")
                .with_duration_minutes(&[25, 45, 60])
                .with_accent("primary"),
        ];

        Self {
            modes: Arc::new(
                modes
                    .into_iter()
                    .map(|mode| (mode.id.clone(), Arc::new(mode)))
                    .collect(),
            ),
        }
    }

    pub fn from_modes<I>(modes: I) -> Result<Self>
    where
        I: IntoIterator<Item = FocusModeDefinition>,
    {
        let mut map = BTreeMap::new();
        for mode in modes {
            mode.validate()
                .with_context(|| format!("invalid focus mode '{}'", mode.id))?;
            if map.contains_key(&mode.id) {
                bail!("duplicate focus mode id '{}'", mode.id);
            }
            map.insert(mode.id.clone(), Arc::new(mode));
        }

        if map.is_empty() {
            bail!("mode catalog must define at least one focus mode");
        }

        Ok(Self {
            modes: Arc::new(map),
        })
    }

    pub fn get(&self, id: &str) -> Option<Arc<FocusModeDefinition>> {
        self.modes.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FocusModeDefinition> {
        self.modes.values().map(|mode| mode.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn default_mode(&self) -> Option<Arc<FocusModeDefinition>> {
        self.get(DEFAULT_MODE_ID)
            .or_else(|| self.modes.values().next().cloned())
    }
}

impl Default for ModeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
