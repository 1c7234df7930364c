use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub type ModuleProviderMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub organization_name: String,
    pub enabled_modules: BTreeSet<String>,
}

impl SettingsSnapshot {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("failed serializing settings snapshot")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write settings snapshot: {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read settings snapshot: {}", path.display())
                });
            }
        };

        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings snapshot: {}", path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn apply_to(&self, map: &mut ModuleProviderMap, provider_id: &str) {
        let mut emptied = Vec::new();
        for (module, providers) in map.iter_mut() {
            if self.enabled_modules.contains(module) {
                providers.insert(provider_id.to_string());
            } else {
                providers.remove(provider_id);
                if providers.is_empty() {
                    emptied.push(module.clone());
                }
            }
        }
        for module in emptied {
            map.remove(&module);
        }
    }
}
