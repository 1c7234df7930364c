use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uplift_core::ModuleProviderMap;

use crate::InstanceLayout;

pub const ORGANIZATION_NAME_PROPERTY: &str = "organization_name";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMapping {
    #[serde(default)]
    pub beans: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub mapping: ProviderMapping,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DisplayMapFile {
    #[serde(default)]
    modules: ModuleProviderMap,
}

#[derive(Debug, Clone)]
pub struct ProviderConfigStore {
    layout: InstanceLayout,
}

impl ProviderConfigStore {
    pub fn new(layout: &InstanceLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn load(&self, provider_id: &str) -> Result<ProviderConfig> {
        let path = self.layout.provider_config_path(provider_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ProviderConfig::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read provider config: {}", path.display())
                });
            }
        };

        toml::from_str(&raw)
            .with_context(|| format!("failed to parse provider config: {}", path.display()))
    }

    pub fn save(&self, provider_id: &str, config: &ProviderConfig) -> Result<PathBuf> {
        let path = self.layout.provider_config_path(provider_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(config)
            .with_context(|| format!("failed serializing provider config for '{provider_id}'"))?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write provider config: {}", path.display()))?;
        Ok(path)
    }

    pub fn module_map(&self) -> Result<ModuleProviderMap> {
        let path = self.layout.display_map_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ModuleProviderMap::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read display map: {}", path.display()));
            }
        };

        let file: DisplayMapFile = toml::from_str(&raw)
            .with_context(|| format!("failed to parse display map: {}", path.display()))?;
        Ok(file.modules)
    }

    pub fn save_module_map(&self, map: &ModuleProviderMap) -> Result<PathBuf> {
        let path = self.layout.display_map_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = DisplayMapFile {
            modules: map.clone(),
        };
        let content =
            toml::to_string_pretty(&file).context("failed serializing display map")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write display map: {}", path.display()))?;
        Ok(path)
    }
}
