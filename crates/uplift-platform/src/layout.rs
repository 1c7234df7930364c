use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentMode {
    Direct,
    Templated { template_root: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    instance_root: PathBuf,
    mode: DeploymentMode,
}

impl InstanceLayout {
    pub fn new(instance_root: impl Into<PathBuf>) -> Self {
        Self {
            instance_root: instance_root.into(),
            mode: DeploymentMode::Direct,
        }
    }

    pub fn templated(
        instance_root: impl Into<PathBuf>,
        template_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            instance_root: instance_root.into(),
            mode: DeploymentMode::Templated {
                template_root: template_root.into(),
            },
        }
    }

    pub fn instance_root(&self) -> &Path {
        &self.instance_root
    }

    pub fn mode(&self) -> &DeploymentMode {
        &self.mode
    }

    pub fn platform_root(&self) -> &Path {
        match &self.mode {
            DeploymentMode::Direct => &self.instance_root,
            DeploymentMode::Templated { template_root } => template_root,
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.instance_root.join("cache")
    }

    pub fn upgrades_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("upgrades")
    }

    pub fn settings_snapshot_path(&self) -> PathBuf {
        self.upgrades_cache_dir().join("settings-backup.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.upgrades_cache_dir().join("connector_backup")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.instance_root.join("upload")
    }

    pub fn upload_temp_dir(&self) -> PathBuf {
        self.cache_dir().join("upload-temp")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.instance_root.join("state")
    }

    pub fn package_records_dir(&self) -> PathBuf {
        self.state_dir().join("packages")
    }

    pub fn package_record_path(&self, id: &str) -> PathBuf {
        self.package_records_dir().join(format!("{id}.record"))
    }

    pub fn users_dir(&self) -> PathBuf {
        self.state_dir().join("users")
    }

    pub fn user_record_path(&self, name: &str) -> PathBuf {
        self.users_dir().join(format!("{name}.record"))
    }

    pub fn connectors_dir(&self) -> PathBuf {
        self.instance_root.join("custom").join("connectors")
    }

    pub fn provider_dir(&self, provider_id: &str) -> PathBuf {
        self.connectors_dir().join(provider_id)
    }

    pub fn provider_config_path(&self, provider_id: &str) -> PathBuf {
        self.provider_dir(provider_id).join("config.toml")
    }

    pub fn display_map_path(&self) -> PathBuf {
        self.connectors_dir().join("display_map.toml")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.upgrades_cache_dir(),
            self.upload_dir(),
            self.upload_temp_dir(),
            self.package_records_dir(),
            self.users_dir(),
            self.connectors_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
