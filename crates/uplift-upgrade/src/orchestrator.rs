use std::path::PathBuf;

use anyhow::Result;
use uplift_backup::{
    backup_dir, prune_if_empty, remove_dir_if_exists, remove_file_if_exists, restore_dir,
};
use uplift_core::{
    version_is_before, PackageRecord, PackageStatus, RunLog, SettingsSnapshot, UploadStatus,
};
use uplift_platform::{
    InstanceLayout, PackageManager, ProviderConfigStore, RecordStore, UploadGateway,
    UploadRequest, ORGANIZATION_NAME_PROPERTY,
};

use crate::error::UpgradeError;

pub const LEGACY_CONNECTOR_LAYOUT_VERSION: &str = "2.1";

pub const BACKUP_SUBDIRS: [&str; 2] = ["sources", "formatters"];

pub struct Upgrader {
    layout: InstanceLayout,
    package_key: String,
    provider_id: String,
    artifact_path: PathBuf,
}

impl Upgrader {
    pub fn new(
        layout: &InstanceLayout,
        package_key: impl Into<String>,
        provider_id: impl Into<String>,
        artifact_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            layout: layout.clone(),
            package_key: package_key.into(),
            provider_id: provider_id.into(),
            artifact_path: artifact_path.into(),
        }
    }

    pub fn legacy_backup_needed(installed_version: &str) -> Result<bool> {
        version_is_before(installed_version, LEGACY_CONNECTOR_LAYOUT_VERSION)
    }

    pub fn run(&self, log: &mut RunLog) -> Result<PackageRecord, UpgradeError> {
        let records = RecordStore::new(&self.layout);
        let manager = PackageManager::new(&self.layout);

        let matches = records.find_installed(&self.package_key)?;
        let Some(installed) = matches.first().cloned() else {
            return Err(UpgradeError::NotInstalled {
                key: self.package_key.clone(),
            });
        };
        if matches.len() > 1 {
            log.log(&format!(
                "Warning: {} installed records match key '{}', proceeding with '{}'",
                matches.len(),
                self.package_key,
                installed.id
            ));
        }
        log.log(&format!(
            "Installed connector package found: {}",
            installed.version
        ));

        self.snapshot_settings(log)
            .map_err(UpgradeError::SettingsBackup)?;

        let legacy_backup = Self::legacy_backup_needed(&installed.version)?;
        if legacy_backup {
            self.backup_connector_files(log);
        }

        log.log("Uninstall connector package");
        manager
            .uninstall(&installed, false)
            .map_err(|source| UpgradeError::Uninstall {
                version: installed.version.clone(),
                source,
            })?;

        if legacy_backup {
            self.restore_connector_files(log);
        }

        log.log("Upload connector package");
        let staged_id = self.upload_artifact()?;

        let staged = records
            .retrieve_by_id(&staged_id)?
            .ok_or_else(|| UpgradeError::RetrieveFailed {
                id: staged_id.clone(),
            })?;

        log.log("Install connector package");
        let result = manager.install(&staged)?;
        if result.status != PackageStatus::Installed {
            return Err(UpgradeError::Install {
                status: result.status.as_str().to_string(),
            });
        }
        log.log(&format!(
            "Installed connector package: {} {}",
            result.id, result.version
        ));

        self.restore_settings(log);

        Ok(result)
    }

    fn upload_artifact(&self) -> Result<String, UpgradeError> {
        let request = UploadRequest::from_artifact(&self.layout, &self.artifact_path)
            .map_err(|source| UpgradeError::Upload {
                message: format!("{source:#}"),
            })?;
        let outcome = UploadGateway::new(&self.layout)
            .upload(&request)
            .map_err(|source| UpgradeError::Upload {
                message: format!("{source:#}"),
            })?;

        if outcome.status == UploadStatus::Staged {
            if let Some(id) = outcome.staged_record_id {
                return Ok(id);
            }
        }
        Err(UpgradeError::Upload {
            message: outcome.message.unwrap_or_else(|| {
                format!("upload ended with status '{}'", outcome.status.as_str())
            }),
        })
    }

    fn snapshot_settings(&self, log: &mut RunLog) -> Result<()> {
        log.log("Backup connector settings");
        let config = ProviderConfigStore::new(&self.layout).load(&self.provider_id)?;
        let snapshot = SettingsSnapshot {
            organization_name: config
                .properties
                .get(ORGANIZATION_NAME_PROPERTY)
                .cloned()
                .unwrap_or_default(),
            enabled_modules: config.mapping.beans.keys().cloned().collect(),
        };
        snapshot.save(&self.layout.settings_snapshot_path())
    }

    fn backup_connector_files(&self, log: &mut RunLog) {
        log.log("Backup connector files");
        let connectors = self.layout.connectors_dir();
        for subdir in BACKUP_SUBDIRS {
            let source = connectors.join(subdir);
            if !source.is_dir() {
                continue;
            }
            log.log(&format!("Backup connector dir: {}", source.display()));
            let dest = self.layout.backup_dir().join(subdir);
            if let Err(err) = backup_dir(&source, &dest) {
                log.log(&format!(
                    "Failed to back up connector dir {}: {err:#}",
                    source.display()
                ));
            }
        }
    }

    fn restore_connector_files(&self, log: &mut RunLog) {
        log.log("Restore connector files");
        let connectors = self.layout.connectors_dir();
        let backup_root = self.layout.backup_dir();

        for subdir in BACKUP_SUBDIRS {
            let backup = backup_root.join(subdir);
            if backup.is_dir() {
                log.log(&format!("Restore connector dir: {}", backup.display()));
                match restore_dir(&backup, &connectors.join(subdir)) {
                    Ok(()) => {
                        log.log(&format!("Delete backup directory: {}", backup.display()));
                    }
                    Err(err) => log.log(&format!(
                        "Failed to restore from backup directory {}: {err:#}",
                        backup.display()
                    )),
                }
            }

            let stale = connectors
                .join(subdir)
                .join("ext")
                .join("rest")
                .join(&self.provider_id);
            if stale.is_dir() {
                log.log(&format!("Delete legacy connector dir: {}", stale.display()));
                if let Err(err) = remove_dir_if_exists(&stale) {
                    log.log(&format!(
                        "Failed to delete legacy connector dir {}: {err:#}",
                        stale.display()
                    ));
                }
            }
        }

        match prune_if_empty(&backup_root) {
            Ok(true) => log.log(&format!(
                "Delete backup directory: {}",
                backup_root.display()
            )),
            Ok(false) => {}
            Err(err) => log.log(&format!(
                "Failed to prune backup directory {}: {err:#}",
                backup_root.display()
            )),
        }
    }

    fn restore_settings(&self, log: &mut RunLog) {
        log.log("Restore connector settings");
        if let Err(err) = self.try_restore_settings(log) {
            log.log(&format!("Failed to restore connector settings: {err:#}"));
        }
    }

    fn try_restore_settings(&self, log: &mut RunLog) -> Result<()> {
        let path = self.layout.settings_snapshot_path();
        let Some(snapshot) = SettingsSnapshot::load(&path)? else {
            log.log("Settings snapshot not found, nothing to restore");
            return Ok(());
        };

        let store = ProviderConfigStore::new(&self.layout);
        let mut config = store.load(&self.provider_id)?;
        config.properties.insert(
            ORGANIZATION_NAME_PROPERTY.to_string(),
            snapshot.organization_name.clone(),
        );
        store.save(&self.provider_id, &config)?;

        let mut map = store.module_map()?;
        snapshot.apply_to(&mut map, &self.provider_id);
        store.save_module_map(&map)?;

        remove_file_if_exists(&path)?;
        Ok(())
    }
}
