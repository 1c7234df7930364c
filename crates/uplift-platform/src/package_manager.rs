use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use uplift_backup::{prune_if_empty, remove_dir_if_exists, remove_file_if_exists};
use uplift_core::{PackageRecord, PackageStatus};

use crate::archive::{open_archive, PAYLOAD_PREFIX};
use crate::records::RecordStore;
use crate::{current_unix_timestamp, read_manifest, InstanceLayout};

#[derive(Debug, Clone)]
pub struct PackageManager {
    layout: InstanceLayout,
}

impl PackageManager {
    pub fn new(layout: &InstanceLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn install(&self, record: &PackageRecord) -> Result<PackageRecord> {
        let store = RecordStore::new(&self.layout);
        let artifact_path = record
            .artifact_path
            .as_ref()
            .ok_or_else(|| anyhow!("staged record '{}' has no artifact path", record.id))?;
        let archive_path = self.layout.instance_root().join(artifact_path);
        let manifest = read_manifest(&archive_path)?;

        let mut updated = record.clone();
        updated.updated_at_unix = current_unix_timestamp();
        match self.extract_payload(&archive_path, &manifest.files) {
            Ok(files) => {
                updated.files = files;
                updated.status = PackageStatus::Installed;
            }
            Err(_) => {
                updated.status = PackageStatus::Failed;
            }
        }
        store.write(&updated)?;
        Ok(updated)
    }

    pub fn uninstall(
        &self,
        record: &PackageRecord,
        remove_customizations: bool,
    ) -> Result<PackageRecord> {
        let connectors = self.layout.connectors_dir();
        for file in &record.files {
            let Some(path) = safe_connector_path(&connectors, file) else {
                continue;
            };
            remove_file_if_exists(&path)?;
            prune_empty_parents(&connectors, &path)?;
        }

        if remove_customizations {
            remove_dir_if_exists(&self.layout.provider_dir(&record.key))?;
        }

        let mut updated = record.clone();
        updated.status = PackageStatus::Uninstalled;
        updated.updated_at_unix = current_unix_timestamp();
        RecordStore::new(&self.layout).write(&updated)?;
        Ok(updated)
    }

    fn extract_payload(&self, archive_path: &Path, files: &[String]) -> Result<Vec<String>> {
        let connectors = self.layout.connectors_dir();
        let mut archive = open_archive(archive_path)?;

        let mut installed = Vec::with_capacity(files.len());
        for file in files {
            let dest = safe_connector_path(&connectors, file)
                .ok_or_else(|| anyhow!("unsafe payload path in connector manifest: {file}"))?;

            let entry_name = format!("{PAYLOAD_PREFIX}{file}");
            let mut entry = archive
                .by_name(&entry_name)
                .map_err(|_| anyhow!("package payload entry missing: {entry_name}"))?;

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let mut out = File::create(&dest)
                .with_context(|| format!("failed to create payload file: {}", dest.display()))?;
            io::copy(&mut entry, &mut out).with_context(|| {
                format!("failed to extract payload entry: {entry_name}")
            })?;

            installed.push(file.clone());
        }

        Ok(installed)
    }
}

fn safe_connector_path(connectors_dir: &Path, relative: &str) -> Option<PathBuf> {
    if relative.trim().is_empty() {
        return None;
    }

    let path = Path::new(relative);
    if path.is_absolute() {
        return None;
    }
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }

    Some(connectors_dir.join(path))
}

fn prune_empty_parents(connectors_dir: &Path, removed: &Path) -> Result<()> {
    let mut dir = removed.parent();
    while let Some(current) = dir {
        if current == connectors_dir || !current.starts_with(connectors_dir) {
            break;
        }
        if !prune_if_empty(current)? {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}
