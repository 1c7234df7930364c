use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use uplift_core::{PackageRecord, PackageStatus};

use crate::InstanceLayout;

#[derive(Debug, Clone)]
pub struct RecordStore {
    layout: InstanceLayout,
}

impl RecordStore {
    pub fn new(layout: &InstanceLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn write(&self, record: &PackageRecord) -> Result<PathBuf> {
        let dir = self.layout.package_records_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = self.layout.package_record_path(&record.id);
        fs::write(&path, encode_record(record))
            .with_context(|| format!("failed to write package record: {}", path.display()))?;
        Ok(path)
    }

    pub fn read_all(&self) -> Result<Vec<PackageRecord>> {
        let dir = self.layout.package_records_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to read record directory: {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("record") {
                continue;
            }

            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read package record: {}", path.display()))?;
            let record = parse_record(&raw)
                .with_context(|| format!("failed to parse package record: {}", path.display()))?;
            records.push(record);
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    pub fn find_installed(&self, key: &str) -> Result<Vec<PackageRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|record| {
                record.key == key && record.status == PackageStatus::Installed && !record.deleted
            })
            .collect())
    }

    pub fn retrieve_by_id(&self, id: &str) -> Result<Option<PackageRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|record| record.id == id && !record.deleted))
    }
}

fn encode_record(record: &PackageRecord) -> String {
    let mut payload = String::new();
    payload.push_str(&format!("id={}\n", record.id));
    payload.push_str(&format!("key={}\n", record.key));
    payload.push_str(&format!("version={}\n", record.version));
    payload.push_str(&format!("status={}\n", record.status.as_str()));
    if record.deleted {
        payload.push_str("deleted=true\n");
    }
    if let Some(artifact_path) = &record.artifact_path {
        payload.push_str(&format!("artifact_path={artifact_path}\n"));
    }
    if let Some(sha256) = &record.artifact_sha256 {
        payload.push_str(&format!("artifact_sha256={sha256}\n"));
    }
    for file in &record.files {
        payload.push_str(&format!("file={file}\n"));
    }
    payload.push_str(&format!("updated_at_unix={}\n", record.updated_at_unix));
    payload
}

pub(crate) fn parse_record(raw: &str) -> Result<PackageRecord> {
    let mut id = None;
    let mut key = None;
    let mut version = None;
    let mut status = None;
    let mut deleted = false;
    let mut artifact_path = None;
    let mut artifact_sha256 = None;
    let mut files = Vec::new();
    let mut updated_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "id" => id = Some(v.to_string()),
            "key" => key = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "status" => status = Some(PackageStatus::parse(v)?),
            "deleted" => deleted = v == "true",
            "artifact_path" => artifact_path = Some(v.to_string()),
            "artifact_sha256" => artifact_sha256 = Some(v.to_string()),
            "file" => files.push(v.to_string()),
            "updated_at_unix" => {
                updated_at_unix = Some(v.parse().context("updated_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(PackageRecord {
        id: id.context("missing id")?,
        key: key.context("missing key")?,
        version: version.context("missing version")?,
        status: status.context("missing status")?,
        deleted,
        artifact_path,
        artifact_sha256,
        files,
        updated_at_unix: updated_at_unix.context("missing updated_at_unix")?,
    })
}
