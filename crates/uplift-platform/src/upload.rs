use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uplift_core::{PackageRecord, PackageStatus, UploadOutcome};

use crate::archive::{is_zip_file, read_manifest, ZIP_MIME_TYPE};
use crate::checksum::sha256_hex_file;
use crate::records::RecordStore;
use crate::{current_unix_timestamp, file_mime_type, unique_suffix, InstanceLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub temp_path: PathBuf,
    pub size_bytes: u64,
}

impl UploadRequest {
    pub fn from_artifact(layout: &InstanceLayout, artifact: &Path) -> Result<Self> {
        let file_name = artifact
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("package.zip")
            .to_string();

        let temp_dir = layout.upload_temp_dir();
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("failed to create {}", temp_dir.display()))?;
        let temp_path = temp_dir.join(format!("upload-{}-{file_name}", unique_suffix()));
        fs::copy(artifact, &temp_path).with_context(|| {
            format!(
                "failed to copy package file {} to temp file {}",
                artifact.display(),
                temp_path.display()
            )
        })?;

        let size_bytes = fs::metadata(&temp_path)
            .with_context(|| format!("failed to stat temp file: {}", temp_path.display()))?
            .len();

        Ok(Self {
            file_name,
            mime_type: file_mime_type(artifact).to_string(),
            temp_path,
            size_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UploadGateway {
    layout: InstanceLayout,
}

impl UploadGateway {
    pub fn new(layout: &InstanceLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome> {
        if !request.temp_path.is_file() {
            return Ok(UploadOutcome::rejected("uploaded file is missing"));
        }
        if request.size_bytes == 0 {
            return Ok(UploadOutcome::rejected("uploaded file is empty"));
        }
        if request.mime_type != ZIP_MIME_TYPE {
            return Ok(UploadOutcome::rejected(format!(
                "unsupported upload type: {}",
                request.mime_type
            )));
        }
        if !is_zip_file(&request.temp_path) {
            return Ok(UploadOutcome::rejected("uploaded file is not a zip archive"));
        }

        let manifest = match read_manifest(&request.temp_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                return Ok(UploadOutcome::rejected(format!(
                    "invalid package archive: {err:#}"
                )));
            }
        };

        let digest = sha256_hex_file(&request.temp_path)?;

        let upload_dir = self.layout.upload_dir();
        fs::create_dir_all(&upload_dir)
            .with_context(|| format!("failed to create {}", upload_dir.display()))?;
        let staged_path = upload_dir.join(&request.file_name);
        move_file(&request.temp_path, &staged_path)?;

        let record = PackageRecord {
            id: format!("pkg-{}-{}", &digest[..12], unique_suffix()),
            key: manifest.key,
            version: manifest.version,
            status: PackageStatus::Staged,
            deleted: false,
            artifact_path: Some(format!("upload/{}", request.file_name)),
            artifact_sha256: Some(digest),
            files: Vec::new(),
            updated_at_unix: current_unix_timestamp(),
        };
        RecordStore::new(&self.layout).write(&record)?;

        Ok(UploadOutcome::staged(record.id))
    }
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).with_context(|| {
        format!("failed to move upload {} to {}", from.display(), to.display())
    })?;
    fs::remove_file(from)
        .with_context(|| format!("failed to remove temp upload: {}", from.display()))
}
