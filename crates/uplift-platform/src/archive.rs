use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipArchive;

use crate::manifest::ConnectorManifest;

pub const MANIFEST_FILE_NAME: &str = "connector.toml";
pub const ZIP_MIME_TYPE: &str = "application/zip";

pub(crate) const PAYLOAD_PREFIX: &str = "payload/";

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open package archive: {}", path.display()))?;
    ZipArchive::new(file)
        .with_context(|| format!("failed to read package archive: {}", path.display()))
}

pub fn read_manifest(path: &Path) -> Result<ConnectorManifest> {
    let mut archive = open_archive(path)?;
    let mut entry = archive.by_name(MANIFEST_FILE_NAME).with_context(|| {
        format!(
            "package archive is missing {}: {}",
            MANIFEST_FILE_NAME,
            path.display()
        )
    })?;

    let mut raw = String::new();
    entry.read_to_string(&mut raw).with_context(|| {
        format!(
            "failed to read {} from package archive: {}",
            MANIFEST_FILE_NAME,
            path.display()
        )
    })?;
    ConnectorManifest::from_toml_str(&raw)
        .with_context(|| format!("invalid connector manifest in {}", path.display()))
}

pub fn is_zip_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0_u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }
    magic == [0x50, 0x4b, 0x03, 0x04]
}

pub fn file_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("zip") => ZIP_MIME_TYPE,
        Some("gz") | Some("tgz") => "application/gzip",
        Some("json") => "application/json",
        Some("toml") | Some("log") | Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
