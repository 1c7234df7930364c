use std::time::{SystemTime, UNIX_EPOCH};

mod archive;
mod checksum;
mod layout;
mod manifest;
mod package_manager;
mod provider_config;
mod records;
mod upload;
mod users;

pub use archive::{file_mime_type, is_zip_file, read_manifest, MANIFEST_FILE_NAME, ZIP_MIME_TYPE};
pub use checksum::{sha256_hex, sha256_hex_file};
pub use layout::{DeploymentMode, InstanceLayout};
pub use manifest::ConnectorManifest;
pub use package_manager::PackageManager;
pub use provider_config::{
    ProviderConfig, ProviderConfigStore, ProviderMapping, ORGANIZATION_NAME_PROPERTY,
};
pub use records::RecordStore;
pub use upload::{UploadGateway, UploadRequest};
pub use users::{UserDirectory, UserRecord, UserStatus};

pub(crate) fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub(crate) fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
