use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("no installed connector package found for key '{key}'")]
    NotInstalled { key: String },

    #[error("failed to back up connector settings")]
    SettingsBackup(#[source] anyhow::Error),

    #[error("failed to uninstall connector package {version}")]
    Uninstall {
        version: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to upload package: {message}")]
    Upload { message: String },

    #[error("failed to retrieve package record for staged upload '{id}'")]
    RetrieveFailed { id: String },

    #[error("failed to install package: {status}")]
    Install { status: String },

    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}
