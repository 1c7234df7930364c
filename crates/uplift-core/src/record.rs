use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Installed,
    Staged,
    Uninstalled,
    Failed,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Staged => "staged",
            Self::Uninstalled => "uninstalled",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "installed" => Ok(Self::Installed),
            "staged" => Ok(Self::Staged),
            "uninstalled" => Ok(Self::Uninstalled),
            "failed" => Ok(Self::Failed),
            _ => Err(anyhow!("invalid package status: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub id: String,
    pub key: String,
    pub version: String,
    pub status: PackageStatus,
    pub deleted: bool,
    pub artifact_path: Option<String>,
    pub artifact_sha256: Option<String>,
    pub files: Vec<String>,
    pub updated_at_unix: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Staged,
    Rejected,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub staged_record_id: Option<String>,
    pub message: Option<String>,
}

impl UploadOutcome {
    pub fn staged(record_id: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Staged,
            staged_record_id: Some(record_id.into()),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Rejected,
            staged_record_id: None,
            message: Some(message.into()),
        }
    }
}
