use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::InstanceLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    fn parse_token(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            _ => Self::Inactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    pub status: UserStatus,
    pub is_admin: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    layout: InstanceLayout,
}

impl UserDirectory {
    pub fn new(layout: &InstanceLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    pub fn write(&self, user: &UserRecord) -> Result<PathBuf> {
        let dir = self.layout.users_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut payload = String::new();
        payload.push_str(&format!("name={}\n", user.name));
        payload.push_str(&format!("status={}\n", user.status.as_str()));
        payload.push_str(&format!("is_admin={}\n", user.is_admin));
        if user.deleted {
            payload.push_str("deleted=true\n");
        }

        let path = self.layout.user_record_path(&user.name);
        fs::write(&path, payload)
            .with_context(|| format!("failed to write user record: {}", path.display()))?;
        Ok(path)
    }

    pub fn resolve_admin(&self, name: &str) -> Result<Option<UserRecord>> {
        let path = self.layout.user_record_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read user record: {}", path.display()));
            }
        };

        let user = parse_user(&raw)
            .with_context(|| format!("failed to parse user record: {}", path.display()))?;
        if user.name != name
            || user.status != UserStatus::Active
            || !user.is_admin
            || user.deleted
        {
            return Ok(None);
        }
        Ok(Some(user))
    }
}

fn parse_user(raw: &str) -> Result<UserRecord> {
    let mut name = None;
    let mut status = UserStatus::Inactive;
    let mut is_admin = false;
    let mut deleted = false;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "name" => name = Some(v.to_string()),
            "status" => status = UserStatus::parse_token(v),
            "is_admin" => is_admin = v == "true",
            "deleted" => deleted = v == "true",
            _ => {}
        }
    }

    Ok(UserRecord {
        name: name.context("missing name")?,
        status,
        is_admin,
        deleted,
    })
}
