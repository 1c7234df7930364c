use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub fn backup_dir(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_dir() {
        anyhow::bail!("backup source is not a directory: {}", source.display());
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create backup directory: {}", dest.display()))?;
    copy_dir_recursive(source, dest)
}

pub fn restore_dir(backup: &Path, target: &Path) -> Result<()> {
    if !backup.is_dir() {
        anyhow::bail!("backup directory does not exist: {}", backup.display());
    }
    fs::create_dir_all(target)
        .with_context(|| format!("failed to create restore target: {}", target.display()))?;
    copy_dir_recursive(backup, target)?;

    fs::remove_dir_all(backup).with_context(|| {
        format!(
            "failed to remove consumed backup directory: {}",
            backup.display()
        )
    })
}

pub fn prune_if_empty(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    if entries.next().is_some() {
        return Ok(false);
    }

    fs::remove_dir(dir)
        .with_context(|| format!("failed to remove empty directory: {}", dir.display()))?;
    Ok(true)
}

pub fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("failed to remove directory: {}", dir.display()))?;
    }
    Ok(())
}

pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))?;
    }
    Ok(())
}

fn copy_dir_recursive(source_root: &Path, destination_root: &Path) -> Result<()> {
    let mut queue: VecDeque<(PathBuf, PathBuf)> = VecDeque::new();
    queue.push_back((source_root.to_path_buf(), destination_root.to_path_buf()));

    while let Some((from_dir, to_dir)) = queue.pop_front() {
        for entry in fs::read_dir(&from_dir)
            .with_context(|| format!("failed to read directory: {}", from_dir.display()))?
        {
            let entry = entry?;
            let from_path = entry.path();
            let to_path = to_dir.join(entry.file_name());
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                fs::create_dir_all(&to_path)
                    .with_context(|| format!("failed to create directory: {}", to_path.display()))?;
                queue.push_back((from_path, to_path));
            } else if file_type.is_file() {
                fs::copy(&from_path, &to_path).with_context(|| {
                    format!(
                        "failed to copy {} to {}",
                        from_path.display(),
                        to_path.display()
                    )
                })?;
            }
        }
    }

    Ok(())
}
