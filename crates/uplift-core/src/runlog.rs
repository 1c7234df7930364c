use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("unable to open log file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, message: &str) {
        let line = format!("{} - {message}\n", chrono::Local::now().to_rfc2822());
        let _ = self.file.write_all(line.as_bytes());
    }

    pub fn close(mut self) -> Result<()> {
        self.file
            .flush()
            .with_context(|| format!("failed to flush log file: {}", self.path.display()))
    }
}
