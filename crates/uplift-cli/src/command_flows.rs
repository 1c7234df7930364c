use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use indicatif::HumanBytes;
use uplift_core::{PackageStatus, RunLog};
use uplift_platform::{InstanceLayout, RecordStore, UserDirectory};
use uplift_upgrade::Upgrader;

use crate::render::{render_status_line, start_download_progress, OutputStyle};

pub(crate) struct UpgradeOptions {
    pub package: String,
    pub log_path: PathBuf,
    pub instance: PathBuf,
    pub admin: String,
    pub template: Option<PathBuf>,
    pub templated: bool,
    pub key: String,
    pub provider: Option<String>,
    pub output_style: OutputStyle,
}

pub(crate) fn run_upgrade_command(options: &UpgradeOptions) -> Result<()> {
    if !options.instance.is_dir() {
        bail!(
            "instance path {} does not exist",
            options.instance.display()
        );
    }

    let layout = if options.templated {
        let Some(template) = &options.template else {
            bail!("templated mode requires --template");
        };
        if !template.is_dir() {
            bail!("template path {} does not exist", template.display());
        }
        InstanceLayout::templated(&options.instance, template)
    } else {
        InstanceLayout::new(&options.instance)
    };

    let remote = is_remote_url(&options.package);
    if !remote && !Path::new(&options.package).is_file() {
        bail!("package file {} does not exist", options.package);
    }

    let mut log = RunLog::open(&options.log_path)?;

    let directory = UserDirectory::new(&layout);
    match directory.resolve_admin(&options.admin) {
        Ok(Some(_)) => log.log(&format!("Authorized as admin user '{}'", options.admin)),
        Ok(None) => {
            return abort(log, format!("Admin user '{}' not found", options.admin));
        }
        Err(err) => {
            return abort(
                log,
                format!("Failed to resolve admin user '{}': {err:#}", options.admin),
            );
        }
    }

    if let Err(err) = layout.ensure_base_dirs() {
        return abort(log, format!("Failed to prepare instance layout: {err:#}"));
    }

    let artifact_path = if remote {
        match fetch_remote_artifact(&options.package, &layout.upload_temp_dir(), options.output_style)
        {
            Ok(path) => {
                log.log(&format!(
                    "Downloaded package {} to {}",
                    options.package,
                    path.display()
                ));
                path
            }
            Err(err) => {
                return abort(log, format!("Failed to download package: {err:#}"));
            }
        }
    } else {
        PathBuf::from(&options.package)
    };

    let provider = options
        .provider
        .clone()
        .unwrap_or_else(|| options.key.clone());
    let upgrader = Upgrader::new(&layout, options.key.as_str(), provider.as_str(), &artifact_path);

    match upgrader.run(&mut log) {
        Ok(record) => {
            log.log(&format!("Upgrade complete: {} {}", record.key, record.version));
            log.close()?;
            Ok(())
        }
        Err(err) => abort(
            log,
            format!("{:#}", anyhow::Error::from(err)),
        ),
    }
}

fn abort(mut log: RunLog, message: String) -> Result<()> {
    log.log(&message);
    let _ = log.close();
    Err(anyhow!(message))
}

pub(crate) fn run_doctor_command(instance: &Path, style: OutputStyle) -> Result<()> {
    if !instance.is_dir() {
        bail!("instance path {} does not exist", instance.display());
    }

    let layout = InstanceLayout::new(instance);
    for line in doctor_lines(&layout)? {
        println!("{}", render_status_line(style, "step", &line));
    }
    Ok(())
}

pub(crate) fn doctor_lines(layout: &InstanceLayout) -> Result<Vec<String>> {
    let mut lines = vec![
        format!("instance: {}", layout.instance_root().display()),
        format!("connectors: {}", layout.connectors_dir().display()),
        format!("records: {}", layout.package_records_dir().display()),
    ];

    let snapshot = layout.settings_snapshot_path();
    if snapshot.is_file() {
        lines.push(format!("pending settings restore: {}", snapshot.display()));
    }
    let backup = layout.backup_dir();
    if backup.is_dir() {
        lines.push(format!("leftover connector backup: {}", backup.display()));
    }

    let records = RecordStore::new(layout).read_all()?;
    let staged = records
        .iter()
        .filter(|record| record.status == PackageStatus::Staged)
        .count();
    let failed = records
        .iter()
        .filter(|record| record.status == PackageStatus::Failed)
        .count();
    if staged > 0 {
        lines.push(format!("staged packages awaiting install: {staged}"));
    }
    if failed > 0 {
        lines.push(format!("failed package installs on record: {failed}"));
    }
    if snapshot.is_file() || backup.is_dir() || staged > 0 || failed > 0 {
        lines.push("recovery state present, a manual rerun or cleanup is pending".to_string());
    } else {
        lines.push("no pending upgrade state".to_string());
    }

    Ok(lines)
}

pub(crate) fn is_remote_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

pub(crate) fn remote_file_name(url: &str) -> String {
    let trimmed = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name.contains(':') {
        "package.zip".to_string()
    } else {
        name.to_string()
    }
}

fn fetch_remote_artifact(url: &str, dest_dir: &Path, style: OutputStyle) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("failed to request package url: {url}"))?;
    if !response.status().is_success() {
        bail!(
            "package download failed with status {}: {url}",
            response.status()
        );
    }

    let total = response.content_length().unwrap_or(0);
    let file_name = remote_file_name(url);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = dest_dir.join(format!("download-{nanos}-{file_name}"));
    let mut out = File::create(&path)
        .with_context(|| format!("failed to create download file: {}", path.display()))?;

    let progress = start_download_progress(style, "download", total);
    let mut buffer = [0_u8; 64 * 1024];
    let mut downloaded = 0_u64;
    loop {
        let read = response
            .read(&mut buffer)
            .context("failed reading package download stream")?;
        if read == 0 {
            break;
        }
        out.write_all(&buffer[..read])
            .with_context(|| format!("failed writing download file: {}", path.display()))?;
        downloaded += read as u64;
        if let Some(progress) = &progress {
            progress.set_position(downloaded);
        }
    }

    if let Some(progress) = progress {
        progress.finish_and_clear();
        println!(
            "{}",
            render_status_line(
                style,
                "download",
                &format!("fetched {file_name} ({})", HumanBytes(downloaded))
            )
        );
    }

    Ok(path)
}
