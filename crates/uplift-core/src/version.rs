use anyhow::{anyhow, Result};
use semver::Version;

pub fn parse_version_lenient(value: &str) -> Result<Version> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(anyhow!("version string is empty"));
    }

    let mut candidate = trimmed.to_string();
    for _ in 0..3 {
        if let Ok(version) = Version::parse(&candidate) {
            return Ok(version);
        }
        candidate.push_str(".0");
    }

    Err(anyhow!("invalid version string: {value}"))
}

pub fn version_is_before(version: &str, threshold: &str) -> Result<bool> {
    let version = parse_version_lenient(version)?;
    let threshold = parse_version_lenient(threshold)?;
    Ok(version < threshold)
}
