use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use uplift_core::parse_version_lenient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorManifest {
    pub key: String,
    pub version: String,
    pub provider: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl ConnectorManifest {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(input).context("failed to parse connector manifest")?;
        if manifest.key.trim().is_empty() {
            return Err(anyhow!("connector manifest key must not be empty"));
        }
        if manifest.provider.trim().is_empty() {
            return Err(anyhow!("connector manifest provider must not be empty"));
        }
        parse_version_lenient(&manifest.version).with_context(|| {
            format!(
                "connector manifest '{}' carries an invalid version",
                manifest.key
            )
        })?;
        Ok(manifest)
    }
}
