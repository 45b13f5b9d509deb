use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "ryze-uploader.yaml";

/// MySQL connection section of the config file. The password is only read
/// from `MYSQL_PASSWORD`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MySqlSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

/// Configuration loaded from `ryze-uploader.yaml`.
/// All fields are optional; missing fields fall back to env/defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UploaderConfig {
    pub bucket: Option<String>,
    pub bo_database: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: Option<bool>,
    pub mysql: Option<MySqlSection>,
}

impl UploaderConfig {
    /// Load configuration from a YAML file.
    ///
    /// - If `path` is `Some`, load that specific file (error if missing).
    /// - If `path` is `None`, auto-detect `ryze-uploader.yaml` in cwd; return defaults if absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path.to_path_buf()
            }
        };

        let contents = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path.display()))?;

        let config: UploaderConfig = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", file_path.display()))?;

        Ok(config)
    }

    /// Fill node config keys that the caller left unset.
    pub fn apply_defaults(&self, node_config: &mut serde_json::Map<String, serde_json::Value>) {
        let mut fill = |key: &str, value: Option<serde_json::Value>| {
            if let Some(value) = value {
                node_config.entry(key.to_string()).or_insert(value);
            }
        };

        fill("bucket", self.bucket.clone().map(Into::into));
        fill("bo_database", self.bo_database.clone().map(Into::into));
        fill("region", self.region.clone().map(Into::into));
        fill("endpoint_url", self.endpoint_url.clone().map(Into::into));
        fill("force_path_style", self.force_path_style.map(Into::into));
        if let Some(mysql) = &self.mysql {
            fill("mysql_host", mysql.host.clone().map(Into::into));
            fill("mysql_port", mysql.port.map(Into::into));
            fill("mysql_user", mysql.user.clone().map(Into::into));
        }
    }
}
