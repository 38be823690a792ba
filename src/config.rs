use crate::client::sftp::HostKeyPolicy;
use crate::dispatch::LockScope;
use anyhow::{anyhow, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROBE_FILE: &str = "_altoTest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub lock_scope: LockScope,
    #[serde(default = "default_verify_host_keys")]
    pub verify_host_keys: bool,
    /// Overrides `~/.ssh/known_hosts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_hosts_path: Option<PathBuf>,
    /// Remote file written and removed by `testConnection`.
    #[serde(default = "default_probe_file_name")]
    pub probe_file_name: String,
}

const fn default_verify_host_keys() -> bool {
    true
}

fn default_probe_file_name() -> String {
    DEFAULT_PROBE_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_scope: LockScope::default(),
            verify_host_keys: default_verify_host_keys(),
            known_hosts_path: None,
            probe_file_name: default_probe_file_name(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path =
            Self::config_path().ok_or_else(|| anyhow!("No configuration directory available"))?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "remote-mover", "remote-mover")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn host_key_policy(&self) -> Result<HostKeyPolicy> {
        if !self.verify_host_keys {
            return Ok(HostKeyPolicy::AcceptAny);
        }

        let known_hosts = match &self.known_hosts_path {
            Some(path) => path.clone(),
            None => BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
                .ok_or_else(|| anyhow!("Cannot determine home directory for known_hosts"))?,
        };
        Ok(HostKeyPolicy::Verify { known_hosts })
    }
}
