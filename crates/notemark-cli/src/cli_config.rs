//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use notemark_core::config::{ClientConfig, API_URL_ENV, USER_EMAIL_ENV};
use notemark_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI config directory"))
        .join("notemark")
        .join(CONFIG_FILE_NAME)
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Client settings: environment first, then this file, then built-in defaults.
    pub fn client_config(&self) -> Result<ClientConfig, String> {
        self.client_config_with(|key| std::env::var(key).ok())
    }

    pub fn client_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientConfig, String> {
        let api_base_url =
            normalize_text_option(lookup(API_URL_ENV)).or_else(|| self.api_base_url.clone());
        let user_email =
            normalize_text_option(lookup(USER_EMAIL_ENV)).or_else(|| self.user_email.clone());
        ClientConfig::new(api_base_url, user_email)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take());
        self.user_email = normalize_text_option(self.user_email.take());
    }
}
