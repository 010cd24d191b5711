use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

fn default_port() -> u16 {
    8400
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub default_branch: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            default_branch: default_branch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub config_version: String,
    pub port: u16,
    pub github: GitHubConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            port: default_port(),
            github: GitHubConfig::default(),
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if matches!(
            self.github.token.as_deref(),
            Some(token) if token.trim().is_empty()
        ) {
            self.github.token = None;
        }
        if self.github.default_branch.trim().is_empty() {
            self.github.default_branch = default_branch();
        }

        self
    }
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &PathBuf) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, creating one");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &PathBuf) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.port, 8400);
        assert_eq!(config.github.default_branch, "main");
        assert!(config.github.token.is_none());
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let config = Config::from_raw("{ not json");
        assert_eq!(config.port, 8400);
    }

    #[test]
    fn partial_config_fills_missing_fields() {
        let config = Config::from_raw(r#"{ "port": 9000 }"#);
        assert_eq!(config.port, 9000);
        assert_eq!(config.github.default_branch, "main");
    }

    #[test]
    fn normalization_strips_blank_token_and_branch() {
        let config = Config::from_raw(
            r#"{ "github": { "token": "  ", "default_branch": "" } }"#,
        );
        assert!(config.github.token.is_none());
        assert_eq!(config.github.default_branch, "main");
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.port = 9123;
        config.github.token = Some("ghp_secret".to_string());
        save_config_to_file(&config, &path).await.unwrap();

        let loaded = load_config_from_file(&path).await;
        assert_eq!(loaded.port, 9123);
        assert_eq!(loaded.github.token.as_deref(), Some("ghp_secret"));
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from_file(&dir.path().join("absent.json")).await;
        assert_eq!(loaded.port, 8400);
    }
}
