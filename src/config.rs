use crate::chat::command::BRIDGE_API_KEY_VAR;
use crate::sketch::canvas::DEFAULT_MIN_POINT_DISTANCE;
use crate::tutor::DEFAULT_RETRIEVAL_DELAY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CHAT_COMMAND_VAR: &str = "SOLIDTUTOR_CHAT_COMMAND";
pub const RETRIEVAL_DELAY_VAR: &str = "SOLIDTUTOR_RETRIEVAL_DELAY_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bridge program and arguments. Empty means the offline tutor is used.
    pub chat_command: Vec<String>,
    /// Environment variable holding the chat credential.
    pub api_key_env: String,
    pub retrieval_delay_ms: u64,
    pub min_point_distance: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_command: Vec::new(),
            api_key_env: BRIDGE_API_KEY_VAR.to_string(),
            retrieval_delay_ms: DEFAULT_RETRIEVAL_DELAY.as_millis() as u64,
            min_point_distance: DEFAULT_MIN_POINT_DISTANCE,
        }
    }
}

impl AppConfig {
    /// Load `~/.solidtutor/config.json` (if present) and apply environment
    /// overrides. Problems are returned as warnings and defaults are kept.
    pub fn load() -> (Self, Vec<String>) {
        Self::load_with(&config_path(), |name| std::env::var(name).ok())
    }

    /// `SOLIDTUTOR_CHAT_COMMAND` is split on whitespace with no quoting, so a
    /// bridge whose path or arguments contain spaces has to be configured
    /// through the `chat_command` array in the file instead.
    pub fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut config = match read_config_file(path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(err) => {
                warnings.push(err.to_string());
                Self::default()
            }
        };

        if let Some(command) = env(CHAT_COMMAND_VAR) {
            config.chat_command = command.split_whitespace().map(str::to_string).collect();
        }
        if let Some(raw) = env(RETRIEVAL_DELAY_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(millis) => config.retrieval_delay_ms = millis,
                Err(err) => warnings.push(format!("ignoring {RETRIEVAL_DELAY_VAR}={raw}: {err}")),
            }
        }
        if !config.min_point_distance.is_finite() || config.min_point_distance < 0.0 {
            warnings.push(format!(
                "min_point_distance {} is invalid, using {DEFAULT_MIN_POINT_DISTANCE}",
                config.min_point_distance
            ));
            config.min_point_distance = DEFAULT_MIN_POINT_DISTANCE;
        }

        (config, warnings)
    }

    pub fn retrieval_delay(&self) -> Duration {
        Duration::from_millis(self.retrieval_delay_ms)
    }

    pub fn uses_bridge(&self) -> bool {
        !self.chat_command.is_empty()
    }

    pub fn api_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        env(&self.api_key_env).filter(|key| !key.trim().is_empty())
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> PathBuf {
    home_dir().join(".solidtutor").join("config.json")
}

fn read_config_file(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
