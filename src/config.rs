use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rpc::{Endpoint, ids};

/// Overrides the build label without touching the config file.
pub const BUILD_LABEL_ENV: &str = "NOTEBOOKLM_BL";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// `bl` query parameter; the frontend release this client imitates
    pub build_label: String,
    /// `hl` query parameter
    pub language: String,
    pub user_agent: String,
    pub timeouts: TimeoutConfig,
}

/// All values in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect: u64,
    /// Per-read timeout while streaming downloads
    pub read: u64,
    pub default_call: u64,
    pub source_add: u64,
    pub query: u64,
    pub import: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: 10,
            read: 30,
            default_call: 30,
            source_add: 120,
            query: 120,
            import: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect)
    }
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read)
    }
    pub fn default_call(&self) -> Duration {
        Duration::from_secs(self.default_call)
    }
    pub fn source_add(&self) -> Duration {
        Duration::from_secs(self.source_add)
    }
    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query)
    }
    pub fn import(&self) -> Duration {
        Duration::from_secs(self.import)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: ids::BASE_URL.to_string(),
            build_label: ids::DEFAULT_BUILD_LABEL.to_string(),
            language: "en".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `~/.notebooklm-rpc/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".notebooklm-rpc")
            .join("config.toml")
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file does not exist. `NOTEBOOKLM_BL` is applied last.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", config_path.display())))?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(label) = std::env::var(BUILD_LABEL_ENV) {
            let label = label.trim();
            if !label.is_empty() {
                self.build_label = label.to_string();
            }
        }
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: self.base_url.clone(),
            build_label: self.build_label.clone(),
            language: self.language.clone(),
        }
    }
}
