//! Configuration management for medchat.

mod persona;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::client::{DEFAULT_BASE_URL, HttpClient};
use crate::core::{Mode, Profile, RequestBuilder};

pub use persona::Persona;

/// Environment variable overriding `server.base_url`.
pub const BASE_URL_ENV: &str = "MEDCHAT_BASE_URL";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Assistant service configuration.
    pub server: ServerConfig,

    /// Health profile attached to medication questions.
    pub profile: Profile,

    /// Persona used in companion mode.
    pub companion: Persona,

    /// Local store configuration.
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// Loads global config first, then merges project-local config if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let global_path = Self::config_path()?;
        let project_path = Self::project_config_path().ok();
        Self::load_from_paths(&global_path, project_path.as_deref())
    }

    /// Load `global`, then merge `project` over it. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from_paths(global: &Path, project: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = if global.exists() {
            let contents = std::fs::read_to_string(global)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Some(project_path) = project {
            if project_path.exists() {
                let contents = std::fs::read_to_string(project_path)?;
                let project_config: Self = toml::from_str(&contents)?;
                config.merge(project_config);
                tracing::debug!(path = %project_path.display(), "merged project config");
            }
        }

        Ok(config)
    }

    /// Get the project-local configuration file path.
    ///
    /// Looks for `.medchat/config.toml` in the current directory.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(".medchat").join("config.toml"))
    }

    /// Merge another config into this one (project overrides global).
    fn merge(&mut self, other: Self) {
        if other.server.base_url != ServerConfig::default().base_url {
            self.server.base_url = other.server.base_url;
        }
        if other.server.timeout_secs.is_some() {
            self.server.timeout_secs = other.server.timeout_secs;
        }

        let profile = other.profile;
        for (current, incoming) in [
            (&mut self.profile.age, profile.age),
            (&mut self.profile.gender, profile.gender),
            (&mut self.profile.conditions, profile.conditions),
            (&mut self.profile.medications, profile.medications),
        ] {
            if !incoming.trim().is_empty() {
                *current = incoming;
            }
        }

        if other.companion != Persona::default() {
            self.companion = other.companion;
        }
        if other.store.path.is_some() {
            self.store.path = other.store.path;
        }
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/medchat/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("medchat"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("medchat"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("medchat"))
    }

    /// Get the data directory path (`~/.local/share/medchat/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn data_dir() -> anyhow::Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine data directory"))?;

        Ok(base.data_dir().join("medchat"))
    }

    /// Path of the conversation database.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory cannot be determined.
    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("medchat.db")),
        }
    }

    /// Build the HTTP client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn create_client(&self) -> anyhow::Result<HttpClient> {
        Ok(HttpClient::new(
            self.server.base_url(),
            self.server.timeout(),
        )?)
    }

    /// Request builder carrying the profile and the companion preamble.
    #[must_use]
    pub fn request_builder(&self) -> RequestBuilder {
        RequestBuilder::new(self.profile.clone(), self.companion.build_system_prompt())
    }

    /// Get the state file path for persisting runtime state
    fn state_path() -> anyhow::Result<PathBuf> {
        Ok(Self::data_dir()?.join("state.json"))
    }

    /// Save the preferred mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn save_mode(mode: Mode) -> anyhow::Result<()> {
        Self::save_mode_to_path(mode, &Self::state_path()?)
    }

    pub fn save_mode_to_path(mode: Mode, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = serde_json::json!({ "mode": mode.as_str() });
        std::fs::write(path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    /// Load the preferred mode.
    ///
    /// Returns the default mode (assistant) if no state file exists or parsing fails.
    #[must_use]
    pub fn load_mode() -> Mode {
        Self::state_path()
            .map(|path| Self::load_mode_from_path(&path))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn load_mode_from_path(path: &Path) -> Mode {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Mode::default();
        };

        let Ok(state) = serde_json::from_str::<serde_json::Value>(&contents) else {
            return Mode::default();
        };

        state
            .get("mode")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Save the profile to the config file, keeping every other setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or written.
    pub fn save_profile(profile: &Profile) -> anyhow::Result<()> {
        Self::save_profile_to_path(profile, &Self::config_path()?)
    }

    pub fn save_profile_to_path(profile: &Profile, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut config_value = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<toml::Value>(&contents)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let config_table = config_value
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("config root must be a table"))?;
        config_table.insert("profile".to_string(), toml::Value::try_from(profile)?);

        let toml_string = toml::to_string_pretty(&config_value)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

/// Assistant service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the service, without the endpoint path.
    /// Can also be set via `MEDCHAT_BASE_URL` environment variable.
    pub base_url: String,

    /// Request timeout. Unset means the HTTP client's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Get the base URL, preferring env var over config file.
    #[must_use]
    pub fn base_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.base_url.clone())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Local store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. Defaults to `medchat.db` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
