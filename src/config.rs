use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::config::ClientConfig;
use crate::api::datastore::DEFAULT_NAMESPACE;
use crate::import::ImportSettings;

/// API root used when `WIZARD_ENV=development`
pub const DEV_BASE_URL: &str = "http://localhost:8989/dhis/api";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
    pub user_agent: Option<String>,
    #[serde(default = "default_true")]
    pub request_logging: bool,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_operation_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
            user_agent: None,
            request_logging: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// dataStore namespace holding the mappings
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Only list mappings of this program
    pub program: Option<String>,
}

fn default_batch_size() -> usize {
    50
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            namespace: default_namespace(),
            program: None,
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("import-wizard")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".import-wizard")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        if !path.exists() {
            info!("Config file {:?} doesn't exist, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        if config.import.batch_size == 0 {
            anyhow::bail!("import.batch_size must be at least 1 in {:?}", path);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
                info!("Created config directory: {:?}", dir);
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let settings = &self.client;
        let mut builder = ClientConfig::builder()
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .operation_timeout(Duration::from_secs(settings.operation_timeout_secs))
            .request_logging(settings.request_logging);
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            batch_size: self.import.batch_size.max(1),
            operation_timeout: Duration::from_secs(self.client.operation_timeout_secs),
        }
    }
}

/// Values read from the process environment (and `.env`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// URL the wizard is served from, for base URL derivation
    pub location: Option<String>,
    pub development: bool,
}

impl EnvVars {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: get("DHIS2_BASE_URL"),
            username: get("DHIS2_USERNAME"),
            password: get("DHIS2_PASSWORD"),
            location: get("DHIS2_LOCATION"),
            development: get("WIZARD_ENV").is_some_and(|v| v.eq_ignore_ascii_case("development")),
        }
    }
}

/// Connection settings given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Merge connection settings: CLI flag, then env, then file, then derived
pub fn resolve_server(cli: &Overrides, env: &EnvVars, file: &Config) -> Result<ServerSettings> {
    let base_url = match cli
        .base_url
        .clone()
        .or_else(|| env.base_url.clone())
        .or_else(|| file.server.base_url.clone())
    {
        Some(url) => url,
        None if env.development => DEV_BASE_URL.to_string(),
        None => match &env.location {
            Some(location) => derive_api_base_url(location)?,
            None => anyhow::bail!(
                "No DHIS2 base URL configured; pass --base-url, set DHIS2_BASE_URL or add [server] base_url to the config file"
            ),
        },
    };

    Ok(ServerSettings {
        base_url,
        username: cli
            .username
            .clone()
            .or_else(|| env.username.clone())
            .or_else(|| file.server.username.clone()),
        password: cli
            .password
            .clone()
            .or_else(|| env.password.clone())
            .or_else(|| file.server.password.clone()),
    })
}

/// API root for a wizard served from `location`.
///
/// `https://host/dhis/api/apps/wizard/index.html` → `https://host/dhis/api`,
/// `https://host/api/apps/wizard/` → `https://host/api`.
pub fn derive_api_base_url(location: &str) -> Result<String> {
    let url = reqwest::Url::parse(location)
        .with_context(|| format!("Invalid DHIS2_LOCATION '{}'", location))?;
    let host = url
        .host_str()
        .with_context(|| format!("DHIS2_LOCATION '{}' has no host", location))?;

    let segments: Vec<&str> = url.path().split('/').collect();
    let context = match segments.iter().position(|s| *s == "api") {
        Some(idx) if idx > 1 => format!("/{}/", segments[idx - 1]),
        _ => "/".to_string(),
    };

    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Ok(format!("{}://{}{}api", url.scheme(), authority, context))
}
