pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "STRATUS_CONFIG_PATH";
pub const REGION_ENV: &str = "OS_REGION_NAME";
pub const PROJECT_ID_ENV: &str = "OS_PROJECT_ID";
pub const AUTH_TOKEN_ENV: &str = "OS_AUTH_TOKEN";
pub const DOMAIN_NAME_ENV: &str = "OS_DOMAIN_NAME";

const DEFAULT_CLOUD: &str = "otc.t-systems.com";
const CONFIG_FILE: &str = "config.yaml";

fn default_cloud() -> String {
    DEFAULT_CLOUD.to_string()
}

/// Settings shared by every service client of one provider instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub project_id: String,

    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub domain_name: Option<String>,

    /// Base domain endpoints are derived from
    #[serde(default = "default_cloud")]
    pub cloud: String,

    /// Per-service endpoint overrides, e.g. `vpc: https://vpc.example.test`
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    /// Per-resource-type timeout overrides
    #[serde(default)]
    pub timeouts: BTreeMap<String, TimeoutOverrides>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            project_id: String::new(),
            auth_token: None,
            domain_name: None,
            cloud: default_cloud(),
            endpoints: BTreeMap::new(),
            timeouts: BTreeMap::new(),
        }
    }
}

/// Timeout overrides in minutes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutOverrides {
    pub create: Option<u64>,
    pub delete: Option<u64>,
}

impl TimeoutOverrides {
    pub fn create(&self) -> Option<Duration> {
        self.create.map(minutes)
    }

    pub fn delete(&self) -> Option<Duration> {
        self.delete.map(minutes)
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

impl ProviderConfig {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No configuration file found, using environment only");
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Override file values with OS_* environment variables
    pub fn apply_env(&mut self) {
        if let Some(region) = env_value(REGION_ENV) {
            self.region = region;
        }
        if let Some(project_id) = env_value(PROJECT_ID_ENV) {
            self.project_id = project_id;
        }
        if let Some(token) = env_value(AUTH_TOKEN_ENV) {
            self.auth_token = Some(token);
        }
        if let Some(domain) = env_value(DOMAIN_NAME_ENV) {
            self.domain_name = Some(domain);
        }
    }

    /// Check that everything a service client needs is present
    pub fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(ConfigError::MissingField {
                field: "region",
                env: REGION_ENV,
            });
        }
        if self.project_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "project_id",
                env: PROJECT_ID_ENV,
            });
        }
        if self.auth_token.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingField {
                field: "auth_token",
                env: AUTH_TOKEN_ENV,
            });
        }
        for (service, url) in &self.endpoints {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidEndpoint {
                    service: service.clone(),
                    url: url.clone(),
                });
            }
        }
        Ok(())
    }

    /// Base URL of `service`, without a trailing slash
    pub fn endpoint(&self, service: &str) -> String {
        match self.endpoints.get(service) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}.{}", service, self.region, self.cloud),
        }
    }

    pub fn timeouts_for(&self, resource_type: &str) -> Option<&TimeoutOverrides> {
        self.timeouts.get(resource_type)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Stratus configuration directory (~/.config/stratus)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stratus");
    Ok(config_dir)
}

/// Locate the provider configuration file
///
/// Search order:
/// 1. STRATUS_CONFIG_PATH
/// 2. ./.stratus/config.yaml
/// 3. ~/.config/stratus/config.yaml
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let local = current_dir.join(".stratus").join(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
    }

    let global = get_config_dir().ok()?.join(CONFIG_FILE);
    global.exists().then_some(global)
}
