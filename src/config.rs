//! Configuration for the Taskboard client.
//!
//! Settings are layered: `taskboard.toml` → environment (optionally seeded
//! from `.env`) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! base_url = "https://tasks.example.com"
//! jsonapi_path = "/jsonapi"
//! request_timeout_secs = 30
//!
//! [oauth]
//! client_id = "8f1c..."
//! client_secret = "..."
//!
//! [session]
//! check_interval_secs = 30
//! warning_lead_secs = 300
//! expired_grace_secs = 3
//!
//! [permissions]
//! super_admin_id = 1
//! admin_roles = ["administrator", "board_admin"]
//!
//! [presence]
//! heartbeat_secs = 30
//!
//! [uploads]
//! max_bytes = 10485760
//! ```

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

pub const ENV_BASE_URL: &str = "TASKBOARD_BASE_URL";
pub const ENV_CLIENT_ID: &str = "TASKBOARD_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TASKBOARD_CLIENT_SECRET";
pub const ENV_SUPER_ADMIN_ID: &str = "TASKBOARD_SUPER_ADMIN_ID";

const CONFIG_FILE_NAME: &str = "taskboard.toml";

/// Backend location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix of the JSON:API resource endpoints
    #[serde(default = "default_jsonapi_path")]
    pub jsonapi_path: String,
    /// Per-request timeout; unset leaves the HTTP stack default in place
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_jsonapi_path() -> String {
    "/jsonapi".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            jsonapi_path: default_jsonapi_path(),
            request_timeout_secs: None,
        }
    }
}

/// OAuth2 client credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Session monitor timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// How long before expiry the `expiring` warning starts
    #[serde(default = "default_warning_lead_secs")]
    pub warning_lead_secs: u64,
    /// Delay between the `expired` event and the forced logout
    #[serde(default = "default_expired_grace_secs")]
    pub expired_grace_secs: u64,
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_warning_lead_secs() -> u64 {
    300
}

fn default_expired_grace_secs() -> u64 {
    3
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            warning_lead_secs: default_warning_lead_secs(),
            expired_grace_secs: default_expired_grace_secs(),
        }
    }
}

/// Permission bypass rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Numeric user id that bypasses every check
    #[serde(default = "default_super_admin_id")]
    pub super_admin_id: Option<u64>,
    /// Backend role names that bypass every check. `administrator` always
    /// does, listed here or not.
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,
}

fn default_super_admin_id() -> Option<u64> {
    Some(1)
}

fn default_admin_roles() -> Vec<String> {
    vec!["administrator".to_string(), "board_admin".to_string()]
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            super_admin_id: default_super_admin_id(),
            admin_roles: default_admin_roles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

impl Config {
    /// Default location: `<config dir>/taskboard/taskboard.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("taskboard").join(CONFIG_FILE_NAME))
    }

    /// Load from `path` (which must exist) or from the default location (which
    /// may be absent), then apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment values. `lookup` is injected so tests never touch
    /// the real process environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.server.base_url = url;
        }
        if let Some(id) = lookup(ENV_CLIENT_ID).filter(|v| !v.is_empty()) {
            self.oauth.client_id = Some(id);
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.oauth.client_secret = Some(secret);
        }
        if let Some(raw) = lookup(ENV_SUPER_ADMIN_ID) {
            match raw.trim() {
                "" | "none" => self.permissions.super_admin_id = None,
                value => match value.parse() {
                    Ok(id) => self.permissions.super_admin_id = Some(id),
                    Err(_) => tracing::warn!(
                        value,
                        "ignoring non-numeric {}",
                        ENV_SUPER_ADMIN_ID
                    ),
                },
            }
        }
    }

    /// Parsed base URL, always ending in `/` so relative joins keep its path.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.server.base_url.trim();
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };
        Url::parse(&normalized).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })
    }

    pub fn client_id(&self) -> Result<&str, ConfigError> {
        self.oauth
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingClientId)
    }

    /// Check everything a client needs before it is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        self.client_id()?;
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.session.check_interval_secs.max(1))
    }

    pub fn warning_lead(&self) -> Duration {
        Duration::from_secs(self.session.warning_lead_secs)
    }

    pub fn expired_grace(&self) -> Duration {
        Duration::from_secs(self.session.expired_grace_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.presence.heartbeat_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.server.request_timeout_secs.map(Duration::from_secs)
    }

    /// Minimal configuration pointing at `base_url`, used by tests and demos.
    pub fn for_base_url(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.server.base_url = base_url.into();
        config.oauth.client_id = Some(client_id.into());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.jsonapi_path, "/jsonapi");
        assert_eq!(config.check_interval(), Duration::from_secs(30));
        assert_eq!(config.warning_lead(), Duration::from_secs(300));
        assert_eq!(config.expired_grace(), Duration::from_secs(3));
        assert_eq!(config.permissions.super_admin_id, Some(1));
        assert!(config.permissions.admin_roles.contains(&"administrator".to_string()));
        assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskboard.toml");
        std::fs::write(
            &path,
            r#"
[server]
base_url = "https://tasks.example.com"

[session]
warning_lead_secs = 120

[permissions]
admin_roles = ["site_admin"]
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.base_url, "https://tasks.example.com");
        assert_eq!(config.server.jsonapi_path, "/jsonapi");
        assert_eq!(config.session.warning_lead_secs, 120);
        assert_eq!(config.session.check_interval_secs, 30);
        assert_eq!(config.permissions.admin_roles, vec!["site_admin".to_string()]);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskboard.toml");
        std::fs::write(&path, "[server\nbase_url = 1").unwrap();

        match Config::from_file(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        config.apply_env_from(env(&[
            (ENV_BASE_URL, "https://env.example.com"),
            (ENV_CLIENT_ID, "client-from-env"),
            (ENV_CLIENT_SECRET, "shh"),
            (ENV_SUPER_ADMIN_ID, "42"),
        ]));

        assert_eq!(config.server.base_url, "https://env.example.com");
        assert_eq!(config.client_id().unwrap(), "client-from-env");
        assert_eq!(config.oauth.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.permissions.super_admin_id, Some(42));
    }

    #[test]
    fn test_env_can_disable_super_admin() {
        let mut config = Config::default();
        config.apply_env_from(env(&[(ENV_SUPER_ADMIN_ID, "none")]));
        assert_eq!(config.permissions.super_admin_id, None);
    }

    #[test]
    fn test_env_ignores_garbage_super_admin() {
        let mut config = Config::default();
        config.apply_env_from(env(&[(ENV_SUPER_ADMIN_ID, "root")]));
        assert_eq!(config.permissions.super_admin_id, Some(1));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = Config::for_base_url("https://tasks.example.com/app", "id");
        let url = config.base_url().unwrap();
        assert_eq!(url.as_str(), "https://tasks.example.com/app/");
        assert_eq!(
            url.join("oauth/token").unwrap().as_str(),
            "https://tasks.example.com/app/oauth/token"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = Config::for_base_url("not a url", "id");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_missing_client_id() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingClientId)));
    }
}
