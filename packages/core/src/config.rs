//! Configuration for the Mew service connection
//!
//! Values come from three layers, later ones overriding earlier ones:
//!
//! 1. Built-in defaults pointing at the public Mew edge deployment
//! 2. `~/.mew-clipper/config.json` (optional, every field optional)
//! 3. `MEW_*` environment variables
//!
//! Client credentials have no default and must be supplied through the file
//! or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

use crate::services::ClipperError;

/// Directory under the home directory holding config and persisted state
pub const CONFIG_DIR_NAME: &str = ".mew-clipper";

const CONFIG_FILE: &str = "config.json";

/// Upper bound for the per-request timeout
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// OAuth client-credentials settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthConfig {
    /// Auth0 tenant host, e.g. `tenant.us.auth0.com`
    ///
    /// A value with an explicit `http://` or `https://` scheme is used as-is.
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "ideaflow-mew-dev.us.auth0.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            audience: "https://ideaflow-mew-dev.us.auth0.com/api/v2/".to_string(),
        }
    }
}

impl AuthConfig {
    /// Client-credentials token endpoint
    pub fn token_endpoint(&self) -> String {
        let domain = self.domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{}/oauth/token", domain)
        } else {
            format!("https://{}/oauth/token", domain)
        }
    }
}

/// Mew connection settings
///
/// # Examples
///
/// ```rust
/// use mew_clipper_core::config::MewConfig;
///
/// let config = MewConfig::default();
/// assert_eq!(config.api_base_url, "https://mew-edge.ideaflow.app/api");
/// assert_eq!(config.node_host().as_deref(), Some("mew-edge.ideaflow.app"));
/// assert_eq!(config.request_timeout().as_secs(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MewConfig {
    /// Base of the sync API (`{base}/sync`, `{base}/layer`)
    pub api_base_url: String,

    /// Base of user-facing node URLs; its host is the only accepted host
    /// when parsing root URLs
    pub node_base_url: String,

    pub auth: AuthConfig,

    /// Timeout applied to every HTTP request
    pub request_timeout_secs: u64,
}

impl Default for MewConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://mew-edge.ideaflow.app/api".to_string(),
            node_base_url: "https://mew-edge.ideaflow.app/".to_string(),
            auth: AuthConfig::default(),
            request_timeout_secs: 10,
        }
    }
}

impl MewConfig {
    /// Defaults overridden by `MEW_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Defaults, then the config file (if present), then the environment
    pub async fn load() -> Result<Self, ClipperError> {
        let mut config = match default_config_path() {
            Some(path) => Self::load_file(&path).await?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read a JSON config file; a missing file yields the defaults
    pub async fn load_file(path: &Path) -> Result<Self, ClipperError> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(|e| {
            ClipperError::storage(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ClipperError::configuration(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply `MEW_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    ///
    /// Empty values are ignored, as are timeouts that do not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("MEW_API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some(value) = get("MEW_NODE_BASE_URL") {
            self.node_base_url = value;
        }
        if let Some(value) = get("MEW_AUTH_DOMAIN") {
            self.auth.domain = value;
        }
        if let Some(value) = get("MEW_CLIENT_ID") {
            self.auth.client_id = value;
        }
        if let Some(value) = get("MEW_CLIENT_SECRET") {
            self.auth.client_secret = value;
        }
        if let Some(value) = get("MEW_AUDIENCE") {
            self.auth.audience = value;
        }
        if let Some(value) = get("MEW_REQUEST_TIMEOUT_SECS") {
            match value.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid MEW_REQUEST_TIMEOUT_SECS '{}'", value),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Client id stamped on sync transactions
    pub fn sync_client_id(&self) -> &str {
        &self.auth.client_id
    }

    /// Host (with port, when not the scheme default) of [`Self::node_base_url`]
    pub fn node_host(&self) -> Option<String> {
        let url = Url::parse(&self.node_base_url).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("node_base_url", &self.node_base_url),
        ] {
            let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("{} must use http or https", name));
            }
        }

        if self.node_host().is_none() {
            return Err("node_base_url must include a host".to_string());
        }

        if self.auth.domain.trim().is_empty() {
            return Err("auth domain cannot be empty".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(format!(
                "request_timeout_secs cannot exceed {}",
                MAX_REQUEST_TIMEOUT_SECS
            ));
        }

        Ok(())
    }

    /// Whether client credentials are present
    ///
    /// Without them token acquisition fails and requests go out with the
    /// placeholder token.
    pub fn has_credentials(&self) -> bool {
        !self.auth.client_id.is_empty() && !self.auth.client_secret.is_empty()
    }
}

/// `~/.mew-clipper`
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

/// `~/.mew-clipper/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MewConfig::default();
        assert_eq!(config.api_base_url, "https://mew-edge.ideaflow.app/api");
        assert_eq!(config.node_base_url, "https://mew-edge.ideaflow.app/");
        assert_eq!(config.auth.domain, "ideaflow-mew-dev.us.auth0.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_endpoint() {
        let mut auth = AuthConfig::default();
        assert_eq!(
            auth.token_endpoint(),
            "https://ideaflow-mew-dev.us.auth0.com/oauth/token"
        );

        auth.domain = "http://127.0.0.1:4000/".to_string();
        assert_eq!(auth.token_endpoint(), "http://127.0.0.1:4000/oauth/token");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEW_API_BASE_URL", "http://localhost:9000/api"),
            ("MEW_CLIENT_ID", "client-abc"),
            ("MEW_CLIENT_SECRET", "secret"),
            ("MEW_AUDIENCE", ""),
            ("MEW_REQUEST_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = MewConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://localhost:9000/api");
        assert_eq!(config.sync_client_id(), "client-abc");
        assert!(config.has_credentials());
        // Empty values leave the default alone
        assert_eq!(config.auth.audience, AuthConfig::default().audience);
        assert_eq!(config.request_timeout_secs, 3);
    }

    #[test]
    fn test_invalid_timeout_override_ignored() {
        let mut config = MewConfig::default();
        config.apply_overrides(|key| {
            (key == "MEW_REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_config_validation() {
        let mut config = MewConfig::default();
        assert!(config.validate().is_ok());

        config.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api_base_url = "ftp://mew-edge.ideaflow.app/api".to_string();
        assert!(config.validate().is_err());

        config = MewConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = MAX_REQUEST_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        config = MewConfig::default();
        config.auth.domain = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_file_partial_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let missing = MewConfig::load_file(&path).await.unwrap();
        assert_eq!(missing, MewConfig::default());

        std::fs::write(
            &path,
            r#"{"nodeBaseUrl": "http://localhost:3000/", "auth": {"clientId": "from-file"}}"#,
        )
        .unwrap();
        let loaded = MewConfig::load_file(&path).await.unwrap();
        assert_eq!(loaded.node_host().as_deref(), Some("localhost:3000"));
        assert_eq!(loaded.auth.client_id, "from-file");
        assert_eq!(loaded.auth.domain, "ideaflow-mew-dev.us.auth0.com");
        assert_eq!(loaded.api_base_url, "https://mew-edge.ideaflow.app/api");
    }

    #[tokio::test]
    async fn test_load_file_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = MewConfig::load_file(&path).await.unwrap_err();
        assert!(matches!(err, ClipperError::Configuration { .. }));
    }
}
