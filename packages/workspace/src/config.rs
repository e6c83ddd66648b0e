use crate::WorkspaceError;
use clonup_snapshot::{ManagedDomainSet, DEFAULT_MANAGED_ROOT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "clonup.config.json";

/// Environment variable holding the hosting API bearer token
pub const TOKEN_ENV: &str = "CLONUP_API_TOKEN";

/// Clonup configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the hosting API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Root domains clones are served under; the first is canonical
    #[serde(default = "default_managed_domains")]
    pub managed_domains: Vec<String>,

    /// Seconds between domain verification attempts
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Never read from or written to the file
    #[serde(skip)]
    pub api_token: Option<String>,
}

fn default_api_base_url() -> String {
    "https://api.clonup.site/v1/".to_string()
}

fn default_managed_domains() -> Vec<String> {
    vec![DEFAULT_MANAGED_ROOT.to_string()]
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: &Path) -> Result<Self, WorkspaceError> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        let config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Config::default()
        };
        Ok(config.with_token(std::env::var(TOKEN_ENV).ok()))
    }

    pub fn from_path(path: &Path) -> Result<Self, WorkspaceError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn validate(&self) -> Result<(), WorkspaceError> {
        url::Url::parse(&self.api_base_url)
            .map_err(|e| WorkspaceError::Config(format!("apiBaseUrl: {e}")))?;
        if self.poll_interval_secs == 0 {
            return Err(WorkspaceError::Config(
                "pollIntervalSecs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// URL aliases of one clone under the configured roots
    pub fn domains_for(&self, subdomain: &str) -> ManagedDomainSet {
        ManagedDomainSet::new(subdomain, &self.managed_domains)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            managed_domains: default_managed_domains(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            api_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "apiBaseUrl": "http://localhost:8080/api/",
            "managedDomains": ["clonup.site", "clonup.dev"],
            "pollIntervalSecs": 5
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080/api/");
        assert_eq!(config.managed_domains, vec!["clonup.site", "clonup.dev"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn test_token_is_never_serialized() {
        let config = Config::default().with_token(Some("secret".to_string()));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(DEFAULT_CONFIG_NAME)).unwrap();
        write!(file, r#"{{ "managedDomains": ["example.net"] }}"#).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.managed_domains, vec!["example.net"]);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(
            config.domains_for("shop").canonical(),
            "https://shop.example.net"
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        std::fs::write(&path, r#"{ "pollIntervalSecs": 0 }"#).unwrap();
        assert!(matches!(
            Config::from_path(&path),
            Err(WorkspaceError::Config(_))
        ));
    }
}
