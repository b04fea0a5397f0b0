use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".pr-status.toml";

/// Renders the title followed by a one-word status.
pub const DEFAULT_TEMPLATE: &str = r#"{%- set pr = githubPullRequest(project, repo, number) -%}
{{ pr.name }}: {% if pr.merged %}merged{% elif pr.declined %}declined{% elif pr.approved %}approved{% elif pr.inReview %}in review{% else %}waiting for review{% endif %}"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-status.toml.
/// All fields are optional; without a token the GitHub lookup is disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Message template rendered for each matched pull request
    #[serde(default = "default_template")]
    pub template: String,

    /// Deadline for handling one message, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    /// Web host that pull request links point at
    #[serde(default = "default_host")]
    pub host: String,

    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "github.com".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            template: default_template(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            host: default_host(),
            api_url: default_api_url(),
        }
    }
}

impl Config {
    /// Load configuration from .pr-status.toml in the current directory.
    /// Returns default config if the file doesn't exist. A token from the
    /// file wins over GITHUB_TOKEN.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token().is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GitHubConfig {
    /// The configured token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
