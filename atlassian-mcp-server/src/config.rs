//! Configuration management for the Atlassian MCP Server
//!
//! Handles loading configuration from environment variables, TOML files,
//! and provides sensible defaults for all settings. The loaded value is
//! immutable and handed to the client at construction time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

/// Main configuration structure for the Atlassian MCP Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlassianConfig {
    /// Atlassian instance URL, e.g. https://example.atlassian.net (required)
    pub instance_url: String,

    /// Authentication configuration (required)
    pub auth: AuthConfig,

    /// HTTP request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Page size used when scanning boards for a sprint by name (default: 100)
    pub board_scan_limit: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuthConfig {
    /// Atlassian Cloud: account email + API token over basic auth
    Basic { email: String, api_token: String },

    /// Bearer token (Data Center personal access tokens)
    Bearer(String),

    /// Anonymous access (limited functionality)
    Anonymous,
}

impl Default for AtlassianConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            auth: AuthConfig::Anonymous,
            request_timeout_seconds: 30,
            board_scan_limit: 100,
        }
    }
}

impl AtlassianConfig {
    /// Load configuration from environment variables, TOML file, and defaults
    /// Priority: env vars > TOML file > defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(file_config) = Self::load_from_file("config/atlassian-mcp-config.toml") {
            info!("Loaded configuration from TOML file");
            config = file_config;
        } else if let Ok(file_config) = Self::load_from_file("atlassian-mcp-config.toml") {
            info!("Loaded configuration from TOML file in current directory");
            config = file_config;
        } else {
            debug!("No TOML configuration file found, using defaults and environment variables");
        }

        config.load_from_env()?;
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    fn load_from_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("ATLASSIAN_INSTANCE_URL") {
            self.instance_url = url;
            debug!("Loaded ATLASSIAN_INSTANCE_URL from environment");
        }

        let email = env::var("ATLASSIAN_EMAIL").ok();
        let token = env::var("ATLASSIAN_API_TOKEN").ok();

        match env::var("ATLASSIAN_AUTH_TYPE")
            .map(|t| t.to_lowercase())
            .as_deref()
        {
            Ok("basic") => {
                let email = email.context("ATLASSIAN_EMAIL required for basic authentication")?;
                let api_token =
                    token.context("ATLASSIAN_API_TOKEN required for basic authentication")?;
                self.auth = AuthConfig::Basic { email, api_token };
                debug!("Configured basic authentication from environment");
            }
            Ok("bearer") => {
                let token =
                    token.context("ATLASSIAN_API_TOKEN required for bearer authentication")?;
                self.auth = AuthConfig::Bearer(token);
                debug!("Configured bearer token authentication from environment");
            }
            Ok("anonymous") => {
                self.auth = AuthConfig::Anonymous;
                debug!("Configured anonymous authentication from environment");
            }
            Ok(other) => {
                warn!("Unknown ATLASSIAN_AUTH_TYPE: {}, using default", other);
            }
            Err(_) => {
                if let (Some(email), Some(api_token)) = (email, token) {
                    self.auth = AuthConfig::Basic { email, api_token };
                    debug!("Configured basic authentication from ATLASSIAN_EMAIL/ATLASSIAN_API_TOKEN");
                }
            }
        }

        if let Ok(timeout) = env::var("ATLASSIAN_REQUEST_TIMEOUT") {
            if let Ok(timeout_seconds) = timeout.parse::<u64>() {
                self.request_timeout_seconds = timeout_seconds;
                debug!(
                    "Set request timeout to {} seconds from environment",
                    timeout_seconds
                );
            }
        }

        if let Ok(limit) = env::var("ATLASSIAN_BOARD_SCAN_LIMIT") {
            if let Ok(limit) = limit.parse::<u32>() {
                self.board_scan_limit = limit;
                debug!("Set board scan limit to {} from environment", limit);
            }
        }

        Ok(())
    }

    /// Strip trailing slashes so request paths can be appended directly
    pub(crate) fn normalize(&mut self) {
        let trimmed = self.instance_url.trim().trim_end_matches('/').to_string();
        self.instance_url = trimmed;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.instance_url.is_empty() {
            return Err(anyhow::anyhow!(
                "Instance URL is required. Set ATLASSIAN_INSTANCE_URL environment variable or configure in TOML file."
            ));
        }

        if !self.instance_url.starts_with("http://") && !self.instance_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "Instance URL must start with http:// or https://. Got: {}",
                self.instance_url
            ));
        }

        match &self.auth {
            AuthConfig::Basic { email, api_token } => {
                if email.is_empty() || api_token.is_empty() {
                    return Err(anyhow::anyhow!(
                        "Email and API token cannot be empty for basic auth"
                    ));
                }
            }
            AuthConfig::Bearer(token) => {
                if token.is_empty() {
                    return Err(anyhow::anyhow!("Bearer token cannot be empty"));
                }
            }
            AuthConfig::Anonymous => {
                info!("Using anonymous authentication - functionality may be limited");
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if self.board_scan_limit == 0 {
            return Err(anyhow::anyhow!("board_scan_limit must be greater than 0"));
        }

        info!("Configuration validation successful");
        Ok(())
    }

    /// Build and validate a configuration without touching the environment
    pub fn new(instance_url: impl Into<String>, auth: AuthConfig) -> Result<Self> {
        let mut config = Self {
            instance_url: instance_url.into(),
            auth,
            ..Default::default()
        };
        config.normalize();
        config.validate()?;
        Ok(config)
    }
}
