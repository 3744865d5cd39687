//! Error types and handling for the Atlassian MCP Server
//!
//! Provides structured error types that map to MCP JSON-RPC error codes
//! and converts errors from the HTTP, JSON and config layers into them.

use serde_json::Value;
use thiserror::Error;

/// Custom error types for the Atlassian MCP Server
#[derive(Debug, Error)]
pub enum AtlassianMcpError {
    /// Configuration errors (-32001)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Authentication failures (-32002)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Network errors (-32003)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Permission denied errors (-32004)
    #[error("Permission denied: {message}")]
    Permission { message: String },

    /// Resource not found errors (-32005)
    #[error("Not found: {resource} '{key}' not found")]
    NotFound { resource: String, key: String },

    /// Invalid parameter errors (-32006)
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Non-2xx response from Jira or Confluence
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Internal server errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AtlassianMcpError {
    /// Get the MCP JSON-RPC error code for this error
    pub fn error_code(&self) -> i32 {
        match self {
            AtlassianMcpError::Configuration { .. } => -32001,
            AtlassianMcpError::Authentication { .. } => -32002,
            AtlassianMcpError::Network { .. } => -32003,
            AtlassianMcpError::Permission { .. } => -32004,
            AtlassianMcpError::NotFound { .. } => -32005,
            AtlassianMcpError::InvalidParameter { .. } => -32006,
            AtlassianMcpError::Http { status, .. } => match status {
                401 => -32002,
                403 => -32004,
                404 => -32005,
                429 => -32007,
                _ => -32003,
            },
            AtlassianMcpError::Internal { .. } => -32603,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AtlassianMcpError::Configuration { .. } => "configuration",
            AtlassianMcpError::Authentication { .. } => "authentication",
            AtlassianMcpError::Network { .. } => "network",
            AtlassianMcpError::Permission { .. } => "permission",
            AtlassianMcpError::NotFound { .. } => "not_found",
            AtlassianMcpError::InvalidParameter { .. } => "invalid_parameter",
            AtlassianMcpError::Http { .. } => "http",
            AtlassianMcpError::Internal { .. } => "internal",
        }
    }

    /// Get additional error data for MCP error responses
    pub fn error_data(&self) -> Option<Value> {
        let mut data = serde_json::Map::new();
        data.insert(
            "category".to_string(),
            Value::String(self.category().to_string()),
        );

        match self {
            AtlassianMcpError::Http { status, body } => {
                data.insert("status".to_string(), Value::Number((*status).into()));
                data.insert("body".to_string(), Value::String(body.clone()));
            }
            AtlassianMcpError::NotFound { resource, key } => {
                data.insert("resource".to_string(), Value::String(resource.clone()));
                data.insert("key".to_string(), Value::String(key.clone()));
            }
            AtlassianMcpError::InvalidParameter { parameter, .. } => {
                data.insert("parameter".to_string(), Value::String(parameter.clone()));
            }
            _ => {}
        }

        Some(Value::Object(data))
    }

    /// Upstream HTTP status, if this error came from a non-2xx response
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AtlassianMcpError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        AtlassianMcpError::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        AtlassianMcpError::Authentication {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        AtlassianMcpError::Network {
            message: message.into(),
        }
    }

    /// Create a permission error
    pub fn permission(message: impl Into<String>) -> Self {
        AtlassianMcpError::Permission {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, key: impl Into<String>) -> Self {
        AtlassianMcpError::NotFound {
            resource: resource.into(),
            key: key.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        AtlassianMcpError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error from an upstream status and body
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        AtlassianMcpError::Http {
            status,
            body: body.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        AtlassianMcpError::Internal {
            message: message.into(),
        }
    }
}

/// Convert from reqwest transport errors
impl From<reqwest::Error> for AtlassianMcpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AtlassianMcpError::network(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            AtlassianMcpError::internal(format!("Failed to decode response: {}", err))
        } else if let Some(status) = err.status() {
            AtlassianMcpError::http(status.as_u16(), err.to_string())
        } else {
            AtlassianMcpError::network(format!("HTTP transport error: {}", err))
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for AtlassianMcpError {
    fn from(err: serde_json::Error) -> Self {
        AtlassianMcpError::internal(format!("JSON error: {}", err))
    }
}

/// Convert from TOML parsing errors
impl From<toml::de::Error> for AtlassianMcpError {
    fn from(err: toml::de::Error) -> Self {
        AtlassianMcpError::config(format!("TOML parsing error: {}", err))
    }
}

/// Convert from generic anyhow errors
impl From<anyhow::Error> for AtlassianMcpError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        let lower_message = message.to_lowercase();

        if lower_message.contains("authentication") || lower_message.contains("unauthorized") {
            AtlassianMcpError::auth(message)
        } else if lower_message.contains("permission") || lower_message.contains("forbidden") {
            AtlassianMcpError::permission(message)
        } else if lower_message.contains("network")
            || lower_message.contains("connection")
            || lower_message.contains("timeout")
        {
            AtlassianMcpError::network(message)
        } else if lower_message.contains("config")
            || lower_message.contains("atlassian_")
            || lower_message.contains("url")
        {
            AtlassianMcpError::config(message)
        } else {
            AtlassianMcpError::internal(message)
        }
    }
}

/// Result type alias for Atlassian MCP operations
pub type AtlassianMcpResult<T> = Result<T, AtlassianMcpError>;
