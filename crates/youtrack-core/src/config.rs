//! Process-wide server configuration.
//!
//! Configuration is assembled once at startup from environment variables
//! plus CLI overrides, and treated as immutable for the process lifetime.
//! The server holds no other state between requests.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// YouTrack instance base URL.
pub const ENV_YOUTRACK_URL: &str = "YOUTRACK_URL";
/// YouTrack permanent API token.
pub const ENV_YOUTRACK_TOKEN: &str = "YOUTRACK_TOKEN";
/// When truthy, all mutating tool calls are rejected.
pub const ENV_YOUTRACK_READ_ONLY: &str = "YOUTRACK_READ_ONLY";
/// Display name reported during MCP initialization.
pub const ENV_MCP_SERVER_NAME: &str = "MCP_SERVER_NAME";
/// Bind address for the HTTP/SSE transport.
pub const ENV_MCP_HOST: &str = "MCP_HOST";
/// Bind port for the HTTP/SSE transport.
pub const ENV_MCP_PORT: &str = "MCP_PORT";
/// Log level filter (trace/debug/info/warn/error).
pub const ENV_MCP_LOG_LEVEL: &str = "MCP_LOG_LEVEL";

const DEFAULT_SERVER_NAME: &str = "YouTrack MCP Server";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// YouTrack instance URL (e.g. `https://yourdomain.youtrack.cloud`)
    pub youtrack_url: String,
    /// YouTrack permanent token
    pub token: String,
    /// Reject all mutating tool calls
    pub read_only: bool,
    /// Server display name
    pub server_name: String,
    /// HTTP bind address
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Log level filter
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            youtrack_url: String::new(),
            token: String::new(),
            read_only: false,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing URL or token is not fatal at this point; operations fail
    /// with a configuration error when the client is actually used.
    pub fn from_env() -> Self {
        let youtrack_url = env_string(ENV_YOUTRACK_URL)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_default();
        let token = env_string(ENV_YOUTRACK_TOKEN).unwrap_or_default();

        if youtrack_url.is_empty() || token.is_empty() {
            warn!(
                "YouTrack URL or token not configured. Set {} and {} environment variables.",
                ENV_YOUTRACK_URL, ENV_YOUTRACK_TOKEN
            );
        }

        Self {
            youtrack_url,
            token,
            read_only: env_string(ENV_YOUTRACK_READ_ONLY)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            server_name: env_string(ENV_MCP_SERVER_NAME)
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            host: env_string(ENV_MCP_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_string(ENV_MCP_PORT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            log_level: env_string(ENV_MCP_LOG_LEVEL)
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Whether both the URL and the token are present.
    pub fn is_configured(&self) -> bool {
        !self.youtrack_url.is_empty() && !self.token.is_empty()
    }

    /// Whether debug logging is active.
    pub fn debug_mode(&self) -> bool {
        matches!(self.log_level.as_str(), "debug" | "trace")
    }

    /// The configured URL, or a placeholder for status reporting.
    pub fn display_url(&self) -> &str {
        if self.youtrack_url.is_empty() {
            "Not configured"
        } else {
            &self.youtrack_url
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse the common truthy spellings used for flag-style env vars.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
