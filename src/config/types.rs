// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub script: ScriptConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Reuse connections for further requests
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers
    pub read_timeout: u64,
    /// Seconds to wait for open connections on shutdown
    pub shutdown_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    /// Directory holding the web client assets
    pub static_dir: String,
    pub index_files: Vec<String>,
}

/// External script configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScriptConfig {
    /// Command line handed to the platform shell, without stdin
    pub command: String,
    /// Working directory for the child (server cwd if not set)
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Kill the child after this many seconds (unbounded if not set)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Per-stream capture limit in bytes
    pub max_output_bytes: usize,
}
