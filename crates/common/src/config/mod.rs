//! Configuration management for Omnyla services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload intake limits and scratch storage
    #[serde(default)]
    pub upload: UploadConfig,

    /// External annotation tool
    #[serde(default)]
    pub annotator: AnnotatorConfig,

    /// Clinical trials registry
    #[serde(default)]
    pub trials: TrialsConfig,

    /// Narrative report agent
    #[serde(default)]
    pub report_agent: ReportAgentConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Overall analysis deadline in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Hard ceiling; larger uploads are rejected with 413
    #[serde(default = "default_max_upload")]
    pub max_bytes: u64,

    /// Uploads above this size skip extraction and get mock data
    #[serde(default = "default_mock_threshold")]
    pub mock_threshold_bytes: u64,

    /// Parent directory for per-request scratch directories
    pub scratch_dir: Option<PathBuf>,

    /// Scan the raw upload when the annotator fails instead of answering
    /// with the fallback table alone. Off by default.
    #[serde(default)]
    pub scan_on_annotator_failure: bool,

    /// Data lines read by the fallback scan
    #[serde(default = "default_max_scan_lines")]
    pub max_scan_lines: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnotatorConfig {
    /// Annotator provider: pharmcat, none
    #[serde(default = "default_annotator_provider")]
    pub provider: String,

    /// Java executable used to launch the jar
    #[serde(default = "default_java_path")]
    pub java_path: PathBuf,

    /// PharmCAT jar location
    #[serde(default = "default_jar_path")]
    pub jar_path: PathBuf,

    /// Invocation timeout in seconds
    #[serde(default = "default_annotator_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrialsConfig {
    /// Query the registry at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Registry search endpoint
    #[serde(default = "default_trials_url")]
    pub base_url: String,

    /// Maximum studies requested
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_trials_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportAgentConfig {
    /// Agent endpoint; reports are skipped when unset
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_agent_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (debug, info, warn, error, or a full EnvFilter string)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Serve Prometheus metrics on /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_upload() -> u64 { 100 * 1024 * 1024 }
fn default_mock_threshold() -> u64 { 4 * 1024 * 1024 }
fn default_max_scan_lines() -> usize { 100 }
fn default_annotator_provider() -> String { "pharmcat".to_string() }
fn default_java_path() -> PathBuf { PathBuf::from("java") }
fn default_jar_path() -> PathBuf { PathBuf::from("pharmcat/pharmcat-3.0.1-all.jar") }
fn default_annotator_timeout() -> u64 { 30 }
fn default_trials_url() -> String { "https://clinicaltrials.gov/api/v2/studies".to_string() }
fn default_page_size() -> u32 { 10 }
fn default_trials_timeout() -> u64 { 20 }
fn default_user_agent() -> String { "GenomicsApp/1.0".to_string() }
fn default_agent_timeout() -> u64 { 20 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "omnyla".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload(),
            mock_threshold_bytes: default_mock_threshold(),
            scratch_dir: None,
            scan_on_annotator_failure: false,
            max_scan_lines: default_max_scan_lines(),
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            provider: default_annotator_provider(),
            java_path: default_java_path(),
            jar_path: default_jar_path(),
            timeout_secs: default_annotator_timeout(),
        }
    }
}

impl Default for TrialsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_trials_url(),
            page_size: default_page_size(),
            timeout_secs: default_trials_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ReportAgentConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_agent_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__UPLOAD__MAX_BYTES=52428800
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Overall analysis deadline as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Parent of per-request scratch directories (falls back to the OS temp dir)
    pub fn scratch_root(&self) -> PathBuf {
        self.upload
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
