//! Gateway configuration.

use std::env;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub deployments: DeploymentsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    /// Number of logical workers. Values below 1 are treated as 1.
    #[serde(default = "default_worker_count")]
    pub count: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            window_secs: default_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Out-of-band admin secret. Empty means disabled.
    #[serde(default)]
    pub admin_key: Option<String>,
}

impl AuthConfig {
    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    /// Maximum number of retained usage entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeploymentsConfig {
    /// Delay before a new deployment becomes ready.
    #[serde(default)]
    pub ready_delay_ms: u64,
}

impl DeploymentsConfig {
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated allowed origins, `*` for any.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl CorsConfig {
    pub fn origin_list(&self) -> Vec<String> {
        self.origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }

    pub fn allows_any(&self) -> bool {
        let origins = self.origin_list();
        origins.is_empty() || origins.iter().any(|o| o == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_worker_count() -> usize {
    3
}
fn default_rpm() -> u32 {
    60
}
fn default_window_secs() -> u64 {
    60
}
fn default_max_entries() -> usize {
    100_000
}
fn default_cors_origins() -> String {
    "http://localhost:5173".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Flat environment variables kept for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("WORKER_COUNT", "workers.count"),
    ("RATE_LIMIT_RPM", "rate_limit.requests_per_minute"),
    ("CORS_ORIGINS", "cors.origins"),
    ("ADMIN_KEY", "auth.admin_key"),
];

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Legacy flat variables (`PORT`, `WORKER_COUNT`, `RATE_LIMIT_RPM`, `CORS_ORIGINS`, `ADMIN_KEY`)
    /// 2. Environment variables (GPU_CLOUD__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("workers.count", default_worker_count() as i64)?
            .set_default("rate_limit.requests_per_minute", default_rpm() as i64)?
            .set_default("rate_limit.window_secs", default_window_secs() as i64)?
            .set_default("usage.max_entries", default_max_entries() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("GPU_CLOUD")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }
}
