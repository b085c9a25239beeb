//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with MURAJAAT_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the token signing key and the bot token should be kept in
//! environment variables, not in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub bind_address: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Murajaat".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret (should be in env var MURAJAAT_AUTH_SECRET)
    #[serde(default)]
    pub secret: String,
    /// Bearer token lifetime in minutes
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_minutes: 60,
        }
    }
}

/// Content limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum evidence upload size in MB
    pub max_upload_size_mb: u32,
    /// Default page size for listings
    pub per_page: u32,
    /// Days granted to an organization before the appeal deadline
    pub default_deadline_days: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size_mb: 20,
            per_page: 10,
            default_deadline_days: 15,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded evidence files
    pub local_path: String,
    /// Public mount point the files are served from
    pub public_route: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: "./appeal-files".to_string(),
            public_route: "/appeal-files".to_string(),
        }
    }
}

/// Outbound bot channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot API token (should be in env var MURAJAAT_BOT_TOKEN)
    #[serde(default)]
    pub token: String,
    /// API base URL, without the token segment
    pub api_base: String,
    /// Delivery request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_seconds: 15,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
    pub bot: BotConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (MURAJAAT_ prefix)
            // e.g., MURAJAAT_AUTH_SECRET, MURAJAAT_BOT_TOKEN
            .add_source(
                Environment::with_prefix("MURAJAAT")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = APP_CONFIG.read().unwrap();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

// Convenience functions for accessing global config

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get site configuration
pub fn site() -> SiteConfig {
    get_config().site
}

/// Get session token configuration
pub fn auth() -> AuthConfig {
    get_config().auth
}

/// Get limits configuration
pub fn limits() -> LimitsConfig {
    get_config().limits
}

/// Get storage configuration
pub fn storage() -> StorageConfig {
    get_config().storage
}

/// Get bot channel configuration
pub fn bot() -> BotConfig {
    get_config().bot
}
