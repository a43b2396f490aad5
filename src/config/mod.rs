//! Configuration management
//!
//! This module handles loading and parsing configuration for the Volunteer Avenue backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session token configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Runtime mode, controls cookie attributes
    #[serde(default)]
    pub mode: AppMode,
    /// CORS allowed origins (credentials are allowed for each)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mode: AppMode::default(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "https://volunteer-avenue.web.app".to_string(),
        "https://volunteer-avenue.firebaseapp.com".to_string(),
    ]
}

/// Runtime mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// Local development (default): `SameSite=Strict`, no `Secure`
    #[default]
    Development,
    /// Production: `SameSite=None; Secure` so the cross-site frontend can send the cookie
    Production,
}

impl AppMode {
    pub fn is_production(self) -> bool {
        self == AppMode::Production
    }
}

impl std::str::FromStr for AppMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(ConfigError::ValidationError(format!("unknown mode: {}", s))),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Store user name, spliced into a MySQL URL that carries no credentials
    #[serde(default)]
    pub user: Option<String>,
    /// Store password, paired with `user`
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            user: None,
            password: None,
        }
    }
}

fn default_database_url() -> String {
    "data/volunteer.db".to_string()
}

impl DatabaseConfig {
    /// Connection URL with the credential pair applied.
    ///
    /// Only MySQL URLs without an existing `user@` part are rewritten.
    pub fn connection_url(&self) -> String {
        if self.driver != DatabaseDriver::Mysql {
            return self.url.clone();
        }
        let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) else {
            return self.url.clone();
        };
        let rest = self.url.strip_prefix("mysql://").unwrap_or(&self.url);
        if rest.contains('@') {
            return self.url.clone();
        }
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!("mysql://{}:{}@{}", user, password, rest),
            None => format!("mysql://{}@{}", user, rest),
        }
    }
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default)]
    pub token_secret: String,
    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_seconds: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    3600
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - VOLUNTEER_SERVER_HOST
    /// - VOLUNTEER_SERVER_PORT (alias: PORT)
    /// - VOLUNTEER_SERVER_MODE (alias: NODE_ENV)
    /// - VOLUNTEER_SERVER_CORS_ORIGINS (comma separated)
    /// - VOLUNTEER_DATABASE_DRIVER
    /// - VOLUNTEER_DATABASE_URL
    /// - VOLUNTEER_DATABASE_USER
    /// - VOLUNTEER_DATABASE_PASSWORD
    /// - VOLUNTEER_AUTH_TOKEN_SECRET (alias: ACCESS_TOKEN_SECRET)
    /// - VOLUNTEER_AUTH_TOKEN_TTL_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.token_secret must be set (or VOLUNTEER_AUTH_TOKEN_SECRET / ACCESS_TOKEN_SECRET)"
                    .to_string(),
            ));
        }
        if self.auth.token_ttl_seconds == 0
            || self.auth.token_ttl_seconds > crate::services::token::MAX_TTL_SECONDS
        {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_seconds must be between 1 second and one year".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("VOLUNTEER_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_with_alias("VOLUNTEER_SERVER_PORT", "PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Some(mode) = env_with_alias("VOLUNTEER_SERVER_MODE", "NODE_ENV") {
            if let Ok(mode) = mode.parse::<AppMode>() {
                self.server.mode = mode;
            }
        }
        if let Ok(origins) = std::env::var("VOLUNTEER_SERVER_CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() {
                self.server.cors_origins = origins;
            }
        }

        // Database configuration
        if let Ok(driver) = std::env::var("VOLUNTEER_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("VOLUNTEER_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(user) = std::env::var("VOLUNTEER_DATABASE_USER") {
            self.database.user = Some(user);
        }
        if let Ok(password) = std::env::var("VOLUNTEER_DATABASE_PASSWORD") {
            self.database.password = Some(password);
        }

        // Auth configuration
        if let Some(secret) = env_with_alias("VOLUNTEER_AUTH_TOKEN_SECRET", "ACCESS_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Ok(ttl) = std::env::var("VOLUNTEER_AUTH_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.auth.token_ttl_seconds = ttl;
            }
        }
    }
}

/// Read `primary`, falling back to the conventional `alias`
fn env_with_alias(primary: &str, alias: &str) -> Option<String> {
    std::env::var(primary).or_else(|_| std::env::var(alias)).ok()
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
