use serde::{Deserialize, Serialize};

/// Environment variable that overrides `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "GROUPDESK_JWT_SECRET";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bearer token verification
    #[serde(default)]
    pub auth: AuthConfig,
    /// Global catalog policy
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database type (postgres or sqlite)
    #[serde(default = "default_db_type", rename = "type")]
    pub db_type: String,
    /// Full connection URL, takes precedence over the discrete fields
    #[serde(default)]
    pub url: Option<String>,
    /// Database host
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database port
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database name (file path for sqlite)
    #[serde(default = "default_db_name", rename = "database")]
    pub name: String,
    /// Database user
    #[serde(default = "default_db_user", rename = "username")]
    pub user: String,
    /// Database password
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Catalog entries used by this many organizations or more cannot be deleted
    #[serde(default = "default_delete_threshold")]
    pub delete_threshold: u64,
    /// Quality score (0-100) given to contributed entries
    #[serde(default = "default_quality_score")]
    pub default_quality_score: i32,
    /// Seconds between background reconciliation sweeps, 0 disables
    #[serde(default)]
    pub reconcile_interval_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            delete_threshold: default_delete_threshold(),
            default_quality_score: default_quality_score(),
            reconcile_interval_secs: 0,
        }
    }
}

// Default value functions
fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_type() -> String {
    "postgres".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "groupdesk".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_delete_threshold() -> u64 {
    5
}

fn default_quality_score() -> i32 {
    70
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            log: LogConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: default_db_type(),
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Generate database connection URL
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match self.db_type.as_str() {
            "sqlite" => format!("sqlite://{}?mode=rwc", self.name),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                self.auth.jwt_secret = secret;
            }
        }
    }
}
