//! Configuration management
//!
//! Configuration is loaded from `config.yml` with environment variable
//! overrides (`CHAPTERHOUSE_*`). Missing optional values are filled with
//! sensible defaults so a bare checkout can start against a local SQLite
//! file.

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
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// OAuth identity provider configuration
    #[serde(default)]
    pub oauth: OauthConfig,
    /// Payment gateway configuration
    #[serde(default)]
    pub payment: PaymentConfig,
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
    /// Externally visible base URL (used for OAuth and payment redirects)
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/chapterhouse.db".to_string()
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// OAuth identity provider configuration.
///
/// The provider is an opaque collaborator: all endpoints come from
/// configuration so deployments (and tests) can point them anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    /// OAuth client ID
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Authorization endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Token exchange endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// User info endpoint (must return email + verified_email)
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
        }
    }
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

/// Payment gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Gateway API base URL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Merchant account id at the gateway
    #[serde(default)]
    pub account_id: i64,
    /// Gateway access token
    #[serde(default)]
    pub access_token: String,
    /// Membership dues amount, as the gateway expects it
    #[serde(default = "default_amount")]
    pub amount: String,
    /// Checkout line-item description
    #[serde(default = "default_checkout_description")]
    pub description: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            account_id: 0,
            access_token: String::new(),
            amount: default_amount(),
            description: default_checkout_description(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://stage.wepayapi.com/v2".to_string()
}

fn default_amount() -> String {
    "20.00".to_string()
}

fn default_checkout_description() -> String {
    "1 year chapter membership".to_string()
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
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults; invalid YAML is an error
    /// with the offending location.
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

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - CHAPTERHOUSE_SERVER_HOST / CHAPTERHOUSE_SERVER_PORT
    /// - CHAPTERHOUSE_SERVER_PUBLIC_URL / CHAPTERHOUSE_SERVER_CORS_ORIGIN
    /// - CHAPTERHOUSE_DATABASE_URL
    /// - CHAPTERHOUSE_CACHE_TTL_SECONDS
    /// - CHAPTERHOUSE_OAUTH_CLIENT_ID / CHAPTERHOUSE_OAUTH_CLIENT_SECRET
    /// - CHAPTERHOUSE_PAYMENT_ACCOUNT_ID / CHAPTERHOUSE_PAYMENT_ACCESS_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CHAPTERHOUSE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CHAPTERHOUSE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(public_url) = std::env::var("CHAPTERHOUSE_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }
        if let Ok(cors_origin) = std::env::var("CHAPTERHOUSE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("CHAPTERHOUSE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("CHAPTERHOUSE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(client_id) = std::env::var("CHAPTERHOUSE_OAUTH_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("CHAPTERHOUSE_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }

        if let Ok(account_id) = std::env::var("CHAPTERHOUSE_PAYMENT_ACCOUNT_ID") {
            if let Ok(account_id) = account_id.parse::<i64>() {
                self.payment.account_id = account_id;
            }
        }
        if let Ok(access_token) = std::env::var("CHAPTERHOUSE_PAYMENT_ACCESS_TOKEN") {
            self.payment.access_token = access_token;
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for key in [
            "CHAPTERHOUSE_SERVER_HOST",
            "CHAPTERHOUSE_SERVER_PORT",
            "CHAPTERHOUSE_SERVER_PUBLIC_URL",
            "CHAPTERHOUSE_SERVER_CORS_ORIGIN",
            "CHAPTERHOUSE_DATABASE_URL",
            "CHAPTERHOUSE_CACHE_TTL_SECONDS",
            "CHAPTERHOUSE_OAUTH_CLIENT_ID",
            "CHAPTERHOUSE_OAUTH_CLIENT_SECRET",
            "CHAPTERHOUSE_PAYMENT_ACCOUNT_ID",
            "CHAPTERHOUSE_PAYMENT_ACCESS_TOKEN",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/chapterhouse.db");
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.payment.amount, "20.00");
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.url, "data/chapterhouse.db");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  public_url: "https://chapter.example.edu"
database:
  url: "members.db"
cache:
  ttl_seconds: 7200
oauth:
  client_id: "client-123"
  client_secret: "secret-456"
payment:
  account_id: 319493
  access_token: "tok"
  amount: "25.00"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.public_url, "https://chapter.example.edu");
        assert_eq!(config.database.url, "members.db");
        assert_eq!(config.cache.ttl_seconds, 7200);
        assert_eq!(config.oauth.client_id, "client-123");
        assert_eq!(config.payment.account_id, 319493);
        assert_eq!(config.payment.amount, "25.00");
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let result = Config::load(file.path());

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("parse") || err_msg.contains("invalid"));
    }

    #[test]
    fn test_env_override_server_config() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: \"0.0.0.0\"\n  port: 8080\n").unwrap();

        std::env::set_var("CHAPTERHOUSE_SERVER_HOST", "192.168.1.1");
        std::env::set_var("CHAPTERHOUSE_SERVER_PORT", "4000");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);

        clear_env();
    }

    #[test]
    fn test_env_override_payment_config() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        std::env::set_var("CHAPTERHOUSE_PAYMENT_ACCOUNT_ID", "424242");
        std::env::set_var("CHAPTERHOUSE_PAYMENT_ACCESS_TOKEN", "gateway-token");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.payment.account_id, 424242);
        assert_eq!(config.payment.access_token, "gateway-token");

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_port_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("CHAPTERHOUSE_SERVER_PORT", "not_a_number");

        let config = Config::load_with_env(file.path()).unwrap();

        // Original value is kept when the env var does not parse
        assert_eq!(config.server.port, 8080);

        clear_env();
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9999,
                public_url: "https://example.edu".to_string(),
                cors_origin: "https://example.edu".to_string(),
            },
            ..Config::default()
        };

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.server.public_url, config.server.public_url);
        assert_eq!(parsed.database.url, config.database.url);
    }
}
