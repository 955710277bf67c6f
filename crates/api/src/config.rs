//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use store::DatabaseConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3001`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `DB_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `DB_TX_TIMEOUT_MS`: bound on one checkout transaction (default: `5000`)
/// - `JWT_SECRET`: HS256 signing secret (no default)
/// - `JWT_TTL_HOURS`: token lifetime (default: `24`)
/// - `STATIC_DIR`: storefront pages and images (default: `"public"`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_tx_timeout: Duration,
    pub jwt_secret: Option<String>,
    pub jwt_ttl: Duration,
    pub static_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unparsable numbers fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.db_max_connections),
            db_tx_timeout: parsed("DB_TX_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.db_tx_timeout),
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            jwt_ttl: parsed("JWT_TTL_HOURS")
                .map(|h| Duration::from_secs(h * 3600))
                .unwrap_or(defaults.jwt_ttl),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            transaction_timeout: self.db_tx_timeout,
        }
    }

    /// Directory holding product images, served under `/assets/images`.
    pub fn image_dir(&self) -> PathBuf {
        self.static_dir.join("assets").join("images")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            database_url: DatabaseConfig::default().url,
            db_max_connections: 10,
            db_tx_timeout: Duration::from_millis(5000),
            jwt_secret: None,
            jwt_ttl: Duration::from_secs(24 * 3600),
            static_dir: PathBuf::from("public"),
        }
    }
}

// Keeps the secret and the credentials in the URL out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_tx_timeout", &self.db_tx_timeout)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<set>"))
            .field("jwt_ttl", &self.jwt_ttl)
            .field("static_dir", &self.static_dir)
            .finish_non_exhaustive()
    }
}
