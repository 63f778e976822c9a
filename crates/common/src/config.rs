//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bearer token grants for the built-in identity provider.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Membership (eligible voter) source configuration.
    #[serde(default)]
    pub membership: MembershipConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on a single request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`postgres://...` or `sqlite://...`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a new connection to open.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for a free connection from the pool.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Seconds an idle connection stays in the pool.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Tokens issued by the surrounding application.
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

/// A bearer token and the voter identity it stands for.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// Opaque bearer token.
    pub token: String,
    /// Stable voter identifier.
    pub voter_id: String,
    /// Whether the voter holds the administrator capability.
    #[serde(default)]
    pub admin: bool,
}

/// Membership configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipConfig {
    /// Number of members eligible to vote.
    #[serde(default)]
    pub eligible_voters: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_connect_timeout() -> u64 {
    10
}

const fn default_acquire_timeout() -> u64 {
    10
}

const fn default_idle_timeout() -> u64 {
    600
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `BALLOTBOX_ENV`)
    /// 4. Environment variables with `BALLOTBOX_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("BALLOTBOX_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BALLOTBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BALLOTBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml(
            r#"
            [server]
            [database]
            url = "postgres://localhost/ballotbox"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.connect_timeout_secs, 10);
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert_eq!(config.database.idle_timeout_secs, 600);
        assert!(config.auth.tokens.is_empty());
        assert_eq!(config.membership.eligible_voters, 0);
    }

    #[test]
    fn test_token_grants() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080
            [database]
            url = "sqlite::memory:"
            [membership]
            eligible_voters = 200
            [[auth.tokens]]
            token = "secret-admin"
            voter_id = "admin1"
            admin = true
            [[auth.tokens]]
            token = "secret-voter"
            voter_id = "voter1"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.membership.eligible_voters, 200);
        assert_eq!(config.auth.tokens.len(), 2);
        assert!(config.auth.tokens[0].admin);
        assert!(!config.auth.tokens[1].admin);
        assert_eq!(config.auth.tokens[1].voter_id, "voter1");
    }

    #[test]
    fn test_missing_database_url_is_error() {
        let result = Config::from_toml("[server]\n[database]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_database_timeouts_override() {
        let config = Config::from_toml(
            r#"
            [server]
            [database]
            url = "sqlite::memory:"
            connect_timeout_secs = 3
            acquire_timeout_secs = 5
            idle_timeout_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.database.connect_timeout_secs, 3);
        assert_eq!(config.database.acquire_timeout_secs, 5);
        assert_eq!(config.database.idle_timeout_secs, 60);
    }
}
