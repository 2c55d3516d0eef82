//! # configs
//!
//! Layered runtime configuration. Sources, lowest precedence first:
//!
//! 1. defaults compiled into the section structs
//! 2. `config/default.toml` (optional)
//! 3. `config/{RUN_ENV}.toml` (optional, `RUN_ENV` defaults to `development`)
//! 4. environment variables, e.g. `CAMPUSFIX__SERVER__PORT=9090`
//!
//! A `.env` file in the working directory is loaded first so its values
//! behave like real environment variables.

use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "CAMPUSFIX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub subscription: SubscriptionSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Request body cap; must leave room for base64-encoded attachments.
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8080, max_body_bytes: 8 * 1024 * 1024 }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    /// Shared key maintenance staff present at login.
    pub maintenance_key: SecretString,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u32,
}

fn default_token_ttl_minutes() -> u32 {
    12 * 60
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.token_ttl_minutes) * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub root: PathBuf,
    pub url_prefix: String,
    pub max_bytes: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/media"),
            url_prefix: "/media".into(),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Without a `url` the in-memory store is used.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { url: None, max_connections: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// `false` accepts any status change and only logs unusual jumps.
    pub enforce_transitions: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self { enforce_transitions: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionSettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self { max_retries: 5, initial_backoff_ms: 200, max_backoff_ms: 30_000 }
    }
}

impl SubscriptionSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { format: LogFormat::Plain, filter: "info".into() }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(env_source());
        Self::from_builder(builder)
    }

    /// Single in-memory TOML source, for tests and tooling.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.maintenance_key.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("auth.maintenance_key must not be empty".into()));
        }
        if self.auth.token_ttl_minutes == 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_minutes must be positive".into()));
        }
        if self.media.url_prefix.is_empty() || !self.media.url_prefix.starts_with('/') {
            return Err(ConfigError::Invalid("media.url_prefix must start with '/'".into()));
        }
        if self.media.max_bytes == 0 {
            return Err(ConfigError::Invalid("media.max_bytes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [auth]
        jwt_secret = "a-long-signing-secret"
        maintenance_key = "boiler-room"
    "#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let s = Settings::from_toml(MINIMAL).unwrap();
        assert_eq!(s.server.bind_addr(), "0.0.0.0:8080");
        assert!(s.lifecycle.enforce_transitions);
        assert_eq!(s.subscription.max_retries, 5);
        assert_eq!(s.subscription.initial_backoff(), Duration::from_millis(200));
        assert_eq!(s.log.format, LogFormat::Plain);
        assert_eq!(s.auth.token_ttl(), Duration::from_secs(12 * 3600));
        assert!(s.database.url.is_none());
        assert_eq!(s.auth.maintenance_key.expose_secret(), "boiler-room");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = format!(
            "{MINIMAL}\n[server]\nport = 9090\n[lifecycle]\nenforce_transitions = false\n[log]\nformat = \"json\"\n"
        );
        let s = Settings::from_toml(&toml).unwrap();
        assert_eq!(s.server.port, 9090);
        assert_eq!(s.server.host, "0.0.0.0");
        assert!(!s.lifecycle.enforce_transitions);
        assert_eq!(s.log.format, LogFormat::Json);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut vars = config::Map::new();
        vars.insert("CAMPUSFIX__SERVER__PORT".to_string(), "7070".to_string());
        vars.insert("CAMPUSFIX__AUTH__MAINTENANCE_KEY".to_string(), "from-env".to_string());

        let builder = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .add_source(env_source().source(Some(vars)));
        let s = Settings::from_builder(builder).unwrap();
        assert_eq!(s.server.port, 7070);
        assert_eq!(s.auth.maintenance_key.expose_secret(), "from-env");
    }

    #[test]
    fn test_empty_secrets_are_rejected() {
        let err = Settings::from_toml("[auth]\njwt_secret = \"\"\nmaintenance_key = \"k\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Settings::from_toml("[auth]\njwt_secret = \"s\"\nmaintenance_key = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_auth_section_fails_to_load() {
        assert!(matches!(Settings::from_toml("[server]\nport = 1\n"), Err(ConfigError::Load(_))));
    }
}
