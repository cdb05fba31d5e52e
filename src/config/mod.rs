use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string, e.g. `sqlite:blog.db`
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:blog.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session and flash cookies
    pub secret_key: Option<String>,
    /// How long a login stays valid
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Mark cookies `Secure` (only sent over HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: false,
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

impl AuthConfig {
    /// The configured secret, or a random one when none is set.
    ///
    /// A random secret invalidates every session on restart.
    pub fn secret_or_random(&self) -> String {
        match self.secret_key.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                warn!("No secret key configured, generating one; sessions will not survive a restart");
                let bytes: [u8; 32] = rand::random();
                hex::encode(bytes)
            }
        }
    }
}

/// Outbound SMTP settings for the contact relay
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender account; also used as the SMTP username
    pub from_address: Option<String>,
    /// Password or app token of the sender account
    pub password: Option<String>,
    /// Where contact messages are delivered
    pub to_address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_address: None,
            password: None,
            to_address: None,
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        self.from_address.is_some() && self.password.is_some() && self.to_address.is_some()
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

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load the TOML file at `path` (defaults when it does not exist), then
    /// apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Override file settings from the environment.
    ///
    /// Variables: `DB`, `SECRET_KEY`, `FROM_EMAIL`, `PASSWORD`, `TO_EMAIL`, `PORT`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("DB") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = Some(secret);
        }
        if let Some(from) = lookup("FROM_EMAIL") {
            self.mail.from_address = Some(from);
        }
        if let Some(password) = lookup("PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(to) = lookup("TO_EMAIL") {
            self.mail.to_address = Some(to);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.url, "sqlite:blog.db");
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp_port, 587);
        assert!(!config.mail.is_configured());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [server]
            port = 8000

            [mail]
            from_address = "blog@example.com"
            password = "app-token"
            to_address = "me@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.mail.is_configured());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse("[database]\nurl = \"sqlite:file.db\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("DB", "sqlite:env.db"),
            ("SECRET_KEY", "s3cret"),
            ("TO_EMAIL", "owner@example.com"),
            ("PASSWORD", "   "),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_with(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.url, "sqlite:env.db");
        assert_eq!(config.auth.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(config.mail.to_address.as_deref(), Some("owner@example.com"));
        // Blank values are ignored
        assert!(config.mail.password.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env_with(|key| (key == "PORT").then(|| "eighty".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_random_secret_when_missing() {
        let auth = AuthConfig::default();
        let first = auth.secret_or_random();
        let second = auth.secret_or_random();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);

        let auth = AuthConfig {
            secret_key: Some("fixed".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(auth.secret_or_random(), "fixed");
    }
}
