//! Runtime configuration for the server.

use anyhow::{Context, Result, bail};
use url::Url;

use crate::auth::AuthConfig;
use crate::db::DatabaseConfig;

/// Deployment mode; controls how much error detail leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read the mode from `APP_ENV`; anything but "production" is
    /// development.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Everything `Server::start` needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening port; 0 requests an ephemeral port.
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub environment: Environment,
}

impl ServerConfig {
    /// Check the auth endpoints before anything connects to them.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.auth.issuer).context("token issuer is not a valid URL")?;
        Url::parse(&self.auth.jwks_url).context("JWKS endpoint is not a valid URL")?;
        if self.auth.audience.is_empty() {
            bail!("token audience must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            database: DatabaseConfig {
                url: "memory".to_string(),
                ..Default::default()
            },
            auth: AuthConfig::new(
                "https://issuer.example.com/",
                "my-api",
                "https://issuer.example.com/.well-known/jwks.json",
            ),
            environment: Environment::Development,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_issuer_fails() {
        let mut config = test_config();
        config.auth.issuer = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_audience_fails() {
        let mut config = test_config();
        config.auth.audience = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_default_is_development() {
        // APP_ENV is unset in the test environment.
        assert!(!Environment::Development.is_production());
        assert!(Environment::Production.is_production());
    }
}
