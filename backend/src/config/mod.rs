use std::env;

use config::{Config, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;

use crate::catalog::DEFAULT_PAGE_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub admin: AdminConfig,
    pub catalog: CatalogConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
}

/// Single dashboard account.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: usize,
    /// PostgREST endpoint for public catalog reads; the primary store when unset.
    pub rest_url: Option<String>,
    pub rest_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub api_url: String,
    /// Without a key, mail goes to the in-process outbox.
    pub api_key: Option<String>,
    pub sender: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub local_dir: String,
    pub public_path: String,
    pub bucket: Option<BucketConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BucketConfig {
    pub url: String,
    pub key: String,
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            storage: StorageBackend::default(),
            database_url: None,
            database_pool_size: 10,
            jwt_secret: String::new(),
            session_ttl_hours: 24,
            admin: AdminConfig::default(),
            catalog: CatalogConfig::default(),
            mail: MailConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            rest_url: None,
            rest_key: None,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com".to_string(),
            api_key: None,
            sender: "Montcervin <sales@montcervin.co.uk>".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            local_dir: "media".to_string(),
            public_path: "/media".to_string(),
            bucket: None,
        }
    }
}

impl AppConfig {
    /// Reads `.env`, then `montcervin.toml` if present, then `MONTCERVIN_*`
    /// variables (`MONTCERVIN_ADMIN__EMAIL` sets `admin.email`). The plain
    /// `DATABASE_URL`, `JWT_SECRET` and `PORT` variables win over both.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config: AppConfig = Config::builder()
            .add_source(File::with_name("montcervin").required(false))
            .add_source(
                Environment::with_prefix("MONTCERVIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database_url", env::var("DATABASE_URL").ok())?
            .set_override_option("jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET must be set".into()));
        }
        if self.storage == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "DATABASE_URL must be set for the postgres storage backend".into(),
            ));
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::Invalid("catalog page size must be positive".into()));
        }
        let media_path = &self.media.public_path;
        if !media_path.starts_with('/') || media_path.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Invalid(format!(
                "media.public_path must be a non-root absolute path, got `{}`",
                media_path
            )));
        }
        if self.catalog.rest_url.is_some() && self.catalog.rest_key.is_none() {
            return Err(ConfigError::Invalid("catalog.rest_key must accompany catalog.rest_url".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_needs_a_database_url() {
        let mut config = AppConfig {
            jwt_secret: "s3cret".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.storage = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = AppConfig {
            storage: StorageBackend::Memory,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
