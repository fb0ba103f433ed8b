use chrono::Duration;
use config::ConfigError;

use crate::auth::{SigningKey, MAX_HASH_COST, MIN_HASH_COST};

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub platform: Platform,
}

/// Deployment flavour; destructive admin endpoints only run on `Dev`
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Dev,
    #[default]
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Use the in-process store instead of Postgres
    #[serde(default)]
    pub in_memory: bool,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Credential subsystem settings, read-only after startup
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub signing_secret: SigningKey,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
}

impl AuthSettings {
    pub fn new(signing_secret: SigningKey) -> Self {
        Self {
            signing_secret,
            access_token_ttl_secs: default_access_token_ttl_secs(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
            hash_cost: default_hash_cost(),
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::Message("auth.signing_secret must not be empty".into()));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.hash_cost) {
            return Err(ConfigError::Message(format!(
                "auth.hash_cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        if self.access_token_ttl_secs <= 0 || self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::Message("token lifetimes must be positive".into()));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_ttl_secs() -> i64 {
    3600
}

fn default_refresh_token_ttl_days() -> i64 {
    60
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Load settings from `configuration.{yaml,toml,json}` (optional) and
/// `APP_` prefixed environment variables, e.g. `APP_AUTH__SIGNING_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AuthSettings::new(SigningKey::new("secret"));

        assert_eq!(settings.access_token_ttl(), Duration::hours(1));
        assert_eq!(settings.refresh_token_ttl(), Duration::days(60));
        assert_eq!(settings.hash_cost, bcrypt::DEFAULT_COST);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_secret() {
        let settings = AuthSettings::new(SigningKey::new(""));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_cost() {
        let mut settings = AuthSettings::new(SigningKey::new("secret"));
        settings.hash_cost = 2;
        assert!(settings.validate().is_err());

        settings.hash_cost = 32;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_platform_defaults_to_production() {
        let settings: ApplicationSettings =
            serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(settings.platform, Platform::Production);
        assert_eq!(settings.host, "127.0.0.1");

        let dev: ApplicationSettings =
            serde_json::from_str(r#"{"port": 8080, "platform": "dev"}"#).unwrap();
        assert_eq!(dev.platform, Platform::Dev);
    }

    #[test]
    fn test_debug_hides_secret() {
        let settings = AuthSettings::new(SigningKey::new("super-secret-value"));
        assert!(!format!("{:?}", settings).contains("super-secret-value"));
    }
}
