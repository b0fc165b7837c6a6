use std::time::Duration;

use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Runtime settings, read from the process environment (and `.env` via dotenv).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub pg_database_url: String,
    pub redis_database_uri: String,
    pub bind_addr: String,
    pub pg_workers: usize,
    pub session_ttl_secs: u64,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub log_level: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(Environment::default().try_parsing(true)))
    }

    fn from_builder(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("pg_workers", 5)?
            .set_default("session_ttl_secs", 43_200)?
            .set_default("settle_delay_ms", 700)?
            .set_default("poll_interval_ms", 5_000)?
            .set_default("log_level", "info")?
            .build()?
            .try_deserialize()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn defaults_fill_in_optional_keys() {
        let builder = Config::builder().add_source(File::from_str(
            r#"{ "pg_database_url": "postgres://localhost/lounge", "redis_database_uri": "redis://127.0.0.1/" }"#,
            FileFormat::Json,
        ));

        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.pg_workers, 5);
        assert_eq!(settings.settle_delay(), Duration::from_millis(700));
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.session_ttl_secs, 43_200);
    }

    #[test]
    fn database_url_is_required() {
        let builder = Config::builder().add_source(File::from_str(
            r#"{ "redis_database_uri": "redis://127.0.0.1/" }"#,
            FileFormat::Json,
        ));

        assert!(Settings::from_builder(builder).is_err());
    }
}
