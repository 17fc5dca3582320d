//! Configuration loading
//!
//! Loads [`TaskoraConfig`] from TOML and layers `TASKORA_*` environment
//! variables on top.

use crate::{ConfigError, TaskoraConfig};
use std::path::Path;
use tracing::{debug, info};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "TASKORA_";

/// Loads configuration from files and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<TaskoraConfig, ConfigError> {
        let config: TaskoraConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<TaskoraConfig, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading config file");

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml_str(&contents)
    }

    /// Full resolution: defaults, then the file (if given), then the process
    /// environment
    pub async fn load(path: Option<impl AsRef<Path>>) -> Result<TaskoraConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => TaskoraConfig::default(),
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;

        info!(
            environment = %config.environment,
            cache_ttl_seconds = config.cache.ttl_seconds,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply overrides resolved through `lookup`
    ///
    /// `lookup` receives full variable names (`TASKORA_BACKEND_URL`, ...).
    /// Taking a closure keeps tests independent of the process environment.
    pub fn apply_env_overrides<F>(config: &mut TaskoraConfig, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("ENVIRONMENT") {
            config.environment = v.parse()?;
        }
        if let Some(v) = var("BACKEND_URL") {
            config.backend.url = Some(v);
        }
        if let Some(v) = var("BACKEND_ANON_KEY") {
            config.backend.anon_key = Some(v);
        }
        if let Some(v) = var("BACKEND_SERVICE_KEY") {
            config.backend.service_key = Some(v);
        }
        if let Some(v) = var("BACKEND_TIMEOUT_SECONDS") {
            config.backend.request_timeout_seconds =
                parse_number("backend.request_timeout_seconds", &v)?;
        }
        if let Some(v) = var("CACHE_ENABLED") {
            config.cache.enabled = parse_bool("cache.enabled", &v)?;
        }
        if let Some(v) = var("CACHE_TTL_SECONDS") {
            config.cache.ttl_seconds = parse_number("cache.ttl_seconds", &v)?;
        }
        if let Some(v) = var("CACHE_MAX_ENTRIES") {
            config.cache.max_entries = parse_number("cache.max_entries", &v)?;
        }
        if let Some(v) = var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Some(v) = var("SERVER_PORT") {
            config.server.port = parse_number("server.port", &v)?;
        }
        if let Some(v) = var("EMAIL_API_KEY") {
            config.email.api_key = Some(v);
        }
        if let Some(v) = var("EMAIL_FROM") {
            config.email.from_email = v;
        }
        if let Some(v) = var("EMAIL_PRIMARY_ENDPOINT") {
            config.email.primary_endpoint = Some(v);
        }
        if let Some(v) = var("EMAIL_FALLBACK_ENDPOINT") {
            config.email.fallback_endpoint = Some(v);
        }
        if let Some(v) = var("PAYMENTS_ACCESS_TOKEN") {
            config.payments.access_token = Some(v);
        }
        if let Some(v) = var("PAYMENTS_TIMEOUT_SECONDS") {
            config.payments.timeout_seconds = parse_number("payments.timeout_seconds", &v)?;
        }
        if let Some(v) = var("APP_URL") {
            config.password_reset.app_url = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            config.logging.level = v;
        }

        Ok(())
    }
}

fn parse_number<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, value))
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Environment;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_applied() {
        let mut config = TaskoraConfig::default();
        ConfigLoader::apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("TASKORA_ENVIRONMENT", "production"),
                ("TASKORA_BACKEND_URL", "https://db.example.com"),
                ("TASKORA_CACHE_TTL_SECONDS", "60"),
                ("TASKORA_CACHE_ENABLED", "off"),
                ("TASKORA_CACHE_MAX_ENTRIES", "50"),
                ("TASKORA_PAYMENTS_TIMEOUT_SECONDS", "5"),
                ("TASKORA_SERVER_PORT", "9000"),
            ]),
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.backend.url.as_deref(), Some("https://db.example.com"));
        assert_eq!(config.cache.ttl_seconds, 60);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.payments.timeout_seconds, 5);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_env_override_rejects_garbage_number() {
        let mut config = TaskoraConfig::default();
        let err = ConfigLoader::apply_env_overrides(
            &mut config,
            lookup_from(&[("TASKORA_SERVER_PORT", "eighty")]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "server.port"));
    }

    #[test]
    fn test_from_toml_partial_document() {
        let config = ConfigLoader::from_toml_str(
            r#"
environment = "production"

[cache]
ttl_seconds = 120
"#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.cache.ttl_seconds, 120);
        assert!(config.cache.enabled);
        assert_eq!(config.pagination.default_page_size, 20);
    }
}
