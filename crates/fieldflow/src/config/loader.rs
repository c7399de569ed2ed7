use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let prefix = &config.invoicing.prefix;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation {
            message: format!(
                "Invoice prefix must be non-empty and alphanumeric, got '{prefix}'"
            ),
        });
    }

    if config.locks.timeout_ms == 0 {
        return Err(ConfigError::Validation {
            message: "Lock timeout must be greater than zero".to_string(),
        });
    }

    if config.notifications.outbox_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "Notification outbox capacity must be greater than zero".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.invoicing.prefix, "INV");
        assert_eq!(config.locks.timeout_ms, 5000);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = load_config_from_str(
            r#"{
                "version": "1.0",
                "database_path": "/var/lib/fieldflow/jobs.db",
                "invoicing": {"prefix": "FLD", "reminder_days": [10]},
                "locks": {"timeout_ms": 750},
                "notifications": {"outbox_capacity": 32}
            }"#,
        )
        .unwrap();
        assert_eq!(config.invoicing.prefix, "FLD");
        assert_eq!(config.engine_settings().lock_timeout.as_millis(), 750);
        assert_eq!(config.notifications.outbox_capacity, 32);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version"));
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let err =
            load_config_from_str(r#"{"version": "1.0", "invoicing": {"prefix": "IN V", "reminder_days": []}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn test_zero_lock_timeout_rejected() {
        let err =
            load_config_from_str(r#"{"version": "1.0", "locks": {"timeout_ms": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("Lock timeout"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(load_config_from_str("{not json").is_err());
    }
}
