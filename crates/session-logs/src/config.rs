// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

/// Link-local address of the metadata service.
pub const DEFAULT_MMDS_ADDRESS: &str = "169.254.169.254";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_LOG_LEVEL: &str = "info";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the session log forwarder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host (and optional port) of the metadata service, without scheme
    pub mmds_address: String,
    /// Lifetime requested for each metadata token
    pub token_ttl: Duration,
    /// Client-wide timeout applied to every request
    pub timeout: Duration,
    /// Treat a non-2xx delivery response as a failed write
    pub strict_delivery_status: bool,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mmds_address: DEFAULT_MMDS_ADDRESS.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
            timeout: DEFAULT_TIMEOUT,
            strict_delivery_status: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mmds_address = env::var("SESSION_LOGS_MMDS_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_MMDS_ADDRESS.to_string());
        let token_ttl = env::var("SESSION_LOGS_TOKEN_TTL_SECONDS")
            .ok()
            .map(|val| parse_seconds("SESSION_LOGS_TOKEN_TTL_SECONDS", &val))
            .transpose()?
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let timeout = env::var("SESSION_LOGS_TIMEOUT_SECONDS")
            .ok()
            .map(|val| parse_seconds("SESSION_LOGS_TIMEOUT_SECONDS", &val))
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT);
        let strict_delivery_status = env::var("SESSION_LOGS_STRICT_DELIVERY")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);
        let log_level = env::var("SESSION_LOGS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let config = Self {
            mmds_address,
            token_ttl,
            timeout,
            strict_delivery_status,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let address = self.mmds_address.trim();
        if address.is_empty() {
            return Err(ConfigError::Invalid(
                "MMDS address cannot be empty".to_string(),
            ));
        }
        if address.contains("://") || address.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "MMDS address '{address}' must be a host[:port] without scheme or path"
            )));
        }

        if self.token_ttl.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "MMDS token TTL must be at least one second".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("http://{}/latest/api/token", self.mmds_address.trim())
    }

    #[must_use]
    pub fn options_url(&self) -> String {
        format!("http://{}/", self.mmds_address.trim())
    }
}

fn parse_seconds(var: &str, val: &str) -> Result<Duration, ConfigError> {
    val.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
        ConfigError::Invalid(format!(
            "{var} must be a whole number of seconds, got '{val}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 5] = [
        "SESSION_LOGS_MMDS_ADDRESS",
        "SESSION_LOGS_TOKEN_TTL_SECONDS",
        "SESSION_LOGS_TIMEOUT_SECONDS",
        "SESSION_LOGS_STRICT_DELIVERY",
        "SESSION_LOGS_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mmds_address, "169.254.169.254");
        assert_eq!(config.token_ttl, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert!(!config.strict_delivery_status);
    }

    #[test]
    fn test_urls() {
        let config = Config::default();
        assert_eq!(
            config.token_url(),
            "http://169.254.169.254/latest/api/token"
        );
        assert_eq!(config.options_url(), "http://169.254.169.254/");
    }

    #[test]
    fn test_validate_empty_address() {
        let config = Config {
            mmds_address: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_address_with_scheme() {
        let config = Config {
            mmds_address: "http://169.254.169.254".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            mmds_address: "127.0.0.1:8080/latest".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_durations() {
        let config = Config {
            token_ttl: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Invalid(
                "Invalid log level 'verbose'. Must be one of: trace, debug, info, warn, error"
                    .to_string()
            ))
        );
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().expect("defaults should be valid");
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("SESSION_LOGS_MMDS_ADDRESS", "127.0.0.1:9999");
        env::set_var("SESSION_LOGS_TOKEN_TTL_SECONDS", "21600");
        env::set_var("SESSION_LOGS_TIMEOUT_SECONDS", "10");
        env::set_var("SESSION_LOGS_STRICT_DELIVERY", "TRUE");
        env::set_var("SESSION_LOGS_LOG_LEVEL", "DEBUG");

        let config = Config::from_env().expect("overrides should be valid");
        clear_env();

        assert_eq!(config.mmds_address, "127.0.0.1:9999");
        assert_eq!(config.token_ttl, Duration::from_secs(21600));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.strict_delivery_status);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_numbers() {
        clear_env();
        env::set_var("SESSION_LOGS_TIMEOUT_SECONDS", "four");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("four")));
    }
}
