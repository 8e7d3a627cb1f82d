//! services/bridge/src/config.rs
//!
//! Defines the bridge's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono_tz::Tz;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

const MIN_SCAN_INTERVAL_SECONDS: u64 = 10;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub choreboard_url: String,
    pub username: String,
    pub secret_key: String,
    pub monitored_users: Vec<String>,
    pub scan_interval: Duration,
    pub time_zone: Tz,
    pub completions_limit: usize,
    pub request_timeout: Duration,
    /// When set, service calls must carry `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let api_key = var("BRIDGE_API_KEY");

        // --- Backend Connection ---
        let choreboard_url = required("CHOREBOARD_URL")?.trim_end_matches('/').to_string();
        if !(choreboard_url.starts_with("http://") || choreboard_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "CHOREBOARD_URL".to_string(),
                format!("'{}' must start with http:// or https://", choreboard_url),
            ));
        }
        let username = required("CHOREBOARD_USERNAME")?;
        let secret_key = required("CHOREBOARD_SECRET_KEY")?;

        let request_timeout =
            Duration::from_secs(parse_number(&var, "REQUEST_TIMEOUT_SECONDS", 10)?);

        // --- Polling and Views ---
        let monitored_users = var("MONITORED_USERS")
            .map(|raw| {
                raw.split(',')
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let scan_seconds = parse_number(&var, "SCAN_INTERVAL_SECONDS", 300)?;
        if scan_seconds < MIN_SCAN_INTERVAL_SECONDS {
            return Err(ConfigError::InvalidValue(
                "SCAN_INTERVAL_SECONDS".to_string(),
                format!("must be at least {}", MIN_SCAN_INTERVAL_SECONDS),
            ));
        }

        let tz_str = var("TIME_ZONE").unwrap_or_else(|| "UTC".to_string());
        let time_zone = tz_str.parse::<Tz>().map_err(|_| {
            ConfigError::InvalidValue(
                "TIME_ZONE".to_string(),
                format!("'{}' is not an IANA time zone", tz_str),
            )
        })?;

        let completions_limit = parse_number(&var, "COMPLETIONS_LIMIT", 20)? as usize;

        Ok(Self {
            bind_address,
            log_level,
            choreboard_url,
            username,
            secret_key,
            monitored_users,
            scan_interval: Duration::from_secs(scan_seconds),
            time_zone,
            completions_limit,
            request_timeout,
            api_key,
        })
    }
}

fn parse_number<F>(var: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a number", raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("CHOREBOARD_URL", "http://choreboard.local:8000/"),
        ("CHOREBOARD_USERNAME", "bridge"),
        ("CHOREBOARD_SECRET_KEY", "s3cret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.choreboard_url, "http://choreboard.local:8000");
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.scan_interval, Duration::from_secs(300));
        assert_eq!(config.time_zone, chrono_tz::UTC);
        assert_eq!(config.completions_limit, 20);
        assert!(config.monitored_users.is_empty());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn monitored_users_are_split_and_trimmed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MONITORED_USERS", " sam, kim ,,lee "));
        pairs.push(("TIME_ZONE", "America/Chicago"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.monitored_users, vec!["sam", "kim", "lee"]);
        assert_eq!(config.time_zone, chrono_tz::America::Chicago);
    }

    #[test]
    fn missing_secret_is_reported() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "CHOREBOARD_SECRET_KEY")
            .collect();
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref k) if k == "CHOREBOARD_SECRET_KEY"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("SCAN_INTERVAL_SECONDS", "5"),
            ("SCAN_INTERVAL_SECONDS", "soon"),
            ("TIME_ZONE", "Mars/Olympus"),
            ("CHOREBOARD_URL", "choreboard.local"),
            ("BIND_ADDRESS", "nowhere"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.retain(|(k, _)| *k != key);
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue(ref k, _) if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }
}
