//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Default log filter when neither `SIEVE_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tracing filter directive (default: "info").
    pub log_filter: String,

    /// Fallback `max_limit` for schemas that enable pagination without
    /// declaring one. When None, such schemas accept any limit.
    pub max_limit: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_filter = lookup("SIEVE_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let max_limit = lookup("SIEVE_MAX_LIMIT")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .context("SIEVE_MAX_LIMIT must be a non-negative integer")?;

        Ok(Self {
            log_filter,
            max_limit,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_limit: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn log_filter_prefers_sieve_log() {
        let config = load(&[("SIEVE_LOG", "debug"), ("RUST_LOG", "warn")]).unwrap();
        assert_eq!(config.log_filter, "debug");

        let config = load(&[("RUST_LOG", "warn")]).unwrap();
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn max_limit() {
        let config = load(&[("SIEVE_MAX_LIMIT", " 250 ")]).unwrap();
        assert_eq!(config.max_limit, Some(250));

        let config = load(&[("SIEVE_MAX_LIMIT", "")]).unwrap();
        assert_eq!(config.max_limit, None);

        let err = load(&[("SIEVE_MAX_LIMIT", "-3")]).unwrap_err();
        assert!(err.to_string().contains("SIEVE_MAX_LIMIT"));
    }
}
