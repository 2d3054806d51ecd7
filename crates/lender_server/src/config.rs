//! Process configuration read from the environment.
//!
//! Numeric values that fail to parse fall back to their defaults; missing
//! required values are a startup error.

use std::time::Duration;

use anyhow::{anyhow, Result};

pub const DEFAULT_MAX_CONNS: u32 = 50;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_COUNTRY_CODE: u16 = 254;
pub const DEFAULT_VINTAGE_ENDPOINT: &str = "https://call.pesaflow.co.ke";
pub const DEFAULT_VINTAGE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub current_db_url: String,
    pub current_db_max_conns: u32,
    pub archive_db_url: Option<String>,
    pub archive_db_max_conns: u32,
    /// `ARCHIVE=1`. Archive-scoped tokens read from the archive database.
    pub archive_enabled: bool,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub country_code: u16,
    pub vintage: VintageSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VintageSettings {
    pub endpoint: String,
    /// `None` leaves the scheduler off.
    pub interval: Option<Duration>,
    pub timeout: Duration,
    /// `None` sends every record concurrently.
    pub max_concurrency: Option<usize>,
}

impl ServerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str| non_empty(key).and_then(|v| v.parse::<u64>().ok());

        let current_db_url = non_empty("CURRENT_DB_URL")
            .or_else(|| non_empty("DATABASE_URL"))
            .ok_or_else(|| anyhow!("CURRENT_DB_URL (or DATABASE_URL) must be set"))?;
        let jwt_secret =
            non_empty("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let pool_size = |key: &str| {
            parsed(key)
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(DEFAULT_MAX_CONNS)
        };

        Ok(Self {
            current_db_url,
            current_db_max_conns: pool_size("CURRENT_DB_MAX_OPEN_CONNS"),
            archive_db_url: non_empty("ARCHIVE_DB_URL"),
            archive_db_max_conns: pool_size("ARCHIVE_DB_MAX_OPEN_CONNS"),
            archive_enabled: non_empty("ARCHIVE").as_deref() == Some("1"),
            jwt_secret,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            country_code: parsed("COUNTRY_CODE")
                .and_then(|n| u16::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_COUNTRY_CODE),
            vintage: VintageSettings {
                endpoint: non_empty("VINTAGE_SYNC_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_VINTAGE_ENDPOINT.into()),
                interval: parsed("VINTAGE_SYNC_INTERVAL_SECS")
                    .filter(|n| *n > 0)
                    .map(Duration::from_secs),
                timeout: Duration::from_secs(
                    parsed("VINTAGE_SYNC_TIMEOUT_SECS")
                        .filter(|n| *n > 0)
                        .unwrap_or(DEFAULT_VINTAGE_TIMEOUT_SECS),
                ),
                max_concurrency: parsed("VINTAGE_SYNC_MAX_CONCURRENCY")
                    .filter(|n| *n > 0)
                    .and_then(|n| usize::try_from(n).ok()),
            },
        })
    }

    /// Archive URL to connect to, only when routing is switched on.
    pub fn archive_target(&self) -> Option<&str> {
        if self.archive_enabled {
            self.archive_db_url.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("CURRENT_DB_URL", "postgres:///lender"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.current_db_max_conns, DEFAULT_MAX_CONNS);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.country_code, 254);
        assert!(!cfg.archive_enabled);
        assert_eq!(cfg.vintage.endpoint, DEFAULT_VINTAGE_ENDPOINT);
        assert_eq!(cfg.vintage.timeout, Duration::from_secs(10));
        assert!(cfg.vintage.interval.is_none());
        assert!(cfg.vintage.max_concurrency.is_none());
    }

    #[test]
    fn database_url_is_fallback() {
        let cfg = load(&[("DATABASE_URL", "postgres:///fallback"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.current_db_url, "postgres:///fallback");
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(load(&[("CURRENT_DB_URL", "postgres:///lender")]).is_err());
        assert!(load(&[("JWT_SECRET", "s")]).is_err());
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let cfg = load(&[
            ("CURRENT_DB_URL", "postgres:///lender"),
            ("JWT_SECRET", "s"),
            ("CURRENT_DB_MAX_OPEN_CONNS", "many"),
            ("COUNTRY_CODE", "-3"),
            ("VINTAGE_SYNC_TIMEOUT_SECS", "soon"),
        ])
        .unwrap();
        assert_eq!(cfg.current_db_max_conns, DEFAULT_MAX_CONNS);
        assert_eq!(cfg.country_code, DEFAULT_COUNTRY_CODE);
        assert_eq!(cfg.vintage.timeout, Duration::from_secs(10));
    }

    #[test]
    fn archive_needs_flag_and_url() {
        let off = load(&[
            ("CURRENT_DB_URL", "postgres:///lender"),
            ("JWT_SECRET", "s"),
            ("ARCHIVE_DB_URL", "postgres:///archive"),
        ])
        .unwrap();
        assert_eq!(off.archive_target(), None);

        let on = load(&[
            ("CURRENT_DB_URL", "postgres:///lender"),
            ("JWT_SECRET", "s"),
            ("ARCHIVE_DB_URL", "postgres:///archive"),
            ("ARCHIVE", "1"),
            ("ARCHIVE_DB_MAX_OPEN_CONNS", "8"),
        ])
        .unwrap();
        assert_eq!(on.archive_target(), Some("postgres:///archive"));
        assert_eq!(on.archive_db_max_conns, 8);
    }

    #[test]
    fn vintage_schedule_settings() {
        let cfg = load(&[
            ("CURRENT_DB_URL", "postgres:///lender"),
            ("JWT_SECRET", "s"),
            ("VINTAGE_SYNC_INTERVAL_SECS", "3600"),
            ("VINTAGE_SYNC_MAX_CONCURRENCY", "16"),
            ("VINTAGE_SYNC_ENDPOINT", "http://collections.local"),
        ])
        .unwrap();
        assert_eq!(cfg.vintage.interval, Some(Duration::from_secs(3600)));
        assert_eq!(cfg.vintage.max_concurrency, Some(16));
        assert_eq!(cfg.vintage.endpoint, "http://collections.local");
    }
}
