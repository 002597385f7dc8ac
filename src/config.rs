//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::normalize_api_url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
/// Default timeout for backend requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOG_FILTER: &str = "info,menu_catalog=debug";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` still wins when set.
    pub filter: String,
    /// Directory for daily rolling log files. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
    pub log: LogConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            log: LogConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Read `CATALOG_API_URL`, `CATALOG_AUTH_TOKEN`,
    /// `CATALOG_HTTP_TIMEOUT_SECS`, `CATALOG_LOG_DIR` and
    /// `CATALOG_LOG_FILTER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = read("CATALOG_API_URL")
            .map(|url| normalize_api_url(&url))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = read("CATALOG_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            api_url,
            auth_token: read("CATALOG_AUTH_TOKEN"),
            timeout,
            log: LogConfig {
                filter: read("CATALOG_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                dir: read("CATALOG_LOG_DIR").map(PathBuf::from),
            },
        }
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

    #[test]
    fn defaults_when_unset() {
        let config = CatalogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn reads_and_normalizes_values() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("CATALOG_API_URL", "admin.example.com/"),
            ("CATALOG_AUTH_TOKEN", " secret "),
            ("CATALOG_HTTP_TIMEOUT_SECS", "5"),
            ("CATALOG_LOG_DIR", "/tmp/catalog-logs"),
        ]));
        assert_eq!(config.api_url, "https://admin.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.log.dir, Some(PathBuf::from("/tmp/catalog-logs")));
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn invalid_timeout_falls_back() {
        for bad in ["0", "soon", ""] {
            let config = CatalogConfig::from_lookup(lookup(&[("CATALOG_HTTP_TIMEOUT_SECS", bad)]));
            assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        }
    }
}
