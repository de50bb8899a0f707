use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use bazaar_db::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub db: DbConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset keys take their default,
    /// malformed numbers are an error rather than a silent fallback.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = DbConfig::default();

        let readers: usize = parse_or(&lookup, "BAZAAR_DB_READERS", defaults.readers)?;
        let busy_ms: u64 = parse_or(
            &lookup,
            "BAZAAR_BUSY_TIMEOUT_MS",
            defaults.busy_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            host: lookup("BAZAAR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "BAZAAR_PORT", 8000)?,
            db_path: lookup("BAZAAR_DB_PATH")
                .unwrap_or_else(|| "bazaar.db".into())
                .into(),
            db: DbConfig {
                readers,
                busy_timeout: Duration::from_millis(busy_ms),
                ..defaults
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_address(), "0.0.0.0:8000");
        assert_eq!(config.db_path, PathBuf::from("bazaar.db"));
        assert_eq!(config.db.readers, 4);
        assert_eq!(config.db.busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("BAZAAR_HOST", "127.0.0.1"),
            ("BAZAAR_PORT", "9090"),
            ("BAZAAR_DB_PATH", "/tmp/market.db"),
            ("BAZAAR_DB_READERS", "2"),
            ("BAZAAR_BUSY_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.server_address(), "127.0.0.1:9090");
        assert_eq!(config.db_path, PathBuf::from("/tmp/market.db"));
        assert_eq!(config.db.readers, 2);
        assert_eq!(config.db.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = config_from(&[("BAZAAR_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("BAZAAR_PORT"));
    }
}
