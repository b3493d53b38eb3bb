//! Service settings
//!
//! Layered as: built-in defaults, then an optional `market-data.toml` in the
//! working directory, then `MARKET_DATA_*` environment variables.

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub log_level: String,
    /// Upper bound on a single provider call
    pub provider_timeout_ms: u64,
    pub quote_ttl_secs: u64,
    pub alpha_vantage_key: Option<String>,
    pub exchange_rate_url: Option<String>,
    pub cftc_url: Option<String>,
    /// Skip the COT source entirely and serve placeholder positioning
    pub cot_enabled: bool,
    pub redis_url: Option<String>,
    /// Fixes placeholder output, handy for demos
    pub seed: Option<u64>,
}

/// `MARKET_DATA_PORT`, `MARKET_DATA_REDIS_URL`, ...
fn environment() -> Environment {
    Environment::with_prefix("MARKET_DATA")
        .prefix_separator("_")
        .separator("__")
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(File::with_name("market-data").required(false), environment())
    }

    fn load_from<F>(file: F, env: Environment) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("port", 8080)?
            .set_default("log_level", "info")?
            .set_default("provider_timeout_ms", 5_000)?
            .set_default("quote_ttl_secs", 30)?
            .set_default("cot_enabled", true)?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn env(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from(File::from_str("", FileFormat::Toml), env(&[])).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.provider_timeout(), Duration::from_secs(5));
        assert_eq!(settings.quote_ttl_secs, 30);
        assert!(settings.cot_enabled);
        assert!(settings.alpha_vantage_key.is_none());
        assert!(settings.seed.is_none());
    }

    #[test]
    fn test_file_then_env() {
        let toml = "port = 9000\nseed = 9\ncot_enabled = false\n";
        let settings = Settings::load_from(
            File::from_str(toml, FileFormat::Toml),
            env(&[
                ("MARKET_DATA_PORT", "9100"),
                ("MARKET_DATA_REDIS_URL", "redis://127.0.0.1:6379"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.port, 9100);
        assert_eq!(settings.seed, Some(9));
        assert!(!settings.cot_enabled);
        assert_eq!(settings.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }
}
