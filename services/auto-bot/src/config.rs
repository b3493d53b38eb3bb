//! Scanner and service configuration

use config::{Config, ConfigError, Environment, File, Source};
use market_data::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::types::{Result, ScannerError};

pub const MAX_SCAN_INTERVAL_MINUTES: u32 = 24 * 60;
pub const MAX_CONCURRENT_BOTS: u32 = 50;

/// User-editable scanner settings. Lives in process memory only.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerConfig {
    // The config crate lowercases file and env keys, hence the flat aliases
    #[serde(alias = "min_score", alias = "minscore")]
    pub min_score: f64,
    #[serde(alias = "max_score", alias = "maxscore")]
    pub max_score: f64,
    /// Running Auto bots whose instrument drops below this are stopped
    #[serde(alias = "stop_score", alias = "stopscore")]
    pub stop_score: f64,
    #[serde(alias = "allowed_instruments", alias = "allowedinstruments")]
    pub allowed_instruments: BTreeSet<Instrument>,
    #[serde(alias = "scan_interval_minutes", alias = "scanintervalminutes")]
    pub scan_interval_minutes: u32,
    #[serde(alias = "max_concurrent_bots", alias = "maxconcurrentbots")]
    pub max_concurrent_bots: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_score: 7.0,
            max_score: 10.0,
            stop_score: 5.0,
            allowed_instruments: Instrument::all().into_iter().collect(),
            scan_interval_minutes: 15,
            max_concurrent_bots: 3,
        }
    }
}

impl ScannerConfig {
    /// Check every field, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("minScore", self.min_score),
            ("maxScore", self.max_score),
            ("stopScore", self.stop_score),
        ] {
            if !(0.0..=10.0).contains(&value) {
                problems.push(format!("{} must be between 0 and 10, got {}", name, value));
            }
        }
        if self.min_score > self.max_score {
            problems.push(format!(
                "minScore ({}) must not exceed maxScore ({})",
                self.min_score, self.max_score
            ));
        }
        if self.stop_score > self.max_score {
            problems.push(format!(
                "stopScore ({}) must not exceed maxScore ({})",
                self.stop_score, self.max_score
            ));
        }
        if !(1..=MAX_SCAN_INTERVAL_MINUTES).contains(&self.scan_interval_minutes) {
            problems.push(format!(
                "scanIntervalMinutes must be between 1 and {}, got {}",
                MAX_SCAN_INTERVAL_MINUTES, self.scan_interval_minutes
            ));
        }
        if self.max_concurrent_bots > MAX_CONCURRENT_BOTS {
            problems.push(format!(
                "maxConcurrentBots must be at most {}, got {}",
                MAX_CONCURRENT_BOTS, self.max_concurrent_bots
            ));
        }
        if self.allowed_instruments.is_empty() {
            problems.push("allowedInstruments must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScannerError::InvalidConfig(problems.join("; ")))
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.scan_interval_minutes) * 60)
    }

    /// Whether a D-Size falls inside the acceptance band
    pub fn in_band(&self, dsize: f64) -> bool {
        self.min_score <= dsize && dsize <= self.max_score
    }
}

/// Where the scanner gets its market readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// Seeded random stand-in readings
    #[default]
    Random,
    /// Quotes and COT from the market data providers, random for the rest
    Feed,
}

/// `AUTOBOT_PORT`, `AUTOBOT_SCANNER__MIN_SCORE`, ...; a double underscore
/// descends into a table
fn environment() -> Environment {
    Environment::with_prefix("AUTOBOT")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("scanner.allowed_instruments")
        .try_parsing(true)
}

/// Service settings: defaults, then `auto-bot.toml`, then `AUTOBOT_*` env vars
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub log_level: String,
    pub provider_timeout_ms: u64,
    pub signal_mode: SignalMode,
    pub seed: Option<u64>,
    pub enable_on_start: bool,
    pub alpha_vantage_key: Option<String>,
    pub cot_enabled: bool,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl Settings {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(File::with_name("auto-bot").required(false), environment())
    }

    fn load_from<F>(file: F, env: Environment) -> std::result::Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .set_default("port", 8081)?
            .set_default("log_level", "info")?
            .set_default("provider_timeout_ms", 5_000)?
            .set_default("signal_mode", "random")?
            .set_default("enable_on_start", false)?
            .set_default("cot_enabled", true)?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings
            .scanner
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.allowed_instruments.len(), 29);
        assert_eq!(config.scan_interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_rejects_inverted_band() {
        let config = ScannerConfig {
            min_score: 9.0,
            max_score: 8.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("minScore"));
    }

    #[test]
    fn test_reports_every_problem() {
        let config = ScannerConfig {
            min_score: -1.0,
            stop_score: 11.0,
            scan_interval_minutes: 0,
            max_concurrent_bots: 51,
            allowed_instruments: BTreeSet::new(),
            ..Default::default()
        };
        let msg = config.validate().unwrap_err().to_string();
        for field in [
            "minScore",
            "stopScore",
            "scanIntervalMinutes",
            "maxConcurrentBots",
            "allowedInstruments",
        ] {
            assert!(msg.contains(field), "missing {} in {}", field, msg);
        }
    }

    #[test]
    fn test_band_is_inclusive() {
        let config = ScannerConfig {
            min_score: 7.0,
            max_score: 9.0,
            ..Default::default()
        };
        assert!(config.in_band(7.0));
        assert!(config.in_band(9.0));
        assert!(!config.in_band(6.9));
        assert!(!config.in_band(9.5));
    }

    #[test]
    fn test_wire_names_and_partial_body() {
        let config: ScannerConfig = serde_json::from_value(serde_json::json!({
            "minScore": 8,
            "allowedInstruments": ["EUR/USD", "xauusd"],
            "scanIntervalMinutes": 5
        }))
        .unwrap();

        assert_eq!(config.min_score, 8.0);
        assert_eq!(config.max_score, 10.0);
        assert_eq!(config.allowed_instruments.len(), 2);
        assert_eq!(config.scan_interval_minutes, 5);

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("maxConcurrentBots").is_some());
    }

    #[test]
    fn test_unknown_instrument_rejected_on_parse() {
        let parsed = serde_json::from_value::<ScannerConfig>(serde_json::json!({
            "allowedInstruments": ["EUR/USD", "BTC/USD"]
        }));
        assert!(parsed.is_err());
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_settings_file_uses_wire_names() {
        let toml = r#"
            signal_mode = "feed"

            [scanner]
            minScore = 8.0
            maxConcurrentBots = 7
            allowedInstruments = ["EUR/USD", "XAU/USD"]
        "#;
        let settings =
            Settings::load_from(File::from_str(toml, FileFormat::Toml), env(&[])).unwrap();

        assert_eq!(settings.port, 8081);
        assert_eq!(settings.signal_mode, SignalMode::Feed);
        assert_eq!(settings.scanner.min_score, 8.0);
        assert_eq!(settings.scanner.max_concurrent_bots, 7);
        assert_eq!(settings.scanner.allowed_instruments.len(), 2);
        assert_eq!(settings.scanner.scan_interval_minutes, 15);
    }

    #[test]
    fn test_settings_env_overrides_file() {
        let toml = "[scanner]\nmax_concurrent_bots = 7\n";
        let settings = Settings::load_from(
            File::from_str(toml, FileFormat::Toml),
            env(&[
                ("AUTOBOT_PORT", "9999"),
                ("AUTOBOT_SCANNER__MAX_CONCURRENT_BOTS", "2"),
                ("AUTOBOT_SCANNER__ALLOWED_INSTRUMENTS", "EUR/USD,GBP/USD"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.port, 9999);
        assert_eq!(settings.scanner.max_concurrent_bots, 2);
        assert_eq!(settings.scanner.allowed_instruments.len(), 2);
    }

    #[test]
    fn test_settings_reject_invalid_scanner() {
        let toml = "[scanner]\nminScore = 9.0\nmaxScore = 8.0\n";
        let err = Settings::load_from(File::from_str(toml, FileFormat::Toml), env(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("minScore"));
    }
}
