use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_rates_file")]
    pub rates_file: PathBuf,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            rates_file: default_rates_file(),
            database: default_database(),
            table: default_table(),
            log_file: default_log_file(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: ProviderConfig::default(),
            assets: default_assets(),
            currencies: default_currencies(),
            base_currency: default_base_currency(),
            timezone: default_timezone(),
            paths: PathsConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_assets() -> Vec<String> {
    ["bitcoin", "ethereum", "dogecoin", "solana"]
        .map(String::from)
        .to_vec()
}

fn default_currencies() -> Vec<String> {
    ["pkr", "usd", "eur", "gbp", "inr", "aud"]
        .map(String::from)
        .to_vec()
}

fn default_base_currency() -> String {
    "pkr".to_string()
}

fn default_timezone() -> String {
    "Asia/Karachi".to_string()
}

fn default_rates_file() -> PathBuf {
    PathBuf::from("./input/exchange_rate.csv")
}

fn default_database() -> PathBuf {
    PathBuf::from("crypto_data.db")
}

fn default_table() -> String {
    "crypto_prices".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("./logs/code_log.txt")
}

impl AppConfig {
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "crypto-etl", "crypto-etl")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Loads the file at `path`, or the default config file. A missing
    /// default config file yields the built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            anyhow::bail!("At least one asset must be configured");
        }
        if self.currencies.is_empty() {
            anyhow::bail!("At least one currency must be configured");
        }
        if self.base_currency.trim().is_empty() {
            anyhow::bail!("Base currency must not be empty");
        }
        if self.paths.table.trim().is_empty() {
            anyhow::bail!("Table name must not be empty");
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}': {}", self.timezone, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://example.com/api"
  timeout_secs: 3
assets: ["bitcoin", "litecoin"]
currencies: ["pkr", "usd"]
base_currency: "PKR"
timezone: "Europe/London"
paths:
  rates_file: "./rates.csv"
  database: "/tmp/prices.db"
  table: "prices"
  log_file: "./etl.log"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://example.com/api");
        assert_eq!(config.provider.timeout(), Duration::from_secs(3));
        assert_eq!(config.assets, vec!["bitcoin", "litecoin"]);
        assert_eq!(config.currencies, vec!["pkr", "usd"]);
        assert_eq!(config.base_currency, "PKR");
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::London);
        assert_eq!(config.paths.rates_file, PathBuf::from("./rates.csv"));
        assert_eq!(config.paths.database, PathBuf::from("/tmp/prices.db"));
        assert_eq!(config.paths.table, "prices");
        assert_eq!(config.paths.log_file, PathBuf::from("./etl.log"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_yaml::from_str("assets: [\"solana\"]\n").unwrap();
        assert_eq!(config.assets, vec!["solana"]);
        assert_eq!(config.provider, ProviderConfig::default());
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.currencies.len(), 6);
        assert_eq!(config.base_currency, "pkr");
        assert_eq!(config.tz().unwrap(), chrono_tz::Asia::Karachi);
        assert_eq!(config.paths, PathsConfig::default());
        assert_eq!(config.paths.table, "crypto_prices");
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timezone: \"Mars/Olympus\"").unwrap();

        let result = AppConfig::load_from_path(file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid timezone"));
    }

    #[test]
    fn test_empty_assets_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "assets: []").unwrap();
        assert!(AppConfig::load_from_path(file.path()).is_err());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_or_default(Some("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
