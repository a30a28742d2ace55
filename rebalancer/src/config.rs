//! TOML configuration loading and validation.

use std::path::Path;

use holdbook::{BrokerFormat, Currency, ExchangeRate, NominalPrices};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    pub fx: FxConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub estimate: EstimateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    #[serde(default)]
    pub format: FormatSetting,
}

/// Broker format of the payloads: fixed, or detected per payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSetting {
    #[default]
    Auto,
    ItemList,
    AccountStock,
}

impl FormatSetting {
    /// The format to read `payload` with.
    pub fn resolve(self, payload: &Value) -> holdbook::Result<BrokerFormat> {
        match self {
            FormatSetting::Auto => BrokerFormat::detect(payload),
            FormatSetting::ItemList => Ok(BrokerFormat::ItemList),
            FormatSetting::AccountStock => Ok(BrokerFormat::AccountStock),
        }
    }
}

impl std::str::FromStr for FormatSetting {
    type Err = holdbook::Error;

    fn from_str(s: &str) -> holdbook::Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(FormatSetting::Auto);
        }
        Ok(match s.parse::<BrokerFormat>()? {
            BrokerFormat::ItemList => FormatSetting::ItemList,
            BrokerFormat::AccountStock => FormatSetting::AccountStock,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FxConfig {
    /// KRW per one USD.
    pub krw_per_usd: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateConfig {
    #[serde(default = "default_nominal_krw")]
    pub nominal_price_krw: f64,
    #[serde(default = "default_nominal_usd")]
    pub nominal_price_usd: f64,
}

fn default_nominal_krw() -> f64 {
    50_000.0
}
fn default_nominal_usd() -> f64 {
    100.0
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            nominal_price_krw: default_nominal_krw(),
            nominal_price_usd: default_nominal_usd(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.account.id.trim().is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        if !self.fx.krw_per_usd.is_finite() || self.fx.krw_per_usd <= 0.0 {
            return Err(Error::Config(format!(
                "fx.krw_per_usd must be > 0, got {}",
                self.fx.krw_per_usd
            )));
        }
        for (key, value) in [
            ("nominal_price_krw", self.estimate.nominal_price_krw),
            ("nominal_price_usd", self.estimate.nominal_price_usd),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("estimate.{key} must be > 0, got {value}")));
            }
        }
        if self.logging.audit_file.trim().is_empty() {
            return Err(Error::Config("logging.audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Validated exchange rate.
    pub fn exchange_rate(&self) -> Result<ExchangeRate> {
        Ok(ExchangeRate::from_f64(self.fx.krw_per_usd)?)
    }

    /// Nominal share-price divisors for approximate share counts.
    pub fn nominal_prices(&self) -> Result<NominalPrices> {
        let to_decimal = |key: &str, value: f64| {
            Decimal::try_from(value)
                .map_err(|_| Error::Config(format!("estimate.{key} is not representable: {value}")))
        };
        Ok(NominalPrices::new(
            to_decimal("nominal_price_krw", self.estimate.nominal_price_krw)?,
            to_decimal("nominal_price_usd", self.estimate.nominal_price_usd)?,
        )?)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
