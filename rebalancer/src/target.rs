//! Target allocation (target.json) and live price sheet (prices.json) loading.

use std::path::Path;

use chrono::{DateTime, Utc};
use holdbook::{Currency, Money, NominalPrices, PriceBook, TargetAllocation};
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A target allocation file: percent weight per line identity.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub targets: Vec<TargetEntry>,
}

/// A single target: line identity (ticker, name or cash label) + weight in percent.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub id: String,
    pub weight: f64,
}

impl TargetSpec {
    /// Load and validate a target.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_input("target", path)?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TargetSpec = serde_json::from_str(json)?;
        spec.allocation()?;
        Ok(spec)
    }

    /// Build the validated allocation table.
    pub fn allocation(&self) -> Result<TargetAllocation> {
        TargetAllocation::new(self.targets.iter().map(|t| (t.id.as_str(), t.weight)))
            .map_err(|e| match e {
                holdbook::Error::Config(msg) => Error::Target(msg),
                other => Error::Core(other),
            })
    }

    /// Sum of all weights, percent.
    pub fn total_weight(&self) -> f64 {
        self.targets.iter().map(|t| t.weight).sum()
    }
}

/// A live price sheet: per-share price per line identity.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSheet {
    pub prices: Vec<PriceQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuote {
    pub id: String,
    pub price: f64,
    #[serde(default)]
    pub currency: Currency,
}

impl PriceSheet {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_input("price sheet", path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let sheet: PriceSheet = serde_json::from_str(json)?;
        sheet.validate()?;
        Ok(sheet)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for q in &self.prices {
            if q.id.trim().is_empty() {
                return Err(Error::Target("price sheet has an empty id".into()));
            }
            if !seen.insert(q.id.trim()) {
                return Err(Error::Target(format!("duplicate price for {}", q.id)));
            }
            if !q.price.is_finite() || q.price <= 0.0 {
                return Err(Error::Target(format!(
                    "price for {} must be > 0, got {}",
                    q.id, q.price
                )));
            }
        }
        Ok(())
    }

    /// Price book with these quotes on top of `nominal` fallback divisors.
    pub fn price_book(&self, nominal: NominalPrices) -> Result<PriceBook> {
        let mut book = PriceBook::new(nominal);
        for q in &self.prices {
            let amount = Decimal::try_from(q.price)
                .map_err(|_| Error::Target(format!("price for {} is not representable", q.id)))?;
            book.insert(q.id.trim(), Money::new(amount, q.currency));
        }
        Ok(book)
    }
}

pub(crate) fn read_input(kind: &'static str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::InputRead {
        kind,
        path: path.to_path_buf(),
        source: e,
    })
}
