//! Canonical holding and cash records produced from raw broker payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::ExchangeRate;
use crate::error::Result;
use crate::types::Currency;

/// Label of the synthesized KRW deposit line.
pub const KRW_CASH_LABEL: &str = "원화 현금 (예수금)";
/// Label of the synthesized USD deposit line.
pub const USD_CASH_LABEL: &str = "달러 현금 (USD)";

/// One security line of a brokerage account, independent of the broker's format.
///
/// `price` and `valuation` are denominated in `currency`; nothing downstream
/// mixes currencies without going through [`ExchangeRate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    pub name: String,
    pub ticker_or_id: Option<String>,
    pub quantity: Decimal,
    pub price: Decimal,
    pub valuation: Decimal,
    pub currency: Currency,
    pub is_foreign: bool,
    pub available_quantity: Decimal,
}

impl HoldingRecord {
    /// Identity used to match this holding against a target table:
    /// the ticker when the broker reports one, else the display name.
    pub fn line_id(&self) -> &str {
        self.ticker_or_id.as_deref().unwrap_or(&self.name)
    }

    /// Valuation expressed in `currency`.
    pub fn valuation_in(&self, currency: Currency, rate: ExchangeRate) -> Result<Decimal> {
        rate.convert(self.valuation, self.currency, currency)
    }
}

/// A currency bucket of uninvested cash held in an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPosition {
    pub label: String,
    pub amount: Decimal,
    pub currency: Currency,
}

impl CashPosition {
    /// The KRW deposit bucket.
    pub fn krw(amount: Decimal) -> Self {
        Self {
            label: KRW_CASH_LABEL.to_string(),
            amount,
            currency: Currency::Krw,
        }
    }

    /// The USD deposit bucket.
    pub fn usd(amount: Decimal) -> Self {
        Self {
            label: USD_CASH_LABEL.to_string(),
            amount,
            currency: Currency::Usd,
        }
    }
}

/// Raw per-currency cash balances of an account, each in its own currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalances {
    pub krw: Option<Decimal>,
    pub usd: Option<Decimal>,
}

impl CashBalances {
    pub fn new(krw: Option<Decimal>, usd: Option<Decimal>) -> Self {
        Self { krw, usd }
    }

    /// Cash positions for every bucket with a strictly positive balance,
    /// KRW first.
    pub fn positions(&self) -> Vec<CashPosition> {
        let mut out = Vec::with_capacity(2);
        if let Some(krw) = self.krw.filter(|v| *v > Decimal::ZERO) {
            out.push(CashPosition::krw(krw));
        }
        if let Some(usd) = self.usd.filter(|v| *v > Decimal::ZERO) {
            out.push(CashPosition::usd(usd));
        }
        out
    }
}
