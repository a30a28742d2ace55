//! KRW/USD conversion with a caller-supplied exchange rate.
//!
//! The rate is always expressed as KRW per one USD. Conversions keep full
//! `Decimal` precision; rounding happens only when an amount is rendered
//! (see [`Currency::round_for_display`]).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Currency;

/// A validated KRW-per-USD exchange rate (always `> 0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    /// Validate a KRW-per-USD rate. A rate `<= 0` is a config error.
    pub fn new(krw_per_usd: Decimal) -> Result<Self> {
        if krw_per_usd <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "exchange rate must be > 0, got {krw_per_usd}"
            )));
        }
        Ok(Self(krw_per_usd))
    }

    /// Same as [`ExchangeRate::new`] for a float rate (e.g. from a config file).
    pub fn from_f64(krw_per_usd: f64) -> Result<Self> {
        let rate = Decimal::try_from(krw_per_usd).map_err(|_| {
            Error::Config(format!("exchange rate is not a finite number: {krw_per_usd}"))
        })?;
        Self::new(rate)
    }

    #[inline]
    pub fn krw_per_usd(self) -> Decimal {
        self.0
    }

    /// Express `amount` (denominated in `currency`) in KRW.
    ///
    /// Fails with [`Error::Config`] when the product leaves `Decimal` range.
    #[inline]
    pub fn to_krw(self, amount: Decimal, currency: Currency) -> Result<Decimal> {
        match currency {
            Currency::Krw => Ok(amount),
            Currency::Usd => amount
                .checked_mul(self.0)
                .ok_or_else(|| self.overflow(amount, currency, Currency::Krw)),
        }
    }

    /// Express `amount` (denominated in `currency`) in USD.
    ///
    /// Fails with [`Error::Config`] when the quotient leaves `Decimal` range.
    #[inline]
    pub fn to_usd(self, amount: Decimal, currency: Currency) -> Result<Decimal> {
        match currency {
            Currency::Krw => amount
                .checked_div(self.0)
                .ok_or_else(|| self.overflow(amount, currency, Currency::Usd)),
            Currency::Usd => Ok(amount),
        }
    }

    /// Express `amount` from `from` in `to`.
    #[inline]
    pub fn convert(self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal> {
        match to {
            Currency::Krw => self.to_krw(amount, from),
            Currency::Usd => self.to_usd(amount, from),
        }
    }

    fn overflow(self, amount: Decimal, from: Currency, to: Currency) -> Error {
        Error::Config(format!(
            "converting {amount} {from} to {to} at {} KRW/USD overflows",
            self.0
        ))
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

/// Convert `amount` in `currency` to KRW using `rate` (KRW per USD).
pub fn to_krw(amount: Decimal, currency: Currency, rate: Decimal) -> Result<Decimal> {
    ExchangeRate::new(rate)?.to_krw(amount, currency)
}

/// Convert `amount` in `currency` to USD using `rate` (KRW per USD).
pub fn to_usd(amount: Decimal, currency: Currency, rate: Decimal) -> Result<Decimal> {
    ExchangeRate::new(rate)?.to_usd(amount, currency)
}
