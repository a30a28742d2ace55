//! Core types: Currency, Money

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Settlement currency of a holding, cash bucket or report.
///
/// Only the two currencies Korean brokerage accounts settle in are modelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "KRW")]
    Krw,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(self) -> &'static str {
        match self {
            Currency::Krw => "KRW",
            Currency::Usd => "USD",
        }
    }

    /// Decimal places shown when rendering an amount (won are whole units).
    pub fn display_scale(self) -> u32 {
        match self {
            Currency::Krw => 0,
            Currency::Usd => 2,
        }
    }

    /// Round `amount` to this currency's display scale.
    ///
    /// Only for rendering: ratio and rebalance math keep full precision.
    pub fn round_for_display(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.display_scale(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KRW" => Ok(Currency::Krw),
            "USD" => Ok(Currency::Usd),
            other => Err(Error::Config(format!("unsupported currency: {other}"))),
        }
    }
}

/// An amount tagged with its currency, rendered the way the account screens show it.
///
/// `Money::new(dec!(1234567), Currency::Krw)` displays as `1,234,567원`,
/// `Money::new(dec!(-12.5), Currency::Usd)` as `-$12.50`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.currency.round_for_display(self.amount);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        let abs = rounded.abs();
        let units = abs.trunc().normalize();
        let grouped = group_thousands(&units.to_string());

        match self.currency {
            Currency::Krw => write!(f, "{sign}{grouped}원"),
            Currency::Usd => {
                let cents = ((abs - units) * Decimal::ONE_HUNDRED).trunc().normalize().to_string();
                write!(f, "{sign}${grouped}.{cents:0>2}")
            }
        }
    }
}

/// Insert `,` every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
