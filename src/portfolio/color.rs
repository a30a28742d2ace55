//! Display color tokens for composition lines.
//!
//! A line's color depends only on its rank among non-cash lines and, for
//! cash, on its currency bucket. Re-aggregating identical input therefore
//! always reproduces identical colors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::Currency;

/// Number of distinct palette slots handed to top-ranked holdings.
pub const PALETTE_SIZE: usize = 10;

/// Default light-theme hex value of each palette slot.
pub const PALETTE_HEX: [&str; PALETTE_SIZE] = [
    "#365BC5", "#FF6B35", "#4CAF50", "#9C27B0", "#FF9800", "#00BCD4", "#E91E63", "#FFEB3B",
    "#607D8B", "#8BC34A",
];

const CASH_KRW_HEX: &str = "#3DB9D3";
const CASH_USD_HEX: &str = "#5E44FF";
const OVERFLOW_HEX: &str = "#AAAAAA";

/// Stable color token of a composition line, serialized as its string form
/// (`palette-0` .. `palette-9`, `cash-krw`, `cash-usd`, `overflow`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ColorToken {
    /// Slot of the fixed palette, `0..PALETTE_SIZE`.
    Palette(u8),
    CashKrw,
    CashUsd,
    /// Shared by every holding ranked past the palette.
    Overflow,
}

impl ColorToken {
    /// Token of the non-cash line at zero-based `rank`.
    pub fn for_rank(rank: usize) -> Self {
        if rank < PALETTE_SIZE {
            ColorToken::Palette(rank as u8)
        } else {
            ColorToken::Overflow
        }
    }

    /// Reserved token of a cash bucket.
    pub fn for_cash(currency: Currency) -> Self {
        match currency {
            Currency::Krw => ColorToken::CashKrw,
            Currency::Usd => ColorToken::CashUsd,
        }
    }

    /// Default hex color for rendering.
    pub fn hex(self) -> &'static str {
        match self {
            ColorToken::Palette(i) => PALETTE_HEX
                .get(i as usize)
                .copied()
                .unwrap_or(OVERFLOW_HEX),
            ColorToken::CashKrw => CASH_KRW_HEX,
            ColorToken::CashUsd => CASH_USD_HEX,
            ColorToken::Overflow => OVERFLOW_HEX,
        }
    }

    pub fn is_cash(self) -> bool {
        matches!(self, ColorToken::CashKrw | ColorToken::CashUsd)
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorToken::Palette(i) => write!(f, "palette-{i}"),
            ColorToken::CashKrw => f.write_str("cash-krw"),
            ColorToken::CashUsd => f.write_str("cash-usd"),
            ColorToken::Overflow => f.write_str("overflow"),
        }
    }
}

impl FromStr for ColorToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash-krw" => Ok(ColorToken::CashKrw),
            "cash-usd" => Ok(ColorToken::CashUsd),
            "overflow" => Ok(ColorToken::Overflow),
            _ => s
                .strip_prefix("palette-")
                .and_then(|i| i.parse::<u8>().ok())
                .filter(|i| (*i as usize) < PALETTE_SIZE)
                .map(ColorToken::Palette)
                .ok_or_else(|| Error::Parse {
                    field: "color",
                    value: s.to_string(),
                    reason: "unknown color token".into(),
                }),
        }
    }
}

impl From<ColorToken> for String {
    fn from(token: ColorToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for ColorToken {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_tokens() {
        assert_eq!(ColorToken::for_rank(0), ColorToken::Palette(0));
        assert_eq!(ColorToken::for_rank(9), ColorToken::Palette(9));
        assert_eq!(ColorToken::for_rank(10), ColorToken::Overflow);
        assert_eq!(ColorToken::for_rank(500), ColorToken::Overflow);
    }

    #[test]
    fn cash_tokens_are_distinct() {
        let krw = ColorToken::for_cash(Currency::Krw);
        let usd = ColorToken::for_cash(Currency::Usd);
        assert_ne!(krw, usd);
        assert!(krw.is_cash() && usd.is_cash());
        assert_ne!(krw.hex(), usd.hex());
        assert!(!PALETTE_HEX.contains(&krw.hex()));
        assert!(!PALETTE_HEX.contains(&usd.hex()));
    }

    #[test]
    fn palette_is_distinct() {
        let mut hex = PALETTE_HEX.to_vec();
        hex.sort_unstable();
        hex.dedup();
        assert_eq!(hex.len(), PALETTE_SIZE);
    }

    #[test]
    fn string_form() {
        for token in [
            ColorToken::Palette(0),
            ColorToken::Palette(7),
            ColorToken::CashKrw,
            ColorToken::CashUsd,
            ColorToken::Overflow,
        ] {
            assert_eq!(token.to_string().parse::<ColorToken>().unwrap(), token);
        }
        assert!("palette-10".parse::<ColorToken>().is_err());
        assert!("#365BC5".parse::<ColorToken>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        assert_eq!(serde_json::to_string(&ColorToken::Palette(3)).unwrap(), "\"palette-3\"");
        let token: ColorToken = serde_json::from_str("\"cash-usd\"").unwrap();
        assert_eq!(token, ColorToken::CashUsd);
    }
}
