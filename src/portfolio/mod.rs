//! Portfolio aggregation: holdings and cash into one valued, ranked composition.
//!
//! [`aggregate`] projects every line into a single reporting currency, computes
//! its share of the total, sorts by that share and assigns display colors.
//!
//! # Example
//!
//! ```
//! use holdbook::holding::{CashBalances, HoldingRecord};
//! use holdbook::portfolio::{aggregate, ColorToken};
//! use holdbook::Currency;
//! use rust_decimal_macros::dec;
//!
//! let holding = |name: &str, value| HoldingRecord {
//!     name: name.into(),
//!     ticker_or_id: None,
//!     quantity: dec!(1),
//!     price: value,
//!     valuation: value,
//!     currency: Currency::Krw,
//!     is_foreign: false,
//!     available_quantity: dec!(1),
//! };
//! let holdings = [holding("A", dec!(340000)), holding("B", dec!(160000))];
//!
//! let snapshot = aggregate("acct", &holdings, &CashBalances::default(), Currency::Krw, dec!(1350)).unwrap();
//! assert_eq!(snapshot.lines[0].ratio, 68.0);
//! assert_eq!(snapshot.lines[1].color, ColorToken::Palette(1));
//! ```

pub mod color;

pub use color::{ColorToken, PALETTE_HEX, PALETTE_SIZE};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::currency::ExchangeRate;
use crate::error::{Error, Result};
use crate::holding::{CashBalances, CashPosition, HoldingRecord};
use crate::types::{Currency, Money};

/// Whether a composition line is a security or a cash bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Holding,
    Cash,
}

/// One valued line of a [`PortfolioSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioLine {
    /// Identity matched against target tables: ticker, name, or cash label.
    pub id: String,
    pub name: String,
    pub kind: LineKind,
    /// Currency the line is held in.
    pub currency: Currency,
    pub is_foreign: bool,
    /// Value in the line's own currency.
    pub native_value: Decimal,
    /// Value in the snapshot's reporting currency.
    pub value: Decimal,
    /// Shares held (holdings only).
    pub quantity: Option<Decimal>,
    /// Broker-reported price per share in the line's own currency (holdings only).
    pub price: Option<Decimal>,
    /// Percent of the snapshot total, one decimal place.
    pub ratio: f64,
    pub color: ColorToken,
}

impl PortfolioLine {
    pub fn is_cash(&self) -> bool {
        self.kind == LineKind::Cash
    }

    /// Value rendered in the line's own currency.
    pub fn native_money(&self) -> Money {
        Money::new(self.native_value, self.currency)
    }

    fn from_holding(h: &HoldingRecord, reporting: Currency, rate: ExchangeRate) -> Result<Self> {
        Ok(Self {
            id: h.line_id().to_string(),
            name: h.name.clone(),
            kind: LineKind::Holding,
            currency: h.currency,
            is_foreign: h.is_foreign,
            native_value: h.valuation,
            value: h.valuation_in(reporting, rate)?,
            quantity: Some(h.quantity),
            price: Some(h.price).filter(|p| *p > Decimal::ZERO),
            ratio: 0.0,
            color: ColorToken::Overflow,
        })
    }

    fn from_cash(c: &CashPosition, reporting: Currency, rate: ExchangeRate) -> Result<Self> {
        Ok(Self {
            id: c.label.clone(),
            name: c.label.clone(),
            kind: LineKind::Cash,
            currency: c.currency,
            is_foreign: c.currency != Currency::Krw,
            native_value: c.amount,
            value: rate.convert(c.amount, c.currency, reporting)?,
            quantity: None,
            price: None,
            ratio: 0.0,
            color: ColorToken::for_cash(c.currency),
        })
    }
}

/// A fully valued account composition in one reporting currency.
///
/// Built fresh by [`aggregate`] on every refresh and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub account_id: String,
    pub reporting_currency: Currency,
    pub total_value: Decimal,
    /// Sorted by descending ratio, ties in input order.
    pub lines: Vec<PortfolioLine>,
}

impl PortfolioSnapshot {
    /// Look up a line by identity.
    pub fn line(&self, id: &str) -> Option<&PortfolioLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Sum of all line ratios (≈ 100, or 0 for an empty account).
    pub fn ratio_sum(&self) -> f64 {
        self.lines.iter().map(|l| l.ratio).sum()
    }

    /// Snapshot total rendered in `currency`.
    pub fn total_in(&self, currency: Currency, rate: ExchangeRate) -> Result<Money> {
        let amount = rate.convert(self.total_value, self.reporting_currency, currency)?;
        Ok(Money::new(amount, currency))
    }

    pub fn holdings(&self) -> impl Iterator<Item = &PortfolioLine> {
        self.lines.iter().filter(|l| !l.is_cash())
    }

    pub fn cash(&self) -> impl Iterator<Item = &PortfolioLine> {
        self.lines.iter().filter(|l| l.is_cash())
    }
}

/// Merge holdings and cash into a ranked, colored [`PortfolioSnapshot`].
///
/// `rate` is KRW per USD and must be positive; an invalid rate fails before
/// any line is valued. A value or total that overflows in conversion fails
/// with [`Error::Config`]. Cash buckets with a non-positive balance are omitted.
/// When the total is zero every ratio is zero.
pub fn aggregate(
    account_id: &str,
    holdings: &[HoldingRecord],
    cash: &CashBalances,
    reporting_currency: Currency,
    rate: Decimal,
) -> Result<PortfolioSnapshot> {
    let rate = ExchangeRate::new(rate)?;

    let mut lines: Vec<PortfolioLine> = holdings
        .iter()
        .map(|h| PortfolioLine::from_holding(h, reporting_currency, rate))
        .chain(
            cash.positions()
                .iter()
                .map(|c| PortfolioLine::from_cash(c, reporting_currency, rate)),
        )
        .collect::<Result<_>>()?;

    let total_value = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.value))
        .ok_or_else(|| Error::Config(format!("{account_id} total value overflows")))?;
    for line in &mut lines {
        line.ratio = ratio_pct(line.value, total_value);
    }

    // sort_by is stable: equal ratios keep input order
    lines.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));

    let mut rank = 0;
    for line in &mut lines {
        line.color = match line.kind {
            LineKind::Cash => ColorToken::for_cash(line.currency),
            LineKind::Holding => {
                rank += 1;
                ColorToken::for_rank(rank - 1)
            }
        };
    }

    Ok(PortfolioSnapshot {
        account_id: account_id.to_string(),
        reporting_currency,
        total_value,
        lines,
    })
}

/// `value / total * 100`, rounded half away from zero to one decimal.
fn ratio_pct(value: Decimal, total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (value / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holding::{KRW_CASH_LABEL, USD_CASH_LABEL};
    use rust_decimal_macros::dec;

    fn krw(name: &str, value: Decimal) -> HoldingRecord {
        HoldingRecord {
            name: name.into(),
            ticker_or_id: None,
            quantity: dec!(1),
            price: value,
            valuation: value,
            currency: Currency::Krw,
            is_foreign: false,
            available_quantity: dec!(1),
        }
    }

    fn usd(ticker: &str, value: Decimal) -> HoldingRecord {
        HoldingRecord {
            name: ticker.into(),
            ticker_or_id: Some(ticker.into()),
            quantity: dec!(2),
            price: value / dec!(2),
            valuation: value,
            currency: Currency::Usd,
            is_foreign: true,
            available_quantity: dec!(2),
        }
    }

    #[test]
    fn ratio_rounding() {
        assert_eq!(ratio_pct(dec!(340000), dec!(590000)), 57.6);
        assert_eq!(ratio_pct(dec!(90000), dec!(590000)), 15.3);
        assert_eq!(ratio_pct(dec!(1), dec!(8)), 12.5);
        assert_eq!(ratio_pct(dec!(1), dec!(16)), 6.3); // 6.25 rounds away from zero
        assert_eq!(ratio_pct(dec!(5), dec!(0)), 0.0);
    }

    #[test]
    fn invalid_rate_fails() {
        let err = aggregate("a", &[], &CashBalances::default(), Currency::Krw, dec!(0));
        assert!(matches!(err, Err(crate::Error::Config(_))));
    }

    #[test]
    fn conversion_overflow_fails() {
        let holdings = [krw("A", dec!(10_000_000_000))];
        let tiny = Decimal::new(1, 20);
        let err = aggregate("a", &holdings, &CashBalances::default(), Currency::Usd, tiny);
        assert!(matches!(err, Err(crate::Error::Config(_))));

        // each line fits but their sum does not
        let holdings = [krw("A", Decimal::MAX), krw("B", Decimal::MAX)];
        let err = aggregate("a", &holdings, &CashBalances::default(), Currency::Krw, dec!(1400));
        assert!(matches!(err, Err(crate::Error::Config(_))));
    }

    #[test]
    fn usd_holdings_are_projected() {
        let holdings = [krw("삼성전자", dec!(700000)), usd("AAPL", dec!(500))];
        let snap = aggregate("a", &holdings, &CashBalances::default(), Currency::Krw, dec!(1400)).unwrap();

        assert_eq!(snap.total_value, dec!(1400000));
        let aapl = snap.line("AAPL").unwrap();
        assert_eq!(aapl.value, dec!(700000));
        assert_eq!(aapl.native_value, dec!(500));
        assert_eq!(aapl.currency, Currency::Usd);
        assert_eq!(aapl.ratio, 50.0);
    }

    #[test]
    fn usd_reporting_currency() {
        let holdings = [krw("A", dec!(1400000))];
        let cash = CashBalances::new(None, Some(dec!(1000)));
        let snap = aggregate("a", &holdings, &cash, Currency::Usd, dec!(1400)).unwrap();

        assert_eq!(snap.reporting_currency, Currency::Usd);
        assert_eq!(snap.total_value, dec!(2000));
        assert_eq!(snap.line("A").unwrap().value, dec!(1000));
        let cash_line = snap.line(USD_CASH_LABEL).unwrap();
        assert_eq!(cash_line.value, dec!(1000));
        assert_eq!(cash_line.color, ColorToken::CashUsd);
    }

    #[test]
    fn ties_keep_input_order() {
        let holdings = [krw("first", dec!(100)), krw("second", dec!(100)), krw("third", dec!(100))];
        let snap = aggregate("a", &holdings, &CashBalances::default(), Currency::Krw, dec!(1350)).unwrap();
        let names: Vec<_> = snap.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn cash_keeps_reserved_color_when_top_ranked() {
        let holdings = [krw("A", dec!(100)), krw("B", dec!(50))];
        let cash = CashBalances::new(Some(dec!(1000)), None);
        let snap = aggregate("a", &holdings, &cash, Currency::Krw, dec!(1350)).unwrap();

        assert_eq!(snap.lines[0].id, KRW_CASH_LABEL);
        assert_eq!(snap.lines[0].color, ColorToken::CashKrw);
        // palette slots count non-cash lines only
        assert_eq!(snap.lines[1].color, ColorToken::Palette(0));
        assert_eq!(snap.lines[2].color, ColorToken::Palette(1));
    }

    #[test]
    fn overflow_past_palette() {
        let holdings: Vec<_> = (0..12)
            .map(|i| krw(&format!("S{i:02}"), Decimal::from(1000 - i)))
            .collect();
        let snap = aggregate("a", &holdings, &CashBalances::default(), Currency::Krw, dec!(1350)).unwrap();

        for (i, line) in snap.lines.iter().enumerate() {
            let expected = if i < PALETTE_SIZE {
                ColorToken::Palette(i as u8)
            } else {
                ColorToken::Overflow
            };
            assert_eq!(line.color, expected, "line {i}");
        }
    }

    #[test]
    fn zero_price_is_unknown() {
        let mut h = krw("A", dec!(100));
        h.price = Decimal::ZERO;
        let snap = aggregate("a", &[h], &CashBalances::default(), Currency::Krw, dec!(1350)).unwrap();
        assert_eq!(snap.lines[0].price, None);
    }

    #[test]
    fn snapshot_json_round_trip() {
        let holdings = [krw("A", dec!(340000)), usd("AAPL", dec!(120.5))];
        let cash = CashBalances::new(Some(dec!(90000)), Some(dec!(10)));
        let snap = aggregate("acct-1", &holdings, &cash, Currency::Krw, dec!(1382.5)).unwrap();

        let json = serde_json::to_string(&snap).unwrap();
        let back: PortfolioSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn total_in_other_currency() {
        let snap = aggregate("a", &[krw("A", dec!(1350000))], &CashBalances::default(), Currency::Krw, dec!(1350)).unwrap();
        let rate = ExchangeRate::new(dec!(1350)).unwrap();
        assert_eq!(snap.total_in(Currency::Usd, rate).unwrap(), Money::new(dec!(1000), Currency::Usd));
        assert_eq!(snap.holdings().count(), 1);
        assert_eq!(snap.cash().count(), 0);
    }
}
