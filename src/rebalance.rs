//! CURRENT→TARGET rebalancing engine.
//!
//! Compares a [`PortfolioSnapshot`] against a target-allocation table and
//! computes, per line, the signed amount to trade and the implied number of
//! shares. Amounts are stored once, in the snapshot's reporting currency;
//! [`RebalancePlan::amount_in`] renders them in either currency.

use std::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::currency::ExchangeRate;
use crate::error::{Error, Result};
use crate::portfolio::{LineKind, PortfolioLine, PortfolioSnapshot};
use crate::types::{Currency, Money};

/// Slack allowed on the sum of target weights before it counts as over 100%.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Target weight (percent) per line identity.
///
/// Weights need not sum to 100; the unallocated residual has no target.
/// Entry order is kept so plans list target-only lines deterministically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetAllocation {
    entries: Vec<(String, f64)>,
    index: FxHashMap<String, usize>,
}

impl TargetAllocation {
    /// Build and validate a target table.
    ///
    /// Rejects empty ids, duplicate ids, weights that are not finite or lie
    /// outside `[0, 100]`, and tables summing to more than 100.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (id, weight) in entries {
            let id: String = id.into();
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(Error::Config("target id must not be empty".into()));
            }
            if !weight.is_finite() || !(0.0..=100.0).contains(&weight) {
                return Err(Error::Config(format!(
                    "target weight for {id} must be within [0, 100], got {weight}"
                )));
            }
            if table.index.contains_key(&id) {
                return Err(Error::Config(format!("duplicate target id: {id}")));
            }
            table.index.insert(id.clone(), table.entries.len());
            table.entries.push((id, weight));
        }

        let sum = table.total_weight();
        if sum > 100.0 + WEIGHT_SUM_TOLERANCE {
            return Err(Error::Config(format!(
                "target weights sum to {sum:.4}% (> 100%)"
            )));
        }
        Ok(table)
    }

    /// Target weight for `id`, if the table names it.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.index.get(id).map(|&i| self.entries[i].1)
    }

    /// Target weight for `id`, zero when absent.
    pub fn weight(&self, id: &str) -> f64 {
        self.get(id).unwrap_or(0.0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Sum of all weights, percent.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-share divisors used when no price is known for a line.
///
/// These are coarse placeholders, not market data: a share count derived from
/// them is flagged [`PriceBasis::Nominal`] and must be read as an estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominalPrices {
    pub krw: Decimal,
    pub usd: Decimal,
}

impl NominalPrices {
    pub fn new(krw: Decimal, usd: Decimal) -> Result<Self> {
        if krw <= Decimal::ZERO || usd <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "nominal share prices must be > 0, got {krw} KRW / {usd} USD"
            )));
        }
        Ok(Self { krw, usd })
    }

    pub fn for_currency(&self, currency: Currency) -> Money {
        match currency {
            Currency::Krw => Money::new(self.krw, Currency::Krw),
            Currency::Usd => Money::new(self.usd, Currency::Usd),
        }
    }
}

impl Default for NominalPrices {
    fn default() -> Self {
        Self {
            krw: dec!(50000),
            usd: dec!(100),
        }
    }
}

/// Caller-supplied live prices plus the nominal fallback divisors.
#[derive(Clone, Debug, Default)]
pub struct PriceBook {
    quotes: FxHashMap<String, Money>,
    nominal: NominalPrices,
}

impl PriceBook {
    pub fn new(nominal: NominalPrices) -> Self {
        Self {
            quotes: FxHashMap::default(),
            nominal,
        }
    }

    /// Record a live per-share price for line `id`. Non-positive prices are ignored.
    pub fn insert(&mut self, id: impl Into<String>, price: Money) {
        if price.amount > Decimal::ZERO {
            self.quotes.insert(id.into(), price);
        }
    }

    pub fn with_quote(mut self, id: impl Into<String>, price: Money) -> Self {
        self.insert(id, price);
        self
    }

    pub fn quote(&self, id: &str) -> Option<Money> {
        self.quotes.get(id).copied()
    }

    pub fn nominal(&self) -> NominalPrices {
        self.nominal
    }
}

/// Where the per-share price behind a share estimate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// Live price supplied by the caller.
    Market,
    /// Per-share price reported by the broker in the balance payload.
    Reported,
    /// Nominal divisor; the share count is an approximation.
    Nominal,
}

/// Implied number of shares to trade (positive = buy, negative = sell).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEstimate {
    pub shares: Decimal,
    pub basis: PriceBasis,
    /// The per-share price used, in its own currency.
    pub price: Money,
}

impl ShareEstimate {
    pub fn is_approximate(&self) -> bool {
        self.basis == PriceBasis::Nominal
    }
}

/// Trade direction of a rebalance line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// One line of a [`RebalancePlan`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceLine {
    /// Line identity (ticker, name, or cash label).
    pub line_ref: String,
    pub name: String,
    pub kind: LineKind,
    /// Currency the instrument trades in.
    pub currency: Currency,
    /// False for a target with no matching snapshot line.
    pub in_snapshot: bool,
    /// Current value in the reporting currency.
    pub current_value: Decimal,
    pub current_ratio: f64,
    pub target_ratio: f64,
    /// Signed amount in the reporting currency: positive buys, negative sells.
    pub rebalance_amount: Decimal,
    /// `None` for cash lines.
    pub required_shares: Option<ShareEstimate>,
}

impl RebalanceLine {
    pub fn action(&self) -> Action {
        if self.rebalance_amount > Decimal::ZERO {
            Action::Buy
        } else if self.rebalance_amount < Decimal::ZERO {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

/// Output of [`plan`]: every snapshot line plus any target-only lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancePlan {
    pub account_id: String,
    pub reporting_currency: Currency,
    pub total_balance: Decimal,
    pub lines: Vec<RebalanceLine>,
    /// Root-mean-square gap between current and target ratios, percentage points.
    pub tracking_error_pct: f64,
}

impl RebalancePlan {
    pub fn line(&self, line_ref: &str) -> Option<&RebalanceLine> {
        self.lines.iter().find(|l| l.line_ref == line_ref)
    }

    /// Sum of all rebalance amounts (≈ 0 when both tables sum to 100).
    pub fn net_amount(&self) -> Decimal {
        self.lines.iter().map(|l| l.rebalance_amount).sum()
    }

    /// A line's rebalance amount rendered in `currency`.
    pub fn amount_in(
        &self,
        line: &RebalanceLine,
        currency: Currency,
        rate: ExchangeRate,
    ) -> Result<Money> {
        let amount = rate.convert(line.rebalance_amount, self.reporting_currency, currency)?;
        Ok(Money::new(amount, currency))
    }

    /// A line's current value rendered in `currency`.
    pub fn value_in(
        &self,
        line: &RebalanceLine,
        currency: Currency,
        rate: ExchangeRate,
    ) -> Result<Money> {
        let amount = rate.convert(line.current_value, self.reporting_currency, currency)?;
        Ok(Money::new(amount, currency))
    }

    /// Lines whose share count rests on a nominal divisor.
    pub fn approximate_lines(&self) -> impl Iterator<Item = &RebalanceLine> {
        self.lines
            .iter()
            .filter(|l| l.required_shares.is_some_and(|s| s.is_approximate()))
    }
}

/// Compute the rebalance plan for `snapshot` against `targets`.
///
/// `total_balance` is in the snapshot's reporting currency and `exchange_rate`
/// is KRW per USD. For every line,
/// `rebalance_amount = total_balance * (target - current) / 100`; a target
/// naming no snapshot line yields a zero-valued line with a full buy.
pub fn plan(
    snapshot: &PortfolioSnapshot,
    targets: &TargetAllocation,
    total_balance: Decimal,
    exchange_rate: Decimal,
    prices: &PriceBook,
) -> Result<RebalancePlan> {
    let rate = ExchangeRate::new(exchange_rate)?;
    let reporting = snapshot.reporting_currency;

    let mut lines: Vec<RebalanceLine> = snapshot
        .lines
        .iter()
        .map(|line| plan_line(line, targets.weight(&line.id), total_balance, reporting, rate, prices))
        .collect::<Result<_>>()?;

    for (id, weight) in targets.iter() {
        if snapshot.line(id).is_none() {
            lines.push(target_only_line(id, weight, total_balance, reporting, rate, prices)?);
        }
    }

    let tracking_error_pct = tracking_error(&lines);
    Ok(RebalancePlan {
        account_id: snapshot.account_id.clone(),
        reporting_currency: reporting,
        total_balance,
        lines,
        tracking_error_pct,
    })
}

fn plan_line(
    line: &PortfolioLine,
    target_ratio: f64,
    total_balance: Decimal,
    reporting: Currency,
    rate: ExchangeRate,
    prices: &PriceBook,
) -> Result<RebalanceLine> {
    let rebalance_amount = rebalance_amount(total_balance, line.ratio, target_ratio);
    let required_shares = match line.kind {
        LineKind::Cash => None,
        LineKind::Holding => {
            let (price, basis) = match (prices.quote(&line.id), line.price) {
                (Some(quote), _) => (quote, PriceBasis::Market),
                (None, Some(reported)) => (Money::new(reported, line.currency), PriceBasis::Reported),
                (None, None) => (prices.nominal().for_currency(line.currency), PriceBasis::Nominal),
            };
            Some(estimate_shares(rebalance_amount, price, basis, reporting, rate)?)
        }
    };

    Ok(RebalanceLine {
        line_ref: line.id.clone(),
        name: line.name.clone(),
        kind: line.kind,
        currency: line.currency,
        in_snapshot: true,
        current_value: line.value,
        current_ratio: line.ratio,
        target_ratio,
        rebalance_amount,
        required_shares,
    })
}

fn target_only_line(
    id: &str,
    target_ratio: f64,
    total_balance: Decimal,
    reporting: Currency,
    rate: ExchangeRate,
    prices: &PriceBook,
) -> Result<RebalanceLine> {
    let rebalance_amount = rebalance_amount(total_balance, 0.0, target_ratio);
    let (price, basis) = match prices.quote(id) {
        Some(quote) => (quote, PriceBasis::Market),
        None => (prices.nominal().for_currency(reporting), PriceBasis::Nominal),
    };

    Ok(RebalanceLine {
        line_ref: id.to_string(),
        name: id.to_string(),
        kind: LineKind::Holding,
        currency: price.currency,
        in_snapshot: false,
        current_value: Decimal::ZERO,
        current_ratio: 0.0,
        target_ratio,
        rebalance_amount,
        required_shares: Some(estimate_shares(rebalance_amount, price, basis, reporting, rate)?),
    })
}

/// `total_balance * (target - current) / 100`, zero for a zero balance.
fn rebalance_amount(total_balance: Decimal, current_ratio: f64, target_ratio: f64) -> Decimal {
    if total_balance.is_zero() {
        return Decimal::ZERO;
    }
    let current = pct(current_ratio).round_dp(1);
    let target = pct(target_ratio).round_dp(10);
    total_balance * (target - current) / Decimal::ONE_HUNDRED
}

fn estimate_shares(
    amount: Decimal,
    price: Money,
    basis: PriceBasis,
    reporting: Currency,
    rate: ExchangeRate,
) -> Result<ShareEstimate> {
    let unit = rate.convert(price.amount, price.currency, reporting)?;
    let shares = if unit.is_zero() { Decimal::ZERO } else { amount / unit };
    Ok(ShareEstimate { shares, basis, price })
}

fn pct(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

fn tracking_error(lines: &[RebalanceLine]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = lines
        .iter()
        .map(|l| (l.current_ratio - l.target_ratio).powi(2))
        .sum();
    (sum_sq / lines.len() as f64).sqrt()
}
