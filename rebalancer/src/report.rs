//! Plain-text tables for snapshots and rebalance plans.

use std::fmt;

use holdbook::{Currency, ExchangeRate, Money, PortfolioSnapshot, RebalancePlan};

/// Composition table of a [`PortfolioSnapshot`].
pub struct SnapshotReport<'a> {
    snapshot: &'a PortfolioSnapshot,
    rate: ExchangeRate,
}

impl<'a> SnapshotReport<'a> {
    pub fn new(snapshot: &'a PortfolioSnapshot, rate: ExchangeRate) -> Self {
        Self { snapshot, rate }
    }
}

impl fmt::Display for SnapshotReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snapshot;
        writeln!(
            f,
            "COMPOSITION {} ({}, 1 USD = {} KRW):",
            snap.account_id,
            snap.reporting_currency,
            self.rate.krw_per_usd()
        )?;
        writeln!(
            f,
            "  {:24} {:>8} {:>18} {:>18} {:>10}",
            "Line", "Ratio", "Value", "Native", "Color"
        )?;
        for line in &snap.lines {
            let native = if line.currency == snap.reporting_currency {
                String::new()
            } else {
                line.native_money().to_string()
            };
            writeln!(
                f,
                "  {:24} {:>7.1}% {:>18} {:>18} {:>10}",
                truncate(&line.name, 24),
                line.ratio,
                Money::new(line.value, snap.reporting_currency).to_string(),
                native,
                line.color.to_string(),
            )?;
        }
        let other = match snap.reporting_currency {
            Currency::Krw => Currency::Usd,
            Currency::Usd => Currency::Krw,
        };
        let converted = snap
            .total_in(other, self.rate)
            .map_or_else(|_| "-".to_string(), |m| m.to_string());
        writeln!(
            f,
            "\n  Total: {} ({converted})",
            Money::new(snap.total_value, snap.reporting_currency),
        )?;
        Ok(())
    }
}

/// Rebalance table of a [`RebalancePlan`].
pub struct PlanReport<'a> {
    plan: &'a RebalancePlan,
    rate: ExchangeRate,
}

impl<'a> PlanReport<'a> {
    pub fn new(plan: &'a RebalancePlan, rate: ExchangeRate) -> Self {
        Self { plan, rate }
    }
}

impl fmt::Display for PlanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        writeln!(
            f,
            "REBALANCE {} (balance {}):",
            plan.account_id,
            Money::new(plan.total_balance, plan.reporting_currency)
        )?;
        writeln!(
            f,
            "  {:24} {:>8} {:>8} {:>5} {:>18} {:>14}",
            "Line", "Current%", "Target%", "", "Amount", "Shares"
        )?;
        for line in &plan.lines {
            // amounts shown in the currency the line trades in
            let amount = plan
                .amount_in(line, line.currency, self.rate)
                .map_or_else(|_| "-".to_string(), |m| m.to_string());
            let shares = match line.required_shares {
                None => "-".to_string(),
                Some(est) => {
                    let marker = if est.is_approximate() { " ~" } else { "" };
                    format!("{:+.2}{marker}", est.shares)
                }
            };
            writeln!(
                f,
                "  {:24} {:>7.1}% {:>7.1}% {:>5} {:>18} {:>14}",
                truncate(&line.name, 24),
                line.current_ratio,
                line.target_ratio,
                line.action().to_string(),
                amount,
                shares,
            )?;
        }
        writeln!(f, "\n  Net: {}", Money::new(plan.net_amount(), plan.reporting_currency))?;
        writeln!(f, "  Tracking error: {:.3}%", plan.tracking_error_pct)?;
        if plan.approximate_lines().next().is_some() {
            writeln!(f, "  ~ share count from a nominal price, estimate only")?;
        }
        Ok(())
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdbook::{CashBalances, HoldingRecord, PriceBook, TargetAllocation, aggregate, plan};
    use rust_decimal_macros::dec;

    fn snapshot() -> PortfolioSnapshot {
        let holdings = [
            HoldingRecord {
                name: "삼성전자".into(),
                ticker_or_id: Some("005930".into()),
                quantity: dec!(10),
                price: dec!(70000),
                valuation: dec!(700000),
                currency: Currency::Krw,
                is_foreign: false,
                available_quantity: dec!(10),
            },
            HoldingRecord {
                name: "Apple".into(),
                ticker_or_id: Some("AAPL".into()),
                quantity: dec!(2),
                price: dec!(0),
                valuation: dec!(250),
                currency: Currency::Usd,
                is_foreign: true,
                available_quantity: dec!(2),
            },
        ];
        let cash = CashBalances::new(Some(dec!(100000)), None);
        aggregate("acct", &holdings, &cash, Currency::Krw, dec!(1200)).unwrap()
    }

    #[test]
    fn snapshot_table() {
        let rate = ExchangeRate::new(dec!(1200)).unwrap();
        let s = SnapshotReport::new(&snapshot(), rate).to_string();
        assert!(s.contains("COMPOSITION acct"));
        assert!(s.contains("삼성전자"));
        assert!(s.contains("$250.00"));
        assert!(s.contains("cash-krw"));
        assert!(s.contains("Total: 1,100,000원 ($916.67)"));
    }

    #[test]
    fn plan_table() {
        let snap = snapshot();
        let targets = TargetAllocation::new([("005930", 50.0), ("AAPL", 50.0)]).unwrap();
        let plan = plan(&snap, &targets, snap.total_value, dec!(1200), &PriceBook::default()).unwrap();
        let rate = ExchangeRate::new(dec!(1200)).unwrap();
        let s = PlanReport::new(&plan, rate).to_string();
        assert!(s.contains("REBALANCE acct"));
        assert!(s.contains("SELL"));
        assert!(s.contains("BUY"));
        assert!(s.contains("Tracking error"));
        // Apple has no reported price
        assert!(s.contains(" ~"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd…");
    }
}
