//! Run orchestrator: payload → normalize → aggregate → plan → report.
//!
//! This is the main workflow that ties together all components.

use std::path::Path;

use holdbook::{
    AccountBalance, BrokerFormat, Currency, PortfolioSnapshot, PriceBook, RebalancePlan,
    aggregate, normalize_account, plan,
};
use log::{info, warn};
use serde_json::Value;

use crate::audit::{self, AuditLog};
use crate::config::{Config, FormatSetting};
use crate::error::Result;
use crate::report::{PlanReport, SnapshotReport};
use crate::target::{PriceSheet, TargetSpec, read_input};

/// Options for a run, overriding the config where set.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub format: Option<FormatSetting>,
    pub currency: Option<Currency>,
    /// Print JSON instead of a table.
    pub json: bool,
}

/// Everything computed for one payload, before planning.
#[derive(Debug, Clone)]
pub struct Valuation {
    pub account: AccountBalance,
    pub snapshot: PortfolioSnapshot,
}

/// Read a raw broker payload file.
pub fn load_payload(path: &Path) -> Result<Value> {
    let contents = read_input("payload", path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Detect the broker format of a payload file.
pub fn detect(path: &Path) -> Result<BrokerFormat> {
    let payload = load_payload(path)?;
    Ok(BrokerFormat::detect(&payload)?)
}

/// Normalize and aggregate `payload` under `config`.
pub fn value_payload(config: &Config, payload: &Value, opts: &RunOptions) -> Result<Valuation> {
    let format = opts.format.unwrap_or(config.account.format).resolve(payload)?;
    let account = normalize_account(payload, format)?;
    if account.skipped_lines > 0 {
        warn!(
            "{} of {} holdings lines could not be read and were skipped",
            account.skipped_lines,
            account.skipped_lines + account.holdings.len()
        );
    }
    if let Some(id) = account.account_id.as_deref().filter(|id| *id != config.account.id) {
        warn!("payload account {id} differs from configured account {}", config.account.id);
    }

    let rate = config.exchange_rate()?;
    let currency = opts.currency.unwrap_or(config.report.currency);
    let snapshot = aggregate(
        &config.account.id,
        &account.holdings,
        &account.cash,
        currency,
        rate.krw_per_usd(),
    )?;
    info!(
        "{format} payload: {} holdings, total {}",
        account.holdings.len(),
        snapshot.total_in(currency, rate)?
    );

    Ok(Valuation { account, snapshot })
}

/// Compute the rebalance plan for a valued payload.
///
/// The balance is the account total as the broker reports it, falling back to
/// deposits plus holdings, expressed in the snapshot's reporting currency.
pub fn plan_valuation(
    config: &Config,
    valuation: &Valuation,
    target: &TargetSpec,
    prices: &PriceBook,
) -> Result<RebalancePlan> {
    let rate = config.exchange_rate()?;
    let reporting = valuation.snapshot.reporting_currency;
    let total_balance = rate.convert(valuation.account.total_value(rate)?, Currency::Krw, reporting)?;
    if total_balance != valuation.snapshot.total_value {
        info!(
            "planning against reported balance {} (composition total {})",
            holdbook::Money::new(total_balance, reporting),
            holdbook::Money::new(valuation.snapshot.total_value, reporting),
        );
    }

    Ok(plan(
        &valuation.snapshot,
        &target.allocation()?,
        total_balance,
        rate.krw_per_usd(),
        prices,
    )?)
}

/// `snapshot` command: print the account composition.
pub fn run_snapshot(config: &Config, payload_path: &Path, opts: &RunOptions) -> Result<()> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "snapshot", &payload_path.display().to_string(), &config.account.id)?;

    let payload = load_payload(payload_path)?;
    let valuation = value_payload(config, &payload, opts)?;
    audit::log_payload_normalized(&mut audit, &valuation.account)?;
    audit::log_snapshot_built(&mut audit, &valuation.snapshot)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&valuation.snapshot)?);
    } else {
        print!("{}", SnapshotReport::new(&valuation.snapshot, config.exchange_rate()?));
    }

    audit::log_run_completed(&mut audit, valuation.snapshot.lines.len(), 0)?;
    Ok(())
}

/// `plan` command: print the rebalance plan against a target file.
pub fn run_plan(
    config: &Config,
    target_path: &Path,
    payload_path: &Path,
    prices_path: Option<&Path>,
    opts: &RunOptions,
) -> Result<()> {
    let target = TargetSpec::load(target_path)?;
    let prices = match prices_path {
        Some(path) => PriceSheet::load(path)?.price_book(config.nominal_prices()?)?,
        None => PriceBook::new(config.nominal_prices()?),
    };

    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "plan", &payload_path.display().to_string(), &config.account.id)?;

    let payload = load_payload(payload_path)?;
    let valuation = value_payload(config, &payload, opts)?;
    audit::log_payload_normalized(&mut audit, &valuation.account)?;
    audit::log_snapshot_built(&mut audit, &valuation.snapshot)?;

    let plan = plan_valuation(config, &valuation, &target, &prices)?;
    audit::log_plan_computed(&mut audit, &plan)?;

    let approximate = plan.approximate_lines().count();
    if approximate > 0 {
        warn!("{approximate} share counts use nominal prices and are estimates only");
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", PlanReport::new(&plan, config.exchange_rate()?));
    }

    audit::log_run_completed(&mut audit, plan.lines.len(), approximate)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn config() -> Config {
        Config::from_toml("[account]\nid = \"acct\"\n[fx]\nkrw_per_usd = 1400\n").unwrap()
    }

    fn payload() -> Value {
        json!({
            "rsTotAmt": "0",
            "resDepositReceivedD2": "300000",
            "resUsdBalance": "100",
            "resItemList": [
                { "resItemName": "삼성전자", "resItemCode": "005930", "resQuantity": "10",
                  "resPresentAmt": "70000", "resValuationAmt": "700000" },
                { "resItemName": "Apple", "resItemCode": "AAPL", "resQuantity": "2",
                  "resPresentAmt": "150", "resValuationAmt": "300", "resAccountCurrency": "USD" }
            ]
        })
    }

    #[test]
    fn value_payload_detects_and_aggregates() {
        let valuation = value_payload(&config(), &payload(), &RunOptions::default()).unwrap();
        assert_eq!(valuation.account.format, BrokerFormat::ItemList);
        // 700,000 + 300 USD + 300,000 + 100 USD = 1,560,000 KRW
        assert_eq!(valuation.snapshot.total_value, dec!(1560000));
        assert_eq!(valuation.snapshot.lines.len(), 4);
    }

    #[test]
    fn currency_override() {
        let opts = RunOptions {
            currency: Some(Currency::Usd),
            ..RunOptions::default()
        };
        let valuation = value_payload(&config(), &payload(), &opts).unwrap();
        assert_eq!(valuation.snapshot.reporting_currency, Currency::Usd);
        assert_eq!(valuation.snapshot.line("AAPL").unwrap().value, dec!(300));
    }

    #[test]
    fn forced_format_mismatch_is_rejected() {
        let opts = RunOptions {
            format: Some(FormatSetting::AccountStock),
            ..RunOptions::default()
        };
        let err = value_payload(&config(), &payload(), &opts).unwrap_err();
        assert!(matches!(err, Error::Core(holdbook::Error::UnknownFormat(_))));
    }

    #[test]
    fn plan_uses_computed_total_when_reported_is_zero() {
        let config = config();
        let valuation = value_payload(&config, &payload(), &RunOptions::default()).unwrap();
        let target = TargetSpec::from_json(r#"{"targets":[{"id":"005930","weight":50},{"id":"AAPL","weight":50}]}"#).unwrap();
        let plan = plan_valuation(&config, &valuation, &target, &PriceBook::default()).unwrap();

        assert_eq!(plan.total_balance, dec!(1560000));
        let aapl = plan.line("AAPL").unwrap();
        // 420,000 / 1,560,000 = 26.9%; 1,560,000 * (50 - 26.9) / 100
        assert_eq!(aapl.rebalance_amount, dec!(360360));
        assert_eq!(aapl.required_shares.unwrap().basis, holdbook::PriceBasis::Reported);
    }

    #[test]
    fn plan_prefers_reported_total() {
        let config = config();
        let mut raw = payload();
        raw["rsTotAmt"] = json!("2000000");
        let valuation = value_payload(&config, &raw, &RunOptions::default()).unwrap();
        let target = TargetSpec::from_json(r#"{"targets":[]}"#).unwrap();
        let plan = plan_valuation(&config, &valuation, &target, &PriceBook::default()).unwrap();
        assert_eq!(plan.total_balance, dec!(2000000));
    }
}
