//! # holdbook
//!
//! A deterministic pipeline that turns raw brokerage balance payloads into a
//! valued portfolio composition and a rebalancing plan.
//!
//! ## Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | **Normalize** | [`normalize`], [`normalize_account`] | [`HoldingRecord`]s, [`CashBalances`] |
//! | **Convert** | [`ExchangeRate`], [`to_krw`], [`to_usd`] | amounts in one currency |
//! | **Aggregate** | [`aggregate`] | [`PortfolioSnapshot`] with ratios and colors |
//! | **Rebalance** | [`plan`] | [`RebalancePlan`] with signed amounts and share counts |
//!
//! Every stage is a pure function of its inputs: no I/O, no clock, no shared
//! state. The same payload, rate and targets always produce the same plan.
//!
//! ## Quick Start
//!
//! ```
//! use holdbook::{aggregate, normalize_account, plan, BrokerFormat, Currency, PriceBook, TargetAllocation};
//! use rust_decimal_macros::dec;
//! use serde_json::json;
//!
//! let payload = json!({
//!     "resDepositReceivedD2": "90000",
//!     "resItemList": [
//!         { "resItemName": "A", "resQuantity": "10", "resPresentAmt": "40000", "resValuationAmt": "400000" },
//!         { "resItemName": "B", "resQuantity": "5",  "resPresentAmt": "20000", "resValuationAmt": "100000" }
//!     ]
//! });
//!
//! let account = normalize_account(&payload, BrokerFormat::ItemList).unwrap();
//! let snapshot = aggregate("acct", &account.holdings, &account.cash, Currency::Krw, dec!(1380)).unwrap();
//! assert_eq!(snapshot.total_value, dec!(590000));
//! assert_eq!(snapshot.lines[0].ratio, 67.8);
//!
//! let targets = TargetAllocation::new([("A", 50.0), ("B", 35.0)]).unwrap();
//! let plan = plan(&snapshot, &targets, snapshot.total_value, dec!(1380), &PriceBook::default()).unwrap();
//! assert_eq!(plan.line("A").unwrap().rebalance_amount, dec!(-105020));
//! ```
//!
//! ## Money
//!
//! Amounts are [`rust_decimal::Decimal`]; ratios are `f64` percentages with
//! one decimal place. [`Money`] renders amounts the way account screens do:
//!
//! ```
//! use holdbook::{Currency, Money};
//! use rust_decimal_macros::dec;
//!
//! assert_eq!(Money::new(dec!(1234567), Currency::Krw).to_string(), "1,234,567원");
//! assert_eq!(Money::new(dec!(1234.5), Currency::Usd).to_string(), "$1,234.50");
//! ```

pub mod currency;
mod error;
pub mod holding;
pub mod normalize;
pub mod portfolio;
pub mod rebalance;
mod types;

// Re-export public API
pub use currency::{ExchangeRate, to_krw, to_usd};
pub use error::{Error, Result};
pub use holding::{CashBalances, CashPosition, HoldingRecord};
pub use normalize::{AccountBalance, BrokerFormat, normalize, normalize_account, normalize_detected};
pub use portfolio::{ColorToken, LineKind, PortfolioLine, PortfolioSnapshot, aggregate};
pub use rebalance::{
    Action, NominalPrices, PriceBasis, PriceBook, RebalanceLine, RebalancePlan, ShareEstimate,
    TargetAllocation, plan,
};
pub use types::{Currency, Money};
