//! End-to-end pipeline scenarios: normalize, aggregate, rebalance.

use holdbook::holding::KRW_CASH_LABEL;
use holdbook::{
    BrokerFormat, CashBalances, ColorToken, Currency, HoldingRecord, PriceBook, TargetAllocation,
    aggregate, normalize, normalize_account, plan,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

const RATE: Decimal = dec!(1380);

fn krw(name: &str, value: Decimal) -> HoldingRecord {
    HoldingRecord {
        name: name.into(),
        ticker_or_id: None,
        quantity: dec!(10),
        price: value / dec!(10),
        valuation: value,
        currency: Currency::Krw,
        is_foreign: false,
        available_quantity: dec!(10),
    }
}

fn two_holdings() -> Vec<HoldingRecord> {
    vec![krw("A", dec!(340000)), krw("B", dec!(160000))]
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn holdings_only_ratios_and_colors() {
    let snap = aggregate("acct", &two_holdings(), &CashBalances::default(), Currency::Krw, RATE).unwrap();

    let ratios: Vec<f64> = snap.lines.iter().map(|l| l.ratio).collect();
    assert_eq!(ratios, [68.0, 32.0]);
    let colors: Vec<ColorToken> = snap.lines.iter().map(|l| l.color).collect();
    assert_eq!(colors, [ColorToken::Palette(0), ColorToken::Palette(1)]);
    assert_eq!(snap.total_value, dec!(500000));
}

#[test]
fn krw_cash_joins_the_composition() {
    let cash = CashBalances::new(Some(dec!(90000)), None);
    let snap = aggregate("acct", &two_holdings(), &cash, Currency::Krw, RATE).unwrap();

    assert_eq!(snap.total_value, dec!(590000));
    assert_eq!(snap.line("A").unwrap().ratio, 57.6);
    assert_eq!(snap.line("B").unwrap().ratio, 27.1);
    let cash_line = snap.line(KRW_CASH_LABEL).unwrap();
    assert_eq!(cash_line.ratio, 15.3);
    assert_eq!(cash_line.color, ColorToken::CashKrw);
    assert!((snap.ratio_sum() - 100.0).abs() <= 0.1 * snap.lines.len() as f64);
}

#[test]
fn zero_total_gives_zero_ratios() {
    let holdings = vec![krw("A", Decimal::ZERO), krw("B", Decimal::ZERO)];
    let snap = aggregate("acct", &holdings, &CashBalances::default(), Currency::Krw, RATE).unwrap();

    assert_eq!(snap.total_value, Decimal::ZERO);
    assert!(snap.lines.iter().all(|l| l.ratio == 0.0));
}

// ============================================================================
// Rebalancing
// ============================================================================

#[test]
fn rebalance_equal_weights() {
    // A at 68%, B at 32% of a 590,000 KRW account
    let holdings = vec![krw("A", dec!(401200)), krw("B", dec!(188800))];
    let snap = aggregate("acct", &holdings, &CashBalances::default(), Currency::Krw, RATE).unwrap();
    assert_eq!(snap.line("A").unwrap().ratio, 68.0);
    assert_eq!(snap.line("B").unwrap().ratio, 32.0);

    let targets = TargetAllocation::new([("A", 50.0), ("B", 50.0)]).unwrap();
    let plan = plan(&snap, &targets, dec!(590000), RATE, &PriceBook::default()).unwrap();

    assert_eq!(plan.line("A").unwrap().rebalance_amount, dec!(-106200));
    assert_eq!(plan.line("B").unwrap().rebalance_amount, dec!(106200));
    assert_eq!(plan.net_amount(), Decimal::ZERO);
}

#[test]
fn plan_against_usd_snapshot() {
    let mut aapl = krw("Apple", dec!(1000));
    aapl.ticker_or_id = Some("AAPL".into());
    aapl.currency = Currency::Usd;
    aapl.is_foreign = true;
    let holdings = vec![aapl, krw("A", dec!(1380000))];
    let snap = aggregate("acct", &holdings, &CashBalances::default(), Currency::Usd, RATE).unwrap();
    assert_eq!(snap.total_value, dec!(2000));

    let targets = TargetAllocation::new([("AAPL", 25.0), ("A", 75.0)]).unwrap();
    let plan = plan(&snap, &targets, snap.total_value, RATE, &PriceBook::default()).unwrap();

    let aapl = plan.line("AAPL").unwrap();
    assert_eq!(aapl.rebalance_amount, dec!(-500));
    // reported price is 100 USD per share
    assert_eq!(aapl.required_shares.unwrap().shares, dec!(-5));
    let a = plan.line("A").unwrap();
    assert_eq!(a.rebalance_amount, dec!(500));
    // 138,000 KRW per share = 100 USD per share
    assert_eq!(a.required_shares.unwrap().shares, dec!(5));
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn formats_normalize_to_the_same_record() {
    let item_list = json!({
        "resItemList": [{
            "resItemName": "카카오",
            "resQuantity": "3",
            "resPresentAmt": "41000",
            "resValuationAmt": "123000"
        }]
    });
    let account_stock = json!({
        "resAccountStock": [{
            "stock_name": "카카오",
            "stock_qty": "3",
            "current_price": 41000,
            "valuation_amount": "123,000"
        }]
    });

    let a = normalize(&item_list, BrokerFormat::ItemList).unwrap();
    let b = normalize(&account_stock, BrokerFormat::AccountStock).unwrap();
    assert_eq!(a, b);
    assert_eq!(a[0].currency, Currency::Krw);
    assert_eq!(a[0].available_quantity, dec!(3));
}

#[test]
fn payload_to_plan() {
    let payload = json!({
        "result": { "code": "CF-00000" },
        "data": {
            "resAccount": "20112345678",
            "resDepositReceivedD2": "90000",
            "resAccountStock": [
                { "name": "A", "code": "A001", "price": "34000", "quantity": "10", "amount": "340000" },
                { "name": "B", "code": "B001", "price": "16000", "quantity": "10", "amount": "160000" }
            ]
        }
    });

    let account = normalize_account(&payload, BrokerFormat::detect(&payload).unwrap()).unwrap();
    assert_eq!(account.account_id.as_deref(), Some("20112345678"));

    let rate = holdbook::ExchangeRate::new(RATE).unwrap();
    let total = account.total_value(rate).unwrap();
    assert_eq!(total, dec!(590000));

    let snap = aggregate("20112345678", &account.holdings, &account.cash, Currency::Krw, RATE).unwrap();
    let targets = TargetAllocation::new([("A001", 60.0), ("B001", 40.0)]).unwrap();
    let plan = plan(&snap, &targets, total, RATE, &PriceBook::default()).unwrap();

    // A 57.6% -> 60%: buy 14,160 KRW
    let a = plan.line("A001").unwrap();
    assert_eq!(a.rebalance_amount, dec!(14160));
    // cash has no target and is fully allocated away
    let cash = plan.line(KRW_CASH_LABEL).unwrap();
    assert_eq!(cash.rebalance_amount, dec!(-90270));
    assert!(cash.required_shares.is_none());
}
