//! Broker response normalization: raw JSON payloads into [`HoldingRecord`]s.
//!
//! One generic routine reads every format through its [`FormatSchema`]:
//!
//! ```
//! use holdbook::normalize::{normalize, BrokerFormat};
//! use serde_json::json;
//!
//! let payload = json!({
//!     "resAccountStock": [
//!         { "stock_name": "카카오", "price": "41000", "stock_qty": "3", "amount": "123000" }
//!     ]
//! });
//! let holdings = normalize(&payload, BrokerFormat::AccountStock).unwrap();
//! assert_eq!(holdings[0].name, "카카오");
//! ```
//!
//! A line that cannot be read is logged and skipped; the rest of the batch
//! still normalizes. A payload that does not fit its format fails as a whole.

pub mod schema;

use std::str::FromStr;

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::currency::ExchangeRate;
use crate::error::{Error, Result};
use crate::holding::{CashBalances, HoldingRecord};
use crate::types::Currency;

pub use schema::{ACCOUNT_FIELDS, BrokerFormat, FOREIGN_NATIONS, FormatSchema, UsdSignal};

use schema::{lookup, payload_body};

/// Display name given to a line that carries no name field.
pub const UNKNOWN_NAME: &str = "알 수 없음";

/// Normalize every holdings line of `payload`, in input order.
///
/// Lines failing to parse are skipped with a warning.
pub fn normalize(payload: &Value, format: BrokerFormat) -> Result<Vec<HoldingRecord>> {
    let body = payload_body(payload)?;
    let (holdings, _skipped) = normalize_lines(body, format.schema())?;
    Ok(holdings)
}

/// Normalize a payload whose format is detected from its holdings key.
pub fn normalize_detected(payload: &Value) -> Result<(BrokerFormat, Vec<HoldingRecord>)> {
    let format = BrokerFormat::detect(payload)?;
    debug!("detected broker format {format}");
    Ok((format, normalize(payload, format)?))
}

/// Read one raw holdings line with `schema`.
pub fn normalize_line(line: &Value, schema: &FormatSchema) -> Result<HoldingRecord> {
    let obj = line.as_object().ok_or_else(|| Error::Parse {
        field: "line",
        value: line.to_string(),
        reason: "holdings line is not a JSON object".into(),
    })?;

    let name = lookup(obj, schema.name).unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let ticker_or_id = lookup(obj, schema.ticker);
    let quantity = decimal_field(obj, schema.quantity, "quantity")?;
    let price = decimal_field(obj, schema.price, "price")?;
    let valuation = decimal_field(obj, schema.valuation, "valuation")?;
    let available_quantity = match lookup(obj, schema.available_quantity) {
        Some(raw) => parse_decimal("available_quantity", &raw)?,
        None => quantity,
    };

    let explicit_usd = lookup(obj, schema.currency)
        .is_some_and(|c| c.eq_ignore_ascii_case(Currency::Usd.code()));
    let is_foreign = explicit_usd
        || matches_any(lookup(obj, schema.nation), FOREIGN_NATIONS)
        || matches_any(lookup(obj, schema.market), schema.foreign_markets);
    let usd = match schema.usd_signal {
        UsdSignal::CurrencyField => explicit_usd,
        UsdSignal::CurrencyOrForeign => explicit_usd || is_foreign,
    };

    Ok(HoldingRecord {
        name,
        ticker_or_id,
        quantity,
        price,
        valuation,
        currency: if usd { Currency::Usd } else { Currency::Krw },
        is_foreign,
        available_quantity,
    })
}

/// Account-level view of one broker payload: identity, cash and holdings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub format: BrokerFormat,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    /// Total valuation in KRW as reported by the broker, if any.
    pub reported_total: Option<Decimal>,
    pub cash: CashBalances,
    pub holdings: Vec<HoldingRecord>,
    /// Number of holdings lines dropped because they failed to parse.
    pub skipped_lines: usize,
}

impl AccountBalance {
    /// Account total in KRW.
    ///
    /// The broker-reported total when it is positive; otherwise deposits plus
    /// holdings valuation, each converted to KRW.
    pub fn total_value(&self, rate: ExchangeRate) -> Result<Decimal> {
        if let Some(total) = self.reported_total.filter(|t| *t > Decimal::ZERO) {
            return Ok(total);
        }
        let deposits = self.cash.krw.unwrap_or_default()
            + rate.to_krw(self.cash.usd.unwrap_or_default(), Currency::Usd)?;
        let holdings = self
            .holdings
            .iter()
            .map(|h| h.valuation_in(Currency::Krw, rate))
            .sum::<Result<Decimal>>()?;
        debug!("no reported total, computed {deposits} deposits + {holdings} holdings");
        Ok(deposits + holdings)
    }
}

/// Normalize a full account payload: holdings plus account-level fields.
///
/// Unlike holdings lines, a malformed account-level amount fails the payload.
pub fn normalize_account(payload: &Value, format: BrokerFormat) -> Result<AccountBalance> {
    let body = payload_body(payload)?;
    let (holdings, skipped_lines) = normalize_lines(body, format.schema())?;
    let fields = &ACCOUNT_FIELDS;

    Ok(AccountBalance {
        format,
        account_id: lookup(body, fields.account_id),
        account_name: lookup(body, fields.account_name),
        reported_total: optional_decimal(body, fields.reported_total, "reported_total")?,
        cash: CashBalances::new(
            optional_decimal(body, fields.krw_deposit, "krw_deposit")?,
            optional_decimal(body, fields.usd_deposit, "usd_deposit")?,
        ),
        holdings,
        skipped_lines,
    })
}

fn normalize_lines(
    body: &Map<String, Value>,
    schema: &FormatSchema,
) -> Result<(Vec<HoldingRecord>, usize)> {
    let lines = match body.get(schema.list_key) {
        None | Some(Value::Null) => {
            if let Some(other) = BrokerFormat::ALL
                .into_iter()
                .find(|f| *f != schema.format && body.contains_key(f.schema().list_key))
            {
                return Err(Error::UnknownFormat(format!(
                    "{} payload carries {} holdings under {}",
                    schema.format,
                    other,
                    other.schema().list_key
                )));
            }
            debug!("{} payload has no {}, no holdings", schema.format, schema.list_key);
            return Ok((Vec::new(), 0));
        }
        Some(Value::Array(lines)) => lines,
        Some(_) => {
            return Err(Error::UnknownFormat(format!(
                "{} is not an array in a {} payload",
                schema.list_key, schema.format
            )));
        }
    };

    let mut holdings = Vec::with_capacity(lines.len());
    let mut skipped = 0;
    for (index, line) in lines.iter().enumerate() {
        match normalize_line(line, schema) {
            Ok(record) => holdings.push(record),
            Err(e) => {
                warn!("skipping {} line {index}: {e}", schema.format);
                skipped += 1;
            }
        }
    }
    Ok((holdings, skipped))
}

/// A numeric field that defaults to zero when missing or empty.
fn decimal_field(
    obj: &Map<String, Value>,
    aliases: &[&str],
    field: &'static str,
) -> Result<Decimal> {
    Ok(optional_decimal(obj, aliases, field)?.unwrap_or_default())
}

fn optional_decimal(
    obj: &Map<String, Value>,
    aliases: &[&str],
    field: &'static str,
) -> Result<Option<Decimal>> {
    lookup(obj, aliases)
        .map(|raw| parse_decimal(field, &raw))
        .transpose()
}

/// Parse a broker numeric string. Thousands separators are accepted.
fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|e| Error::Parse {
            field,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn matches_any(value: Option<String>, allowed: &[&str]) -> bool {
    value.is_some_and(|v| allowed.iter().any(|a| v.eq_ignore_ascii_case(a)))
}
