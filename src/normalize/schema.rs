//! Declarative field-alias tables, one per broker response format.
//!
//! Each logical field lists the raw keys it may arrive under, in priority
//! order; the first key holding a non-empty value wins. Supporting a new
//! brokerage format means adding a table here, not a new code path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Discriminator selecting which alias table a raw payload is read with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerFormat {
    /// Holdings nested under `resItemList` (`resItemName`, `resPresentAmt`, ...).
    ItemList,
    /// Holdings nested under `resAccountStock` with loosely named fields
    /// (`name` / `stockName` / `stock_name`, `qty` / `stock_qty`, ...).
    AccountStock,
}

impl BrokerFormat {
    pub const ALL: [BrokerFormat; 2] = [BrokerFormat::ItemList, BrokerFormat::AccountStock];

    /// Stable string tag, as accepted by [`FromStr`].
    pub fn tag(self) -> &'static str {
        match self {
            BrokerFormat::ItemList => "item_list",
            BrokerFormat::AccountStock => "account_stock",
        }
    }

    /// The alias table for this format.
    pub fn schema(self) -> &'static FormatSchema {
        match self {
            BrokerFormat::ItemList => &ITEM_LIST,
            BrokerFormat::AccountStock => &ACCOUNT_STOCK,
        }
    }

    /// Pick the format whose holdings key is present in `payload`.
    ///
    /// The item-list key takes precedence when both appear.
    pub fn detect(payload: &Value) -> Result<Self> {
        let body = payload_body(payload)?;
        Self::ALL
            .into_iter()
            .find(|format| body.contains_key(format.schema().list_key))
            .ok_or_else(|| {
                Error::UnknownFormat(format!(
                    "payload has none of the holdings keys {:?}",
                    Self::ALL.map(|f| f.schema().list_key)
                ))
            })
    }
}

impl fmt::Display for BrokerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BrokerFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|format| format.tag() == tag)
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

/// Where a line's USD denomination is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsdSignal {
    /// Only an explicit `USD` currency field makes the line USD.
    CurrencyField,
    /// An explicit `USD` currency field, or the line classifying as foreign.
    CurrencyOrForeign,
}

/// Field-alias table for one broker format.
#[derive(Debug)]
pub struct FormatSchema {
    pub format: BrokerFormat,
    /// Key of the holdings array inside the payload body.
    pub list_key: &'static str,
    pub name: &'static [&'static str],
    pub ticker: &'static [&'static str],
    pub quantity: &'static [&'static str],
    pub price: &'static [&'static str],
    pub valuation: &'static [&'static str],
    /// Falls back to the resolved quantity when no alias is present.
    pub available_quantity: &'static [&'static str],
    pub currency: &'static [&'static str],
    pub nation: &'static [&'static str],
    pub market: &'static [&'static str],
    /// Market codes that classify a line as foreign.
    pub foreign_markets: &'static [&'static str],
    pub usd_signal: UsdSignal,
}

/// Nation codes that classify a line as foreign, shared by all formats.
pub const FOREIGN_NATIONS: &[&str] = &["US", "USA"];

pub static ITEM_LIST: FormatSchema = FormatSchema {
    format: BrokerFormat::ItemList,
    list_key: "resItemList",
    name: &["resItemName"],
    ticker: &["resItemCode"],
    quantity: &["resQuantity"],
    price: &["resPresentAmt"],
    valuation: &["resValuationAmt"],
    available_quantity: &[],
    currency: &["resAccountCurrency"],
    nation: &["resNation"],
    market: &["resMarket"],
    foreign_markets: &["NASDAQ", "NYSE", "AMEX"],
    usd_signal: UsdSignal::CurrencyField,
};

pub static ACCOUNT_STOCK: FormatSchema = FormatSchema {
    format: BrokerFormat::AccountStock,
    list_key: "resAccountStock",
    name: &["name", "stockName", "stock_name"],
    ticker: &["code", "stockCode", "stock_code", "ticker"],
    quantity: &["quantity", "qty", "stock_qty"],
    price: &["price", "current_price"],
    valuation: &["amount", "valuation_amount"],
    available_quantity: &["availableQuantity", "available_qty"],
    currency: &["currency"],
    nation: &["nation"],
    market: &["marketCode"],
    foreign_markets: &["NYSE", "NASDAQ"],
    usd_signal: UsdSignal::CurrencyOrForeign,
};

/// Account-level aliases, shared by every format.
pub struct AccountFields {
    pub account_id: &'static [&'static str],
    pub account_name: &'static [&'static str],
    pub reported_total: &'static [&'static str],
    pub krw_deposit: &'static [&'static str],
    pub usd_deposit: &'static [&'static str],
}

pub static ACCOUNT_FIELDS: AccountFields = AccountFields {
    account_id: &["resAccount", "accountNumber"],
    account_name: &["resAccountName"],
    reported_total: &["rsTotAmt", "rsTotValAmt", "resAccountTotalAmt"],
    krw_deposit: &[
        "resDepositReceivedD2",
        "resDepositReceived",
        "resAccountBalance",
        "resBalance",
    ],
    usd_deposit: &["resUSDBalance", "resUsdBalance", "usdBalance"],
};

/// The object holding the account fields: the payload itself, or its
/// `data` member when the payload is a `{ "result", "data" }` envelope.
pub(crate) fn payload_body(payload: &Value) -> Result<&Map<String, Value>> {
    let root = payload
        .as_object()
        .ok_or_else(|| Error::UnknownFormat("payload is not a JSON object".into()))?;
    match root.get("data") {
        Some(Value::Object(data)) => Ok(data),
        _ => Ok(root),
    }
}

/// First non-empty value among `aliases`, as trimmed text.
///
/// Strings and numbers are accepted; `null`, empty strings and other JSON
/// types count as absent.
pub(crate) fn lookup(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
