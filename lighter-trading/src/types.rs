//! Wire types for the Lighter REST API

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use lighter_core::MarketSpec;

// ============================================================================
// Custom deserialization for decimal fields
// ============================================================================

/// Lighter sends most decimals as strings but some (funding rates) as JSON
/// numbers; accept both without going through f64
fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    decimal_from_value(&value).map_err(serde::de::Error::custom)
}

fn deserialize_optional_decimal<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => decimal_from_value(&v).map(Some).map_err(serde::de::Error::custom),
    }
}

fn decimal_from_value(value: &serde_json::Value) -> Result<Decimal, String> {
    match value {
        serde_json::Value::String(s) => {
            Decimal::from_str(s.trim()).map_err(|e| format!("Invalid decimal '{}': {}", s, e))
        }
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|e| format!("Invalid decimal {}: {}", text, e))
        }
        other => Err(format!("Expected decimal, got {}", other)),
    }
}

// ============================================================================
// Market metadata
// ============================================================================

/// Response of `GET /api/v1/orderBooks`
#[derive(Debug, Deserialize)]
pub struct OrderBooksResponse {
    #[serde(default, alias = "orderbooks")]
    pub order_books: Vec<OrderBookMeta>,
}

#[derive(Debug, Deserialize)]
pub struct OrderBookMeta {
    pub symbol: String,
    #[serde(alias = "index")]
    pub market_id: u32,
    #[serde(alias = "size_decimals")]
    pub supported_size_decimals: u32,
    #[serde(alias = "price_decimals")]
    pub supported_price_decimals: u32,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub min_base_amount: Option<Decimal>,
}

impl OrderBookMeta {
    pub fn to_market_spec(&self) -> MarketSpec {
        MarketSpec {
            symbol: self.symbol.clone(),
            market_id: self.market_id,
            size_decimals: self.supported_size_decimals,
            price_decimals: self.supported_price_decimals,
            min_base_amount: self.min_base_amount.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Response of `GET /api/v1/orderBookOrders`
#[derive(Debug, Deserialize)]
pub struct OrderBookOrdersResponse {
    #[serde(default)]
    pub bids: Vec<BookOrder>,
    #[serde(default)]
    pub asks: Vec<BookOrder>,
}

#[derive(Debug, Deserialize)]
pub struct BookOrder {
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: Decimal,
}

impl OrderBookOrdersResponse {
    /// Mid of best bid and best ask, or whichever side exists
    ///
    /// `None` when the book is empty or the mid is out of `Decimal` range.
    pub fn mid_price(&self) -> Option<Decimal> {
        let best_bid = self.bids.first().map(|o| o.price);
        let best_ask = self.asks.first().map(|o| o.price);
        match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => bid
                .checked_add(ask)
                .map(|sum| sum / Decimal::TWO)
                .or_else(|| ask.checked_sub(bid).and_then(|d| bid.checked_add(d / Decimal::TWO))),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Response of `GET /api/v1/account`
#[derive(Debug, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<AccountData>,
}

#[derive(Debug, Deserialize)]
pub struct AccountData {
    pub account_index: i64,
    #[serde(default)]
    pub l1_address: Option<String>,
    #[serde(default)]
    pub positions: Vec<AccountPosition>,
}

#[derive(Debug, Deserialize)]
pub struct AccountPosition {
    #[serde(default)]
    pub market_id: Option<u32>,
    pub symbol: String,
    /// 1 for long, -1 for short
    pub sign: i64,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub position: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub avg_entry_price: Decimal,
    /// Percent of notional held as initial margin
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub initial_margin_fraction: Option<Decimal>,
}

// ============================================================================
// Transactions
// ============================================================================

/// Response of `GET /api/v1/tx`
#[derive(Debug, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub hash: Option<String>,
    pub status: i64,
    /// JSON-encoded execution details
    #[serde(default)]
    pub event_info: Option<String>,
    #[serde(default)]
    pub block_height: Option<i64>,
}

/// Execution details inside `TxResponse::event_info`
#[derive(Debug, Default, Deserialize)]
pub struct TxEventInfo {
    /// Trade: integer price `p` and integer size `s`
    #[serde(default, rename = "t")]
    pub trade: Option<TxTrade>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct TxTrade {
    #[serde(default, rename = "p")]
    pub price: i64,
    #[serde(default, rename = "s")]
    pub size: i64,
}

impl TxResponse {
    /// Transaction fully executed and settled
    pub const STATUS_EXECUTED: i64 = 3;

    pub fn trade(&self) -> Option<TxTrade> {
        let info = self.event_info.as_deref()?;
        serde_json::from_str::<TxEventInfo>(info).ok()?.trade
    }
}

/// Response of `POST /api/v1/sendTx`
#[derive(Debug, Deserialize)]
pub struct SendTxResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl SendTxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

// ============================================================================
// Funding
// ============================================================================

/// Response of `GET /api/v1/funding-rates`
#[derive(Debug, Deserialize)]
pub struct FundingRatesResponse {
    #[serde(default)]
    pub funding_rates: Vec<FundingRateEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FundingRateEntry {
    pub market_id: u32,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Eight-hour funding rate
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_books_accepts_both_layouts() {
        let json = r#"{"code":200,"order_books":[{"symbol":"ETH","market_id":0,
            "min_base_amount":"0.0050","supported_size_decimals":4,
            "supported_price_decimals":2}]}"#;
        let parsed: OrderBooksResponse = serde_json::from_str(json).unwrap();
        let spec = parsed.order_books[0].to_market_spec();
        assert_eq!(spec.symbol, "ETH");
        assert_eq!(spec.min_base_amount, dec!(0.005));

        let json = r#"{"orderbooks":[{"symbol":"BTC","index":1,
            "size_decimals":5,"price_decimals":1}]}"#;
        let parsed: OrderBooksResponse = serde_json::from_str(json).unwrap();
        let spec = parsed.order_books[0].to_market_spec();
        assert_eq!(spec.market_id, 1);
        assert_eq!(spec.size_decimals, 5);
        assert_eq!(spec.min_base_amount, Decimal::ZERO);
    }

    #[test]
    fn test_mid_price() {
        let json = r#"{"bids":[{"price":"2999.50"}],"asks":[{"price":"3000.50"}]}"#;
        let book: OrderBookOrdersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(book.mid_price(), Some(dec!(3000)));

        let json = r#"{"bids":[],"asks":[{"price":"10.5"}]}"#;
        let book: OrderBookOrdersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(book.mid_price(), Some(dec!(10.5)));

        let book: OrderBookOrdersResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(book.mid_price(), None);

        let json = r#"{"bids":[{"price":"79228162514264337593543950335"}],
            "asks":[{"price":"79228162514264337593543950335"}]}"#;
        let book: OrderBookOrdersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(book.mid_price(), Some(Decimal::MAX));
    }

    #[test]
    fn test_account_position_parsing() {
        let json = r#"{"accounts":[{"account_index":42,"positions":[{"market_id":0,"symbol":"ETH",
            "sign":-1,"position":"0.5000","avg_entry_price":"3000.00",
            "initial_margin_fraction":"20.00","unrealized_pnl":"-1.00"}]}]}"#;
        let parsed: AccountsResponse = serde_json::from_str(json).unwrap();
        let account = &parsed.accounts[0];
        assert_eq!(account.account_index, 42);
        let pos = &account.positions[0];
        assert_eq!(pos.sign, -1);
        assert_eq!(pos.position, dec!(0.5));
        assert_eq!(pos.initial_margin_fraction, Some(dec!(20)));
    }

    #[test]
    fn test_tx_trade_extraction() {
        let json = r#"{"hash":"0xabc","status":3,
            "event_info":"{\"t\":{\"p\":301512,\"s\":10000}}"}"#;
        let tx: TxResponse = serde_json::from_str(json).unwrap();
        let trade = tx.trade().unwrap();
        assert_eq!(trade.price, 301_512);
        assert_eq!(trade.size, 10_000);

        let json = r#"{"status":3,"event_info":"not json"}"#;
        let tx: TxResponse = serde_json::from_str(json).unwrap();
        assert!(tx.trade().is_none());
    }

    #[test]
    fn test_funding_rate_accepts_numbers() {
        let json = r#"{"funding_rates":[{"market_id":0,"exchange":"lighter",
            "symbol":"ETH","rate":0.0008}]}"#;
        let parsed: FundingRatesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.funding_rates[0].rate, dec!(0.0008));
    }
}
