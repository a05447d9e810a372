//! Order structures and price-bound arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TradingError, TradingResult};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// The side that reduces a position opened with this side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Lighter encodes sells as asks
    pub fn is_ask(&self) -> bool {
        matches!(self, OrderSide::Sell)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(format!("Side must be 'buy' or 'sell', got '{}'", s.trim())),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// Lifecycle of a submitted order as seen by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Submitted,
    Filled,
    PartiallyFilled,
    Failed,
    TimedOut,
}

impl OrderStatus {
    /// Terminal statuses end fill polling
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::PartiallyFilled | OrderStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Filled => "filled",
            OrderStatus::PartiallyFilled => "partially-filled",
            OrderStatus::Failed => "failed",
            OrderStatus::TimedOut => "timed-out",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A market order submitted through an exchange connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Exchange transaction hash, once the exchange has accepted the order
    pub id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Requested size in base asset units
    pub size: Decimal,
    /// Price the bound was computed from
    pub reference_price: Decimal,
    /// Worst acceptable average execution price
    pub worst_price: Decimal,
    pub leverage: u32,
    pub reduce_only: bool,
    pub status: OrderStatus,
    /// Executed size, once known
    pub filled_size: Option<Decimal>,
    /// Average execution price, once known
    pub fill_price: Option<Decimal>,
    /// Exchange message for failed orders
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Notional value at the best known price
    pub fn notional(&self) -> Decimal {
        let size = self.filled_size.unwrap_or(self.size);
        let price = self.fill_price.unwrap_or(self.reference_price);
        size.saturating_mul(price)
    }
}

/// Worst acceptable execution price for a market order
///
/// `slippage_pct` is a percentage (0.5 means 0.5%). Buys accept a higher
/// price, sells a lower one. Fails when the bound does not fit in a `Decimal`.
pub fn worst_acceptable_price(
    price: Decimal,
    side: OrderSide,
    slippage_pct: Decimal,
) -> TradingResult<Decimal> {
    let slippage = slippage_pct / Decimal::ONE_HUNDRED;
    let factor = match side {
        OrderSide::Buy => Decimal::ONE.checked_add(slippage),
        OrderSide::Sell => Decimal::ONE.checked_sub(slippage),
    };
    factor
        .and_then(|factor| price.checked_mul(factor))
        .ok_or_else(|| {
            TradingError::validation(format!(
                "Price bound out of range for {} at {}% slippage",
                price, slippage_pct
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_worst_price_buy_is_exact() {
        let worst = worst_acceptable_price(dec!(3000), OrderSide::Buy, dec!(0.5)).unwrap();
        assert_eq!(worst, dec!(3015));
    }

    #[test]
    fn test_worst_price_sell() {
        let worst = worst_acceptable_price(dec!(3000), OrderSide::Sell, dec!(0.5)).unwrap();
        assert_eq!(worst, dec!(2985));
    }

    #[test]
    fn test_worst_price_avoids_float_drift() {
        // 0.1 + 0.2 style inputs stay exact in decimal
        let worst = worst_acceptable_price(dec!(0.3), OrderSide::Buy, dec!(10)).unwrap();
        assert_eq!(worst, dec!(0.33));
    }

    #[test]
    fn test_worst_price_out_of_range_is_an_error() {
        let result = worst_acceptable_price(Decimal::MAX, OrderSide::Buy, dec!(0.5));
        assert!(matches!(result, Err(TradingError::Validation(_))));

        // Sells shrink the price, so the same input stays in range
        assert!(worst_acceptable_price(Decimal::MAX, OrderSide::Sell, dec!(0.5)).is_ok());
    }

    #[test]
    fn test_notional_saturates_instead_of_panicking() {
        let order = Order {
            id: None,
            symbol: "ETH".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            size: Decimal::MAX,
            reference_price: dec!(3000),
            worst_price: dec!(3015),
            leverage: 1,
            reduce_only: false,
            status: OrderStatus::Submitted,
            filled_size: None,
            fill_price: None,
            message: None,
            timestamp: Utc::now(),
        };
        assert_eq!(order.notional(), Decimal::MAX);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" SELL ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("long".parse::<OrderSide>().is_err());
        assert!("".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_opposite_side() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
        assert!(OrderSide::Sell.is_ask());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(!OrderStatus::TimedOut.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::PartiallyFilled.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }
}
