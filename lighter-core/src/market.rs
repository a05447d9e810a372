//! Market data structures

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{TradingError, TradingResult};

/// Current price of a market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Price {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

/// Funding rate normalised to one hour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRate {
    pub symbol: String,
    /// Hourly rate as a fraction (0.0001 = 0.01%)
    pub rate: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Static metadata of a perpetual market
///
/// The exchange encodes sizes and prices as integers scaled by a
/// per-market number of decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSpec {
    pub symbol: String,
    pub market_id: u32,
    pub size_decimals: u32,
    pub price_decimals: u32,
    /// Minimum order size in base asset units
    pub min_base_amount: Decimal,
}

impl MarketSpec {
    /// Convert a base-asset size to the exchange integer format (truncating)
    pub fn scale_size(&self, size: Decimal) -> TradingResult<i64> {
        scale(size, self.size_decimals)
            .ok_or_else(|| {
                TradingError::order(format!("Size {} out of range for {}", size, self.symbol))
            })
    }

    /// Convert a price to the exchange integer format (truncating)
    pub fn scale_price(&self, price: Decimal) -> TradingResult<i64> {
        scale(price, self.price_decimals)
            .ok_or_else(|| {
                TradingError::order(format!("Price {} out of range for {}", price, self.symbol))
            })
    }

    /// Convert an exchange integer size back to base-asset units
    pub fn unscale_size(&self, raw: i64) -> Decimal {
        Decimal::new(raw, self.size_decimals)
    }

    /// Convert an exchange integer price back to quote units
    pub fn unscale_price(&self, raw: i64) -> Decimal {
        Decimal::new(raw, self.price_decimals)
    }
}

fn scale(value: Decimal, decimals: u32) -> Option<i64> {
    let factor = Decimal::from(10u64.checked_pow(decimals)?);
    value.checked_mul(factor)?.trunc().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth() -> MarketSpec {
        MarketSpec {
            symbol: "ETH".to_string(),
            market_id: 0,
            size_decimals: 4,
            price_decimals: 2,
            min_base_amount: dec!(0.005),
        }
    }

    #[test]
    fn test_scale_size_and_price() {
        let spec = eth();
        assert_eq!(spec.scale_size(dec!(1.0)).unwrap(), 10_000);
        assert_eq!(spec.scale_size(dec!(0.12345)).unwrap(), 1_234);
        assert_eq!(spec.scale_price(dec!(3015)).unwrap(), 301_500);
        assert_eq!(spec.scale_price(dec!(2984.999)).unwrap(), 298_499);
    }

    #[test]
    fn test_unscale_is_exact() {
        let spec = eth();
        assert_eq!(spec.unscale_price(301_512), dec!(3015.12));
        assert_eq!(spec.unscale_size(5_000), dec!(0.5));
    }

    #[test]
    fn test_scale_overflow_is_an_error() {
        let spec = MarketSpec {
            size_decimals: 30,
            ..eth()
        };
        assert!(spec.scale_size(dec!(1)).is_err());
    }
}
