//! Position tracking structures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::order::OrderSide;

/// Direction of an open perpetual position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Lighter reports the direction as a sign: 1 long, -1 short
    pub fn from_sign(sign: i64) -> Self {
        if sign < 0 {
            PositionSide::Short
        } else {
            PositionSide::Long
        }
    }

    pub fn sign(&self) -> Decimal {
        match self {
            PositionSide::Long => Decimal::ONE,
            PositionSide::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Side of the order that opened a position in this direction
    pub fn opening_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Side of the order that reduces a position in this direction
    pub fn closing_side(&self) -> OrderSide {
        self.opening_side().opposite()
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// An open perpetual position, fetched fresh on every view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Absolute size in base asset units
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    /// Derived from the initial margin fraction
    pub leverage: Decimal,
    /// Derived from entry, mark, size and side
    pub unrealized_pnl: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Build a position, deriving leverage and unrealized PnL
    pub fn new(
        symbol: impl Into<String>,
        side: PositionSide,
        size: Decimal,
        entry_price: Decimal,
        mark_price: Decimal,
        margin_fraction_pct: Decimal,
    ) -> Self {
        let size = size.abs();
        Self {
            symbol: symbol.into(),
            side,
            size,
            entry_price,
            mark_price,
            leverage: leverage_from_margin_fraction(margin_fraction_pct),
            unrealized_pnl: unrealized_pnl(side, size, entry_price, mark_price),
            timestamp: Utc::now(),
        }
    }

    /// Current value of the position at the mark price
    pub fn value(&self) -> Decimal {
        self.size.saturating_mul(self.mark_price)
    }

    /// Whole-number leverage, as the exchange expects it on orders
    pub fn leverage_u32(&self) -> u32 {
        use rust_decimal::prelude::ToPrimitive;
        self.leverage.round().to_u32().unwrap_or(1).max(1)
    }
}

/// Leverage implied by an initial margin fraction given in percent
///
/// A missing or non-positive fraction means no leverage (1x). Fractions too
/// small to divide by saturate at `Decimal::MAX`.
pub fn leverage_from_margin_fraction(margin_fraction_pct: Decimal) -> Decimal {
    if margin_fraction_pct <= Decimal::ZERO {
        return Decimal::ONE;
    }
    Decimal::ONE_HUNDRED
        .checked_div(margin_fraction_pct)
        .unwrap_or(Decimal::MAX)
}

/// Unrealized PnL: (mark - entry) * size, sign flipped for shorts
///
/// Saturates at the `Decimal` range instead of overflowing.
pub fn unrealized_pnl(
    side: PositionSide,
    size: Decimal,
    entry: Decimal,
    mark: Decimal,
) -> Decimal {
    mark.saturating_sub(entry)
        .saturating_mul(size.abs())
        .saturating_mul(side.sign())
}
