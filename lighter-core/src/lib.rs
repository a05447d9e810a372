//! Core types for the Lighter perpetuals CLI
//!
//! This crate defines the shared data structures used across the client:
//! market metadata, orders, positions, the session, the error taxonomy and
//! the `Exchange` capability trait implemented by exchange connectors.

pub mod error;
pub mod exchange;
pub mod market;
pub mod order;
pub mod position;
pub mod session;

pub use error::{TradingError, TradingResult};
pub use exchange::Exchange;
pub use market::{FundingRate, MarketSpec, Price};
pub use order::{worst_acceptable_price, Order, OrderSide, OrderStatus, OrderType};
pub use position::{leverage_from_margin_fraction, unrealized_pnl, Position, PositionSide};
pub use session::{Credentials, Session};
