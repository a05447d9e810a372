//! Exchange capability trait
//!
//! Every exchange connector implements [`Exchange`]. The interactive shell
//! only talks to this trait, so additional venues are additional
//! implementers rather than variations of one connector.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::error::TradingResult;
use crate::market::{FundingRate, Price};
use crate::order::{Order, OrderSide};
use crate::position::Position;
use crate::session::{Credentials, Session};

#[async_trait]
pub trait Exchange: Send + Sync {
    /// Register an API key for the account behind `credentials`
    async fn authenticate(&mut self, credentials: &Credentials) -> TradingResult<Session>;

    /// Current mark price of a market
    async fn get_price(&self, symbol: &str) -> TradingResult<Price>;

    /// Submit a slippage-bounded market order; returns without waiting for a fill
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
        slippage_pct: Decimal,
        leverage: u32,
    ) -> TradingResult<Order>;

    /// Poll the order until it is terminal or `timeout` elapses
    ///
    /// A timeout is not an error: the order comes back as `TimedOut` and may
    /// still execute on the exchange.
    async fn await_fill(
        &self,
        order: Order,
        poll_interval: Duration,
        timeout: Duration,
    ) -> TradingResult<Order>;

    /// Open positions of the account owning `l1_address`
    async fn get_positions(&self, l1_address: &str) -> TradingResult<Vec<Position>>;

    /// Submit a reduce-only order against an existing position
    async fn close_position(
        &self,
        position: &Position,
        size: Decimal,
        slippage_pct: Decimal,
    ) -> TradingResult<Order>;

    /// Hourly funding rate of a market
    async fn get_funding_rate(&self, symbol: &str) -> TradingResult<FundingRate>;

    /// Minimum order size in base asset units
    async fn get_min_order_size(&self, symbol: &str) -> TradingResult<Decimal>;

    /// Session established by the last successful `authenticate`
    fn session(&self) -> Option<&Session>;
}
