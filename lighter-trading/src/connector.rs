//! Exchange connector for Lighter
//!
//! Market data and account lookups go straight to the REST API. Anything
//! that moves funds is signed by the signer and then submitted through
//! `sendTx`; fills are confirmed by polling the transaction by hash.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use lighter_core::{
    worst_acceptable_price, Credentials, Exchange, FundingRate, MarketSpec, Order, OrderSide,
    OrderStatus, OrderType, Position, PositionSide, Price, Session, TradingError, TradingResult,
};

use crate::client::LighterClient;
use crate::config::LighterConfig;
use crate::fill::poll_until;
use crate::signer::{
    ChangeApiKeyRequest, LeverageRequest, MarketOrderRequest, SignerService, TxSigner,
    CROSS_MARGIN_MODE,
};
use crate::types::{SendTxResponse, TxResponse, TxTrade};

/// Lighter reports funding over eight hours
const FUNDING_PERIOD_HOURS: u32 = 8;

/// What a settled transaction says about the order
#[derive(Debug)]
enum TxOutcome {
    Executed(Option<TxTrade>),
    Failed(i64),
}

impl TxOutcome {
    /// `None` while the transaction is still pending
    fn from_response(tx: &TxResponse) -> Option<Self> {
        match tx.status {
            TxResponse::STATUS_EXECUTED => Some(TxOutcome::Executed(tx.trade())),
            status if status > TxResponse::STATUS_EXECUTED => Some(TxOutcome::Failed(status)),
            _ => None,
        }
    }
}

// ============================================================================
// Lighter Connector
// ============================================================================

/// `Exchange` implementation for the Lighter DEX
pub struct LighterConnector {
    client: LighterClient,
    signer: Option<Arc<dyn TxSigner>>,
    /// Symbol -> market metadata, loaded once from `orderBooks`
    markets: RwLock<HashMap<String, MarketSpec>>,
    session: Option<Session>,
    /// The exchange does not report leverage, so the last value we set is tracked here
    current_leverage: AtomicU32,
}

impl LighterConnector {
    /// Create a connector from a REST client and an optional signer
    ///
    /// Without a signer the connector can read market data and positions
    /// but cannot authenticate or trade.
    pub fn new(client: LighterClient, signer: Option<Arc<dyn TxSigner>>) -> Self {
        Self {
            client,
            signer,
            markets: RwLock::new(HashMap::new()),
            session: None,
            current_leverage: AtomicU32::new(1),
        }
    }

    /// Create a connector from environment configuration
    pub fn from_config(config: &LighterConfig) -> TradingResult<Self> {
        let client = LighterClient::new(&config.base_endpoint)?;
        let signer = match &config.signer_url {
            Some(url) => Some(Arc::new(SignerService::new(url)?) as Arc<dyn TxSigner>),
            None => {
                warn!("LIGHTER_SIGNER_URL not set - trading will be unavailable");
                None
            }
        };
        Ok(Self::new(client, signer))
    }

    /// Get the REST endpoint
    pub fn base_endpoint(&self) -> &str {
        self.client.base_url()
    }

    /// Leverage last set through this connector
    pub fn current_leverage(&self) -> u32 {
        self.current_leverage.load(Ordering::Relaxed)
    }

    /// Known market symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.markets.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Reload market metadata from the exchange
    pub async fn refresh_markets(&self) -> TradingResult<usize> {
        let specs = self.client.order_books().await?;
        let mut markets = self.markets.write();
        markets.clear();
        for spec in specs {
            markets.insert(spec.symbol.clone(), spec);
        }
        debug!("Cached {} market specifications", markets.len());
        Ok(markets.len())
    }

    /// Metadata of one market, loading the market list on first use
    pub async fn market(&self, symbol: &str) -> TradingResult<MarketSpec> {
        let loaded = !self.markets.read().is_empty();
        if !loaded {
            self.refresh_markets().await?;
        }

        let markets = self.markets.read();
        markets.get(symbol).cloned().ok_or_else(|| {
            let mut available: Vec<&str> = markets.keys().map(String::as_str).collect();
            available.sort_unstable();
            TradingError::market_data(format!(
                "Unknown symbol {}. Available: {}",
                symbol,
                available.join(", ")
            ))
        })
    }

    fn signer(&self) -> TradingResult<&Arc<dyn TxSigner>> {
        self.signer.as_ref().ok_or(TradingError::NotAuthenticated)
    }

    fn active_session(&self) -> TradingResult<&Session> {
        self.session.as_ref().ok_or(TradingError::NotAuthenticated)
    }

    /// Sign and submit a leverage change for one market
    async fn update_leverage(
        &self,
        session: &Session,
        market: &MarketSpec,
        leverage: u32,
    ) -> TradingResult<()> {
        let request = LeverageRequest {
            account_index: session.account_index,
            api_key_index: session.api_key_index,
            market_id: market.market_id,
            leverage,
            margin_mode: CROSS_MARGIN_MODE,
        };

        let tx = self.signer()?.sign_update_leverage(&request).await?;
        let response = self.client.send_tx(&tx).await?;
        if !response.is_success() {
            return Err(TradingError::order(format!(
                "Leverage update to {}x failed: {}",
                leverage,
                describe_rejection(&response)
            )));
        }

        self.current_leverage.store(leverage, Ordering::Relaxed);
        info!("Leverage set to {}x for {}", leverage, market.symbol);
        Ok(())
    }

    /// Shared submission path for opening and closing orders
    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
        slippage_pct: Decimal,
        leverage: u32,
        set_leverage: bool,
        reduce_only: bool,
    ) -> TradingResult<Order> {
        let session = self.active_session()?;
        let signer = self.signer()?;
        validate_order_params(size, slippage_pct, leverage)?;

        let market = self.market(symbol).await?;
        if !reduce_only && !market.min_base_amount.is_zero() && size < market.min_base_amount {
            return Err(TradingError::validation(format!(
                "Size {} is below the minimum order size {} for {}",
                size, market.min_base_amount, symbol
            )));
        }

        let base_amount = market.scale_size(size)?;
        if base_amount <= 0 {
            return Err(TradingError::validation(format!(
                "Size {} is finer than the {} decimals {} supports",
                size, market.size_decimals, symbol
            )));
        }

        let reference_price = self.get_price(symbol).await?.price;
        let worst_price = worst_acceptable_price(reference_price, side, slippage_pct)?;
        let avg_execution_price = market.scale_price(worst_price)?;

        if set_leverage {
            self.update_leverage(session, &market, leverage).await?;
        }

        let request = MarketOrderRequest {
            account_index: session.account_index,
            api_key_index: session.api_key_index,
            market_id: market.market_id,
            client_order_index: Utc::now().timestamp_millis(),
            base_amount,
            avg_execution_price,
            is_ask: side.is_ask(),
            reduce_only,
        };

        info!(
            "Placing market {} {} {} (worst price {}, reduce_only={})",
            side, size, symbol, worst_price, reduce_only
        );

        let tx = signer.sign_market_order(&request).await?;
        let response = self.client.send_tx(&tx).await?;
        if !response.is_success() {
            return Err(TradingError::order(describe_rejection(&response)));
        }

        if response.tx_hash.is_none() {
            warn!("Exchange accepted the order without a transaction hash");
        }

        Ok(Order {
            id: response.tx_hash,
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            size,
            reference_price,
            worst_price,
            leverage,
            reduce_only,
            status: OrderStatus::Submitted,
            filled_size: None,
            fill_price: None,
            message: response.message.filter(|m| !m.is_empty()),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl Exchange for LighterConnector {
    #[instrument(skip(self, credentials), fields(l1_address = %credentials.l1_address))]
    async fn authenticate(&mut self, credentials: &Credentials) -> TradingResult<Session> {
        self.session = None;
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| TradingError::auth("No signer configured - set LIGHTER_SIGNER_URL"))?;

        let account = self
            .client
            .account_by_l1_address(&credentials.l1_address)
            .await
            .map_err(|e| as_auth("Failed to fetch account index", e))?;
        info!("Resolved account index {} for {}", account.account_index, credentials.l1_address);

        self.refresh_markets()
            .await
            .map_err(|e| as_auth("Failed to load market data", e))?;

        let key_pair = signer
            .generate_api_key()
            .await
            .map_err(|e| as_auth("Failed to create API key", e))?;

        let request = ChangeApiKeyRequest {
            account_index: account.account_index,
            api_key_index: credentials.api_key_index,
            eth_private_key: credentials.eth_private_key.clone(),
            new_public_key: key_pair.public_key.clone(),
        };
        let tx = signer
            .sign_change_api_key(&request)
            .await
            .map_err(|e| as_auth("Failed to sign API key registration", e))?;

        let response = self
            .client
            .send_tx(&tx)
            .await
            .map_err(|e| as_auth("Failed to register API key", e))?;
        if !response.is_success() {
            return Err(TradingError::auth(format!(
                "Failed to register API key: {}",
                describe_rejection(&response)
            )));
        }

        signer
            .check_client(account.account_index, credentials.api_key_index)
            .await
            .map_err(|e| as_auth("Client check failed", e))?;

        let session = Session {
            l1_address: credentials.l1_address.clone(),
            account_index: account.account_index,
            api_key_index: credentials.api_key_index,
            api_public_key: key_pair.public_key,
            authenticated_at: Utc::now(),
        };
        info!(
            "Trading enabled for account {} (API key index {})",
            session.account_index, session.api_key_index
        );
        self.session = Some(session.clone());
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_price(&self, symbol: &str) -> TradingResult<Price> {
        let market = self.market(symbol).await?;
        let book = self.client.order_book_orders(market.market_id).await?;
        let price = book.mid_price().ok_or_else(|| {
            TradingError::market_data(format!("No price data available for symbol {}", symbol))
        })?;
        Ok(Price::new(symbol, price))
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
        slippage_pct: Decimal,
        leverage: u32,
    ) -> TradingResult<Order> {
        self.submit(symbol, side, size, slippage_pct, leverage, true, false).await
    }

    async fn await_fill(
        &self,
        mut order: Order,
        poll_interval: Duration,
        timeout: Duration,
    ) -> TradingResult<Order> {
        if order.status.is_terminal() {
            return Ok(order);
        }

        let Some(tx_hash) = order.id.clone() else {
            warn!("Order on {} has no transaction hash; cannot confirm fill", order.symbol);
            order.status = OrderStatus::TimedOut;
            return Ok(order);
        };

        let market = self.market(&order.symbol).await?;
        let client = &self.client;
        let hash = tx_hash.as_str();

        let outcome = poll_until(poll_interval, timeout, || async move {
            match client.transaction_by_hash(hash).await {
                Ok(Some(tx)) => TxOutcome::from_response(&tx),
                Ok(None) => None,
                Err(e) => {
                    debug!("Transaction {} not readable yet: {}", hash, e);
                    None
                }
            }
        })
        .await;

        match outcome.value {
            Some(TxOutcome::Executed(trade)) => {
                let filled_size = trade
                    .filter(|t| t.size > 0)
                    .map(|t| market.unscale_size(t.size))
                    .unwrap_or(order.size);
                order.fill_price = trade
                    .filter(|t| t.price > 0)
                    .map(|t| market.unscale_price(t.price));
                order.filled_size = Some(filled_size);
                order.status = if filled_size < order.size {
                    OrderStatus::PartiallyFilled
                } else {
                    OrderStatus::Filled
                };
                info!(
                    "Transaction {} {} after {} polls ({:?})",
                    tx_hash, order.status, outcome.polls, outcome.elapsed
                );
            }
            Some(TxOutcome::Failed(status)) => {
                order.status = OrderStatus::Failed;
                order.message = Some(format!(
                    "Transaction {} failed with status {}",
                    tx_hash, status
                ));
                warn!("Transaction {} failed with status {}", tx_hash, status);
            }
            None => {
                order.status = OrderStatus::TimedOut;
                warn!(
                    "Transaction {} not confirmed within {:?} ({} polls)",
                    tx_hash, timeout, outcome.polls
                );
            }
        }

        Ok(order)
    }

    #[instrument(skip(self))]
    async fn get_positions(&self, l1_address: &str) -> TradingResult<Vec<Position>> {
        let account = self.client.account_by_l1_address(l1_address).await?;

        let mut positions = Vec::new();
        for entry in account.positions {
            if entry.position.is_zero() {
                continue;
            }

            let mark = self.get_price(&entry.symbol).await?.price;
            positions.push(Position::new(
                entry.symbol,
                PositionSide::from_sign(entry.sign),
                entry.position,
                entry.avg_entry_price,
                mark,
                entry.initial_margin_fraction.unwrap_or(Decimal::ONE_HUNDRED),
            ));
        }

        debug!("Fetched {} open positions", positions.len());
        Ok(positions)
    }

    async fn close_position(
        &self,
        position: &Position,
        size: Decimal,
        slippage_pct: Decimal,
    ) -> TradingResult<Order> {
        if size <= Decimal::ZERO || size > position.size {
            return Err(TradingError::validation(format!(
                "Size to close must be between 0 and {}, got {}",
                position.size, size
            )));
        }

        self.submit(
            &position.symbol,
            position.side.closing_side(),
            size,
            slippage_pct,
            position.leverage_u32(),
            false,
            true,
        )
        .await
    }

    async fn get_funding_rate(&self, symbol: &str) -> TradingResult<FundingRate> {
        let market = self.market(symbol).await?;
        let rates = self.client.funding_rates().await?;

        let entry = rates
            .into_iter()
            .find(|r| r.market_id == market.market_id && r.exchange == "lighter")
            .ok_or_else(|| {
                TradingError::market_data(format!(
                    "No funding rate found for symbol {} (market_id: {})",
                    symbol, market.market_id
                ))
            })?;

        Ok(FundingRate {
            symbol: symbol.to_string(),
            rate: entry.rate / Decimal::from(FUNDING_PERIOD_HOURS),
            timestamp: Utc::now(),
        })
    }

    async fn get_min_order_size(&self, symbol: &str) -> TradingResult<Decimal> {
        Ok(self.market(symbol).await?.min_base_amount)
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl std::fmt::Debug for LighterConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LighterConnector")
            .field("client", &self.client)
            .field("has_signer", &self.signer.is_some())
            .field("session", &self.session)
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn validate_order_params(size: Decimal, slippage_pct: Decimal, leverage: u32) -> TradingResult<()> {
    if size <= Decimal::ZERO {
        return Err(TradingError::validation(format!("Size must be positive, got {}", size)));
    }
    if slippage_pct < Decimal::ZERO || slippage_pct >= Decimal::ONE_HUNDRED {
        return Err(TradingError::validation(format!(
            "Slippage must be between 0 and 100%, got {}",
            slippage_pct
        )));
    }
    if leverage == 0 {
        return Err(TradingError::validation("Leverage must be at least 1"));
    }
    Ok(())
}

/// Exchange rejection text, flagging the known nonce-collision case
fn describe_rejection(response: &SendTxResponse) -> String {
    let message = response
        .message
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("code {}", response.code));

    if message.to_lowercase().contains("nonce") {
        format!(
            "{} (nonce conflict: another session may be signing with the same API key)",
            message
        )
    } else {
        message
    }
}

/// Fold any failure during key setup into an authentication error
fn as_auth(context: &str, err: TradingError) -> TradingError {
    match err {
        TradingError::Auth(_) => err,
        other => TradingError::auth(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_order_params() {
        assert!(validate_order_params(dec!(1), dec!(0.5), 5).is_ok());
        assert!(validate_order_params(dec!(1), Decimal::ZERO, 1).is_ok());
        assert!(matches!(
            validate_order_params(Decimal::ZERO, dec!(0.5), 5),
            Err(TradingError::Validation(_))
        ));
        assert!(matches!(
            validate_order_params(dec!(-1), dec!(0.5), 5),
            Err(TradingError::Validation(_))
        ));
        assert!(validate_order_params(dec!(1), dec!(100), 5).is_err());
        assert!(validate_order_params(dec!(1), dec!(-0.1), 5).is_err());
        assert!(validate_order_params(dec!(1), dec!(0.5), 0).is_err());
    }

    #[test]
    fn test_tx_outcome_classification() {
        let tx = |status: i64| TxResponse {
            hash: Some("0xabc".to_string()),
            status,
            event_info: None,
            block_height: None,
        };
        assert!(TxOutcome::from_response(&tx(0)).is_none());
        assert!(TxOutcome::from_response(&tx(2)).is_none());
        assert!(matches!(TxOutcome::from_response(&tx(3)), Some(TxOutcome::Executed(None))));
        assert!(matches!(TxOutcome::from_response(&tx(4)), Some(TxOutcome::Failed(4))));
    }

    #[test]
    fn test_nonce_rejections_are_flagged() {
        let response = SendTxResponse {
            code: 21104,
            message: Some("invalid nonce".to_string()),
            tx_hash: None,
        };
        assert!(describe_rejection(&response).contains("another session"));

        let response = SendTxResponse {
            code: 21700,
            message: None,
            tx_hash: None,
        };
        assert_eq!(describe_rejection(&response), "code 21700");
    }

    #[test]
    fn test_as_auth_keeps_auth_errors() {
        let err = as_auth("ctx", TradingError::auth("bad key"));
        assert_eq!(err.to_string(), "Authentication error: bad key");

        let err = as_auth("Failed to fetch account index", TradingError::market_data("404"));
        assert!(matches!(
            err,
            TradingError::Auth(ref m) if m.contains("Failed to fetch account index")
        ));
    }

    #[tokio::test]
    async fn test_trading_requires_session() {
        let client = LighterClient::new("http://127.0.0.1:9").unwrap();
        let connector = LighterConnector::new(client, None);
        let err = connector
            .submit_market_order("ETH", OrderSide::Buy, dec!(1), dec!(0.5), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_authenticate_without_signer_is_auth_error() {
        let client = LighterClient::new("http://127.0.0.1:9").unwrap();
        let mut connector = LighterConnector::new(client, None);
        let err = connector
            .authenticate(&Credentials::new("0xkey", "0xaddr", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TradingError::Auth(_)));
        assert!(connector.session().is_none());
    }
}
