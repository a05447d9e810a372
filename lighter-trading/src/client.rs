//! Lighter REST API client
//!
//! Unauthenticated market data, account lookups, transaction status and
//! submission of transactions that were signed by the signer.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

use lighter_core::{MarketSpec, TradingError, TradingResult};

use crate::signer::SignedTx;
use crate::types::{
    AccountData, AccountsResponse, FundingRateEntry, FundingRatesResponse, OrderBookOrdersResponse,
    OrderBooksResponse, SendTxResponse, TxResponse,
};

/// Depth requested when reading the order book for a price
const ORDER_BOOK_LIMIT: u32 = 10;

/// Lighter REST client
#[derive(Clone)]
pub struct LighterClient {
    client: Client,
    base_url: String,
}

impl LighterClient {
    /// Create a client for the given API endpoint
    pub fn new(base_url: &str) -> TradingResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("lighter-cli/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List every market with its decimal specification
    #[instrument(skip(self))]
    pub async fn order_books(&self) -> TradingResult<Vec<MarketSpec>> {
        let response = self
            .client
            .get(self.url("/api/v1/orderBooks"))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| TradingError::market_data(format!("Failed to fetch markets: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::market_data(format!(
                "Lighter API error ({}): {}",
                status, body
            )));
        }

        let books: OrderBooksResponse = response
            .json()
            .await
            .map_err(|e| {
                TradingError::market_data(format!("Failed to parse markets response: {}", e))
            })?;

        debug!("Fetched {} Lighter markets", books.order_books.len());
        Ok(books.order_books.iter().map(|b| b.to_market_spec()).collect())
    }

    /// Top of the order book for a market
    #[instrument(skip(self))]
    pub async fn order_book_orders(
        &self,
        market_id: u32,
    ) -> TradingResult<OrderBookOrdersResponse> {
        let response = self
            .client
            .get(self.url("/api/v1/orderBookOrders"))
            .header("accept", "application/json")
            .query(&[
                ("market_id", market_id.to_string()),
                ("limit", ORDER_BOOK_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TradingError::market_data(format!("Failed to fetch order book: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::market_data(format!(
                "Lighter API error ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TradingError::market_data(format!("Failed to parse order book: {}", e)))
    }

    /// Look up the account owned by an L1 address
    ///
    /// The endpoint is queried with `by=l1_address`; querying positions by
    /// account index does not return them.
    #[instrument(skip(self))]
    pub async fn account_by_l1_address(&self, l1_address: &str) -> TradingResult<AccountData> {
        let response = self
            .client
            .get(self.url("/api/v1/account"))
            .header("accept", "application/json")
            .query(&[("by", "l1_address"), ("value", l1_address)])
            .send()
            .await
            .map_err(|e| TradingError::market_data(format!("Failed to fetch account: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::market_data(format!(
                "Lighter API error ({}): {}",
                status, body
            )));
        }

        let accounts: AccountsResponse = response
            .json()
            .await
            .map_err(|e| {
                TradingError::market_data(format!("Failed to parse account response: {}", e))
            })?;

        accounts.accounts.into_iter().next().ok_or_else(|| {
            TradingError::market_data(format!("No account found for L1 address {}", l1_address))
        })
    }

    /// Status of a transaction; `None` while the exchange does not know it yet
    pub async fn transaction_by_hash(&self, tx_hash: &str) -> TradingResult<Option<TxResponse>> {
        let response = self
            .client
            .get(self.url("/api/v1/tx"))
            .header("accept", "application/json")
            .query(&[("by", "hash"), ("value", tx_hash)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::market_data(format!(
                "Failed to get transaction {}: {} - {}",
                tx_hash, status, body
            )));
        }

        Ok(Some(response.json().await?))
    }

    /// Submit a signed transaction
    ///
    /// Returns the exchange's response as-is; callers decide which error a
    /// rejection maps to.
    #[instrument(skip(self, tx), fields(tx_type = tx.tx_type))]
    pub async fn send_tx(&self, tx: &SignedTx) -> TradingResult<SendTxResponse> {
        let form = [
            ("tx_type", tx.tx_type.to_string()),
            ("tx_info", tx.tx_info.clone()),
        ];

        let response = self
            .client
            .post(self.url("/api/v1/sendTx"))
            .header("accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Rejections come back either as non-2xx or as a 200 with an error code
        match serde_json::from_str::<SendTxResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) => Ok(SendTxResponse {
                code: i64::from(status.as_u16()),
                message: Some(body),
                tx_hash: None,
            }),
        }
    }

    /// Current funding rates across markets
    pub async fn funding_rates(&self) -> TradingResult<Vec<FundingRateEntry>> {
        let response = self
            .client
            .get(self.url("/api/v1/funding-rates"))
            .send()
            .await
            .map_err(|e| {
                TradingError::market_data(format!("Failed to fetch funding rates: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::market_data(format!(
                "Lighter API error ({}): {}",
                status, body
            )));
        }

        let rates: FundingRatesResponse = response
            .json()
            .await
            .map_err(|e| {
                TradingError::market_data(format!("Failed to parse funding rates: {}", e))
            })?;
        Ok(rates.funding_rates)
    }
}

impl std::fmt::Debug for LighterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LighterClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
