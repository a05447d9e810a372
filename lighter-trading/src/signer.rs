//! Signer boundary
//!
//! Lighter transactions are signed with an API key registered against the
//! account, and every transaction carries a nonce sequenced by the signer.
//! Key generation, signing and nonce management belong to the vendor signer;
//! this module only describes what the connector asks of it.
//!
//! Two clients signing with the same API key at the same time (a second CLI
//! session, or the web UI) can collide on nonces. The exchange then rejects
//! one of the transactions; nothing here tries to predict or repair nonces.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use lighter_core::{TradingError, TradingResult};

/// Cross margin mode as understood by the exchange
pub const CROSS_MARGIN_MODE: u8 = 0;

// ============================================================================
// Signer Types
// ============================================================================

/// Freshly generated API key pair; the private half never leaves the signer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyPair {
    pub public_key: String,
}

/// A transaction ready for `POST /api/v1/sendTx`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTx {
    pub tx_type: u8,
    pub tx_info: String,
}

/// Request to register a new API public key for an account
#[derive(Clone, Serialize)]
pub struct ChangeApiKeyRequest {
    pub account_index: i64,
    pub api_key_index: u8,
    pub eth_private_key: String,
    pub new_public_key: String,
}

impl std::fmt::Debug for ChangeApiKeyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeApiKeyRequest")
            .field("account_index", &self.account_index)
            .field("api_key_index", &self.api_key_index)
            .field("new_public_key", &self.new_public_key)
            .finish()
    }
}

/// Request to change the leverage of one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageRequest {
    pub account_index: i64,
    pub api_key_index: u8,
    pub market_id: u32,
    pub leverage: u32,
    pub margin_mode: u8,
}

/// Request to sign an immediate-or-cancel market order
///
/// Amounts are in the market's integer format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrderRequest {
    pub account_index: i64,
    pub api_key_index: u8,
    pub market_id: u32,
    pub client_order_index: i64,
    pub base_amount: i64,
    /// Worst acceptable average execution price
    pub avg_execution_price: i64,
    pub is_ask: bool,
    pub reduce_only: bool,
}

// ============================================================================
// Signer Trait
// ============================================================================

#[async_trait]
pub trait TxSigner: Send + Sync {
    /// Generate a new API key pair
    async fn generate_api_key(&self) -> TradingResult<ApiKeyPair>;

    /// Sign the transaction that registers `new_public_key` at `api_key_index`
    async fn sign_change_api_key(&self, request: &ChangeApiKeyRequest) -> TradingResult<SignedTx>;

    /// Confirm the signer can sign for the account with the registered key
    async fn check_client(&self, account_index: i64, api_key_index: u8) -> TradingResult<()>;

    async fn sign_update_leverage(&self, request: &LeverageRequest) -> TradingResult<SignedTx>;

    async fn sign_market_order(&self, request: &MarketOrderRequest) -> TradingResult<SignedTx>;
}

// ============================================================================
// Signer Service
// ============================================================================

/// Error payload returned by the signer service
#[derive(Debug, Deserialize)]
struct SignerErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct CheckClientRequest {
    account_index: i64,
    api_key_index: u8,
}

/// The vendor signer running as a local HTTP service
#[derive(Clone)]
pub struct SignerService {
    client: Client,
    base_url: String,
}

impl SignerService {
    pub fn new(base_url: &str) -> TradingResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> TradingResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Signer request: POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SignerErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(TradingError::Order(format!("Signer error ({}): {}", status, message)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TxSigner for SignerService {
    async fn generate_api_key(&self) -> TradingResult<ApiKeyPair> {
        let pair: ApiKeyPair = self
            .post("/api-key", &serde_json::json!({}))
            .await
            .map_err(|e| TradingError::auth(format!("Failed to create API key: {}", e)))?;
        info!("Generated API key {}", pair.public_key);
        Ok(pair)
    }

    async fn sign_change_api_key(&self, request: &ChangeApiKeyRequest) -> TradingResult<SignedTx> {
        self.post("/sign/change-api-key", request)
            .await
            .map_err(|e| TradingError::auth(format!("Failed to sign API key registration: {}", e)))
    }

    async fn check_client(&self, account_index: i64, api_key_index: u8) -> TradingResult<()> {
        let request = CheckClientRequest {
            account_index,
            api_key_index,
        };
        let _: serde_json::Value = self
            .post("/check-client", &request)
            .await
            .map_err(|e| TradingError::auth(format!("Client check failed: {}", e)))?;
        Ok(())
    }

    async fn sign_update_leverage(&self, request: &LeverageRequest) -> TradingResult<SignedTx> {
        self.post("/sign/update-leverage", request).await
    }

    async fn sign_market_order(&self, request: &MarketOrderRequest) -> TradingResult<SignedTx> {
        self.post("/sign/create-order", request).await
    }
}

impl std::fmt::Debug for SignerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerService")
            .field("base_url", &self.base_url)
            .finish()
    }
}
