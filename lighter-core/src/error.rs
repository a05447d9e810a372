//! Error types for the client

use std::time::Duration;
use thiserror::Error;

/// Client-wide error type
#[derive(Error, Debug)]
pub enum TradingError {
    /// Bad credentials, signer failure or network error during key setup
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Price, market metadata or account data could not be fetched
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Order rejected by the signer or the exchange
    #[error("Order error: {0}")]
    Order(String),

    /// Fill not confirmed in time; the order may still execute
    #[error("Fill not confirmed for {tx_hash} within {timeout:?}; outcome unknown")]
    FillTimeout { tx_hash: String, timeout: Duration },

    /// Bad user input, rejected before any exchange call
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Trading not enabled - run setup first")]
    NotAuthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TradingError {
    pub fn auth(msg: impl Into<String>) -> Self {
        TradingError::Auth(msg.into())
    }

    pub fn market_data(msg: impl Into<String>) -> Self {
        TradingError::MarketData(msg.into())
    }

    pub fn order(msg: impl Into<String>) -> Self {
        TradingError::Order(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        TradingError::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TradingError::Config(msg.into())
    }

    /// Whether the shell should drop back to the unauthenticated menu
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, TradingError::Auth(_) | TradingError::NotAuthenticated)
    }
}

/// Result type alias for client operations
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_timeout_message_mentions_unknown_outcome() {
        let err = TradingError::FillTimeout {
            tx_hash: "0xabc".to_string(),
            timeout: Duration::from_secs(3),
        };
        let msg = err.to_string();
        assert!(msg.contains("0xabc"));
        assert!(msg.contains("outcome unknown"));
    }

    #[test]
    fn test_auth_failure_classification() {
        assert!(TradingError::auth("bad key").is_auth_failure());
        assert!(TradingError::NotAuthenticated.is_auth_failure());
        assert!(!TradingError::order("rejected").is_auth_failure());
        assert!(!TradingError::validation("size").is_auth_failure());
    }
}
