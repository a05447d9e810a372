//! Lighter Trading - perpetual futures execution on the Lighter DEX
//!
//! This crate provides:
//! - Environment configuration for the exchange and the signer
//! - A REST client for market data, accounts and transaction status
//! - The signer boundary (API key registration, transaction signing)
//! - Bounded fill-confirmation polling
//! - `LighterConnector`, the `Exchange` implementation for Lighter

pub mod client;
pub mod config;
pub mod connector;
pub mod fill;
pub mod signer;
pub mod types;

pub use client::LighterClient;
pub use config::LighterConfig;
pub use connector::LighterConnector;
pub use fill::{poll_until, PollOutcome};
pub use signer::{
    ApiKeyPair, ChangeApiKeyRequest, LeverageRequest, MarketOrderRequest, SignedTx, SignerService,
    TxSigner,
};
