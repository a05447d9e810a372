//! Credentials and the authenticated session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key material supplied by the user's environment
#[derive(Clone)]
pub struct Credentials {
    /// Ethereum private key used to register API keys
    pub eth_private_key: String,
    pub l1_address: String,
    pub api_key_index: u8,
}

impl Credentials {
    pub fn new(
        eth_private_key: impl Into<String>,
        l1_address: impl Into<String>,
        api_key_index: u8,
    ) -> Self {
        Self {
            eth_private_key: eth_private_key.into(),
            l1_address: l1_address.into(),
            api_key_index,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("l1_address", &self.l1_address)
            .field("api_key_index", &self.api_key_index)
            .finish()
    }
}

/// Result of a successful API key registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub l1_address: String,
    pub account_index: i64,
    pub api_key_index: u8,
    /// Public half of the registered API key; the private half stays in the signer
    pub api_public_key: String,
    pub authenticated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_private_key() {
        let creds = Credentials::new("0xdeadbeef", "0xabc", 2);
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("0xabc"));
    }
}
