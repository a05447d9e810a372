//! Environment configuration
//!
//! | variable                | required | default |
//! |-------------------------|----------|---------|
//! | `LIGHTER_BASE_ENDPOINT` | yes      |         |
//! | `LIGHTER_PRIVATE_KEY`   | yes      |         |
//! | `LIGHTER_L1_ADDRESS`    | yes      |         |
//! | `LIGHTER_API_KEY_INDEX` | no       | 0       |
//! | `LIGHTER_POLL_INTERVAL` | no       | 0.05 s  |
//! | `LIGHTER_FILL_TIMEOUT`  | no       | 3 s     |
//! | `LIGHTER_SIGNER_URL`    | no       |         |

use std::time::Duration;
use url::Url;

use lighter_core::{Credentials, TradingError, TradingResult};

pub const ENV_BASE_ENDPOINT: &str = "LIGHTER_BASE_ENDPOINT";
pub const ENV_PRIVATE_KEY: &str = "LIGHTER_PRIVATE_KEY";
pub const ENV_L1_ADDRESS: &str = "LIGHTER_L1_ADDRESS";
pub const ENV_API_KEY_INDEX: &str = "LIGHTER_API_KEY_INDEX";
pub const ENV_POLL_INTERVAL: &str = "LIGHTER_POLL_INTERVAL";
pub const ENV_FILL_TIMEOUT: &str = "LIGHTER_FILL_TIMEOUT";
pub const ENV_SIGNER_URL: &str = "LIGHTER_SIGNER_URL";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_FILL_TIMEOUT: Duration = Duration::from_secs(3);

/// Settings for one CLI session
#[derive(Clone)]
pub struct LighterConfig {
    pub base_endpoint: String,
    pub private_key: String,
    pub l1_address: String,
    pub api_key_index: u8,
    pub poll_interval: Duration,
    pub fill_timeout: Duration,
    /// Signer service; only needed to authenticate
    pub signer_url: Option<String>,
}

impl LighterConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> TradingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> TradingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_endpoint = get(ENV_BASE_ENDPOINT);
        let private_key = get(ENV_PRIVATE_KEY);
        let l1_address = get(ENV_L1_ADDRESS);

        let (base_endpoint, private_key, l1_address) =
            match (base_endpoint, private_key, l1_address) {
                (Some(b), Some(p), Some(a)) => (b, p, a),
                (b, p, a) => {
                    let missing: Vec<&str> = [
                        (ENV_BASE_ENDPOINT, b.is_none()),
                        (ENV_PRIVATE_KEY, p.is_none()),
                        (ENV_L1_ADDRESS, a.is_none()),
                    ]
                    .into_iter()
                    .filter(|(_, absent)| *absent)
                    .map(|(name, _)| name)
                    .collect();
                    return Err(TradingError::config(format!(
                        "Missing required environment variables: {}",
                        missing.join(", ")
                    )));
                }
            };

        let base_endpoint = parse_url(ENV_BASE_ENDPOINT, &base_endpoint)?;
        let signer_url = get(ENV_SIGNER_URL)
            .map(|v| parse_url(ENV_SIGNER_URL, &v))
            .transpose()?;

        let api_key_index = match get(ENV_API_KEY_INDEX) {
            Some(v) => v.parse::<u8>().map_err(|e| {
                TradingError::config(format!(
                    "{} must be an integer 0-255, got '{}': {}",
                    ENV_API_KEY_INDEX, v, e
                ))
            })?,
            None => 0,
        };

        let poll_interval =
            parse_seconds(ENV_POLL_INTERVAL, get(ENV_POLL_INTERVAL), DEFAULT_POLL_INTERVAL)?;
        let fill_timeout =
            parse_seconds(ENV_FILL_TIMEOUT, get(ENV_FILL_TIMEOUT), DEFAULT_FILL_TIMEOUT)?;

        Ok(Self {
            base_endpoint,
            private_key,
            l1_address,
            api_key_index,
            poll_interval,
            fill_timeout,
            signer_url,
        })
    }

    /// Key material for `Exchange::authenticate`
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.private_key, &self.l1_address, self.api_key_index)
    }
}

fn parse_url(name: &str, value: &str) -> TradingResult<String> {
    let url = Url::parse(value).map_err(|e| {
        TradingError::config(format!("{} is not a valid URL '{}': {}", name, value, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TradingError::config(format!(
            "{} must be an http(s) URL, got '{}'",
            name, value
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_seconds(name: &str, value: Option<String>, default: Duration) -> TradingResult<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    let seconds: f64 = value.parse().map_err(|e| {
        TradingError::config(format!(
            "{} must be a number of seconds, got '{}': {}",
            name, value, e
        ))
    })?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(TradingError::config(format!("{} must be positive, got '{}'", name, value)));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        TradingError::config(format!("{} is out of range, got '{}': {}", name, value, e))
    })
}

impl std::fmt::Debug for LighterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LighterConfig")
            .field("base_endpoint", &self.base_endpoint)
            .field("l1_address", &self.l1_address)
            .field("api_key_index", &self.api_key_index)
            .field("poll_interval", &self.poll_interval)
            .field("fill_timeout", &self.fill_timeout)
            .field("signer_url", &self.signer_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (ENV_BASE_ENDPOINT, "https://mainnet.zklighter.elliot.ai/"),
        (ENV_PRIVATE_KEY, "0xabc123"),
        (ENV_L1_ADDRESS, "0x1111111111111111111111111111111111111111"),
    ];

    #[test]
    fn test_defaults() {
        let config = LighterConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.base_endpoint, "https://mainnet.zklighter.elliot.ai");
        assert_eq!(config.api_key_index, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.fill_timeout, Duration::from_secs(3));
        assert!(config.signer_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_API_KEY_INDEX, "3"));
        vars.push((ENV_POLL_INTERVAL, "0.25"));
        vars.push((ENV_FILL_TIMEOUT, "10"));
        vars.push((ENV_SIGNER_URL, "http://127.0.0.1:9000"));
        let config = LighterConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.api_key_index, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.fill_timeout, Duration::from_secs(10));
        assert_eq!(config.signer_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.credentials().api_key_index, 3);
    }

    #[test]
    fn test_missing_variables_are_listed() {
        let err = LighterConfig::from_lookup(lookup(&[(ENV_PRIVATE_KEY, "0xabc")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(ENV_BASE_ENDPOINT));
        assert!(msg.contains(ENV_L1_ADDRESS));
        assert!(!msg.contains(ENV_PRIVATE_KEY));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = (ENV_L1_ADDRESS, "   ");
        assert!(LighterConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        for (key, value) in [
            (ENV_POLL_INTERVAL, "fast"),
            (ENV_POLL_INTERVAL, "0"),
            (ENV_FILL_TIMEOUT, "-1"),
            (ENV_FILL_TIMEOUT, "1e30"),
            (ENV_API_KEY_INDEX, "300"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((key, value));
            assert!(
                matches!(LighterConfig::from_lookup(lookup(&vars)), Err(TradingError::Config(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = (ENV_BASE_ENDPOINT, "not a url");
        assert!(LighterConfig::from_lookup(lookup(&vars)).is_err());
    }
}
