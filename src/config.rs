// Runtime configuration, read from the environment (and `.env` if present).

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::ledger::{Address, Amount};
use crate::market_resolve::{DEFAULT_FEE_BPS, MAX_FEE_BPS};
use crate::registry::RegistryConfig;
use crate::units::{parse_units, COLLATERAL_DECIMALS};

/// 10,000 mUSDC
pub const DEFAULT_FAUCET_AMOUNT: Amount = 10_000 * 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Fee of {fee_bps} bps exceeds maximum of {max} bps")]
    FeeTooHigh { fee_bps: u32, max: u32 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub resolver_authority: Address,
    pub fee_bps: u32,
    pub enforce_close_time: bool,
    pub state_path: PathBuf,
    /// Collateral handed out per faucet call, in base units
    pub faucet_amount: Amount,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1234)),
            resolver_authority: Address::from("resolver"),
            fee_bps: DEFAULT_FEE_BPS,
            enforce_close_time: true,
            state_path: PathBuf::from("data/state.json"),
            faucet_amount: DEFAULT_FAUCET_AMOUNT,
            seed_demo: false,
        }
    }
}

impl Config {
    /// Load from process environment. Unset keys keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; `from_env` with an injectable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("BIND_ADDR") {
            config.bind_addr = value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "BIND_ADDR", value })?;
        }
        if let Some(value) = lookup("RESOLVER_AUTHORITY") {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { key: "RESOLVER_AUTHORITY", value });
            }
            config.resolver_authority = Address::new(value.trim());
        }
        if let Some(value) = lookup("FEE_BPS") {
            config.fee_bps = value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "FEE_BPS", value })?;
        }
        if let Some(value) = lookup("ENFORCE_CLOSE_TIME") {
            config.enforce_close_time = parse_bool("ENFORCE_CLOSE_TIME", value)?;
        }
        if let Some(value) = lookup("STATE_PATH") {
            config.state_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("FAUCET_AMOUNT") {
            // Human units, e.g. "10000" or "2500.5"
            config.faucet_amount = parse_units(&value, COLLATERAL_DECIMALS)
                .map_err(|_| ConfigError::Invalid { key: "FAUCET_AMOUNT", value })?;
        }
        if let Some(value) = lookup("SEED_DEMO") {
            config.seed_demo = parse_bool("SEED_DEMO", value)?;
        }

        if config.fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::FeeTooHigh { fee_bps: config.fee_bps, max: MAX_FEE_BPS });
        }
        Ok(config)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            resolver_authority: self.resolver_authority.clone(),
            fee_bps: self.fee_bps,
            enforce_close_time: self.enforce_close_time,
        }
    }
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 1234);
        assert_eq!(config.resolver_authority, Address::from("resolver"));
        assert_eq!(config.fee_bps, 0);
        assert!(config.enforce_close_time);
        assert_eq!(config.faucet_amount, 10_000_000_000);
        assert!(!config.seed_demo);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("FEE_BPS", "30"),
            ("ENFORCE_CLOSE_TIME", "false"),
            ("FAUCET_AMOUNT", "2.5"),
            ("RESOLVER_AUTHORITY", "0xabc"),
        ])
        .unwrap();
        assert_eq!(config.fee_bps, 30);
        assert!(!config.enforce_close_time);
        assert_eq!(config.faucet_amount, 2_500_000);
        assert_eq!(config.registry_config().resolver_authority, Address::from("0xabc"));
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            load(&[("FEE_BPS", "lots")]).unwrap_err(),
            ConfigError::Invalid { key: "FEE_BPS", value: "lots".to_string() }
        );
        assert!(matches!(
            load(&[("FEE_BPS", "5000")]),
            Err(ConfigError::FeeTooHigh { fee_bps: 5000, max: 1000 })
        ));
        assert!(load(&[("SEED_DEMO", "maybe")]).is_err());
    }
}
