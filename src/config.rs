//! Configuration management for the bridge
//!
//! Loads configuration from a TOML file with environment variable substitution.
//! When no file is present the built-in chain table is used.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV: &str = "XY_BRIDGE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Base fee buffer applied to the max fee (and to the legacy gas price)
pub const DEFAULT_BASE_FEE_MULTIPLIER: f64 = 1.25;
/// Safety margin applied to the node's gas estimate
pub const DEFAULT_GAS_LIMIT_MULTIPLIER: f64 = 1.5;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default = "default_chains")]
    pub chains: BTreeMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub base_url: String,
    /// Slippage tolerance in percent
    pub slippage: f64,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub eip1559: bool,
    pub fee_history_blocks: u64,
    pub reward_percentile: f64,
    pub base_fee_multiplier: f64,
    pub gas_limit_multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub explorer_url: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aggregator-api.xy.finance/v1".to_string(),
            slippage: 1.0,
            request_timeout_secs: None,
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            eip1559: true,
            fee_history_blocks: 5,
            reward_percentile: 80.0,
            base_fee_multiplier: DEFAULT_BASE_FEE_MULTIPLIER,
            gas_limit_multiplier: DEFAULT_GAS_LIMIT_MULTIPLIER,
        }
    }
}

impl FeeConfig {
    /// Base fee multiplier in thousandths, for integer fee arithmetic
    pub fn base_fee_permille(&self) -> u64 {
        to_permille(self.base_fee_multiplier)
    }

    /// Gas limit multiplier in thousandths
    pub fn gas_limit_permille(&self) -> u64 {
        to_permille(self.gas_limit_multiplier)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_interval_secs: 10,
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            fees: FeeConfig::default(),
            confirmation: ConfirmationConfig::default(),
            chains: default_chains(),
        }
    }
}

fn default_chains() -> BTreeMap<String, ChainConfig> {
    let chain = |chain_id: u64, rpc: &str, explorer: &str| ChainConfig {
        chain_id,
        rpc_urls: vec![rpc.to_string()],
        explorer_url: explorer.to_string(),
    };

    BTreeMap::from([
        (
            "Arbitrum".to_string(),
            chain(
                42161,
                "https://endpoints.omniatech.io/v1/arbitrum/one/public",
                "https://arbiscan.io/",
            ),
        ),
        (
            "Optimism".to_string(),
            chain(
                10,
                "https://op-pokt.nodies.app",
                "https://optimistic.etherscan.io/",
            ),
        ),
        (
            "Base".to_string(),
            chain(8453, "https://1rpc.io/base", "https://basescan.org/"),
        ),
    ])
}

fn to_permille(multiplier: f64) -> u64 {
    (multiplier * 1000.0).round() as u64
}

impl Settings {
    /// Load settings from an explicit path, `XY_BRIDGE_CONFIG`, or the default location.
    ///
    /// Only the implicit default path may be missing; built-in defaults apply then.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match env::var(CONFIG_ENV) {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            },
        };

        if !explicit && !config_path.exists() {
            tracing::debug!("No config file at {:?}, using built-in defaults", config_path);
            let settings = Settings::default();
            settings.validate()?;
            return Ok(settings);
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            anyhow::bail!("At least one chain must be configured");
        }

        for (name, chain) in &self.chains {
            if chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
            if chain.explorer_url.is_empty() {
                tracing::warn!("Chain {} has no explorer URL - links will be incomplete", name);
            }
        }

        if self.confirmation.poll_interval_secs == 0 {
            anyhow::bail!("confirmation.poll_interval_secs must be greater than zero");
        }
        let multipliers = [self.fees.base_fee_multiplier, self.fees.gas_limit_multiplier];
        if multipliers.iter().any(|m| !m.is_finite() || *m < 1.0) {
            anyhow::bail!("Fee multipliers must be finite and at least 1.0");
        }
        if !(0.0..=100.0).contains(&self.fees.reward_percentile) {
            anyhow::bail!("fees.reward_percentile must be within 0..=100");
        }

        Ok(())
    }

    /// Get chain name and config by chain ID
    pub fn get_chain_by_id(&self, chain_id: u64) -> Option<(&str, &ChainConfig)> {
        self.chains
            .iter()
            .find(|(_, c)| c.chain_id == chain_id)
            .map(|(name, c)| (name.as_str(), c))
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
