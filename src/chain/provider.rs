//! Chain provider with multi-RPC support and automatic failover

use super::ChainRpc;
use crate::config::ChainConfig;
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Chain name from the configuration table
    name: String,
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider and verify the node serves the configured chain
    pub async fn connect(name: &str, config: ChainConfig) -> BridgeResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(500));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(BridgeError::ChainConnection {
                chain_id: config.chain_id,
                message: "No valid RPC providers".to_string(),
            });
        }

        let provider = Self {
            name: name.to_string(),
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        };

        let reported = provider.chain_id().await?;
        if reported != provider.config.chain_id {
            return Err(BridgeError::Config(format!(
                "RPC for {} reports chain {} but {} is configured",
                provider.name, reported, provider.config.chain_id
            )));
        }

        info!("Connected to {} (chain {})", provider.name, reported);
        Ok(provider)
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        if self.http_providers.len() < 2 {
            return;
        }
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.config.chain_id, next);
    }

    /// Run a read against each provider in turn until one succeeds
    async fn read_with_failover<T, F, Fut>(&self, operation: &str, f: F) -> BridgeResult<T>
    where
        T: Send,
        F: Fn(Provider<Http>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ProviderError>> + Send,
    {
        let mut last_error = String::from("no providers");

        for _ in 0..self.http_providers.len() {
            match f(self.http().clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "Failed to {} on chain {}: {}",
                        operation, self.config.chain_id, e
                    );
                    last_error = e.to_string();
                    self.failover();
                }
            }
        }

        Err(BridgeError::ChainConnection {
            chain_id: self.config.chain_id,
            message: format!("All providers failed to {}: {}", operation, last_error),
        })
    }
}

#[async_trait]
impl ChainRpc for ChainProvider {
    async fn chain_id(&self) -> BridgeResult<u64> {
        self.read_with_failover("get chain id", |p| async move { p.get_chainid().await })
            .await
            .map(|id| id.as_u64())
    }

    async fn balance(&self, address: Address) -> Option<U256> {
        match self
            .read_with_failover("get balance", move |p| async move {
                p.get_balance(address, None).await
            })
            .await
        {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Balance of {:?} unavailable: {}", address, e);
                None
            }
        }
    }

    async fn gas_price(&self) -> BridgeResult<U256> {
        self.read_with_failover("get gas price", |p| async move { p.get_gas_price().await })
            .await
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))
    }

    async fn fee_history_rewards(
        &self,
        block_count: u64,
        reward_percentile: f64,
    ) -> BridgeResult<Vec<Vec<U256>>> {
        let history = self
            .read_with_failover("get fee history", move |p| async move {
                p.fee_history(block_count, BlockNumber::Latest, &[reward_percentile])
                    .await
            })
            .await
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))?;

        Ok(history.reward)
    }

    async fn transaction_count(&self, address: Address) -> BridgeResult<U256> {
        self.read_with_failover("get transaction count", move |p| async move {
            p.get_transaction_count(address, Some(BlockNumber::Pending.into()))
                .await
        })
        .await
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> BridgeResult<U256> {
        self.http()
            .estimate_gas(tx, None)
            .await
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BridgeResult<H256> {
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| BridgeError::Transaction(e.to_string()))?;

        Ok(pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: H256) -> BridgeResult<Option<TransactionReceipt>> {
        self.read_with_failover("get transaction receipt", move |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }
}
