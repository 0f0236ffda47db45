//! Chain module - the JSON-RPC surface the bridge depends on
//!
//! This module provides:
//! - The `ChainRpc` trait covering every read and the single broadcast write
//! - An HTTP implementation with automatic failover across RPC URLs

pub mod provider;

pub use provider::ChainProvider;

use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

#[cfg(test)]
use mockall::automock;

/// Network operations used by the transaction lifecycle
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Chain ID reported by the node
    async fn chain_id(&self) -> BridgeResult<u64>;

    /// Account balance in wei, `None` when the balance is unavailable
    async fn balance(&self, address: Address) -> Option<U256>;

    /// Current gas price (`eth_gasPrice`)
    async fn gas_price(&self) -> BridgeResult<U256>;

    /// Priority fee rewards for the last `block_count` blocks at one percentile
    async fn fee_history_rewards(
        &self,
        block_count: u64,
        reward_percentile: f64,
    ) -> BridgeResult<Vec<Vec<U256>>>;

    /// Next nonce for `address`, including pending transactions
    async fn transaction_count(&self, address: Address) -> BridgeResult<U256>;

    /// Gas estimate for a fully populated transaction
    async fn estimate_gas(&self, tx: &TypedTransaction) -> BridgeResult<U256>;

    /// Broadcast a signed transaction and return its hash
    async fn send_raw_transaction(&self, raw: Bytes) -> BridgeResult<H256>;

    /// Receipt for `tx_hash`, `None` while the transaction is not indexed
    async fn transaction_receipt(&self, tx_hash: H256) -> BridgeResult<Option<TransactionReceipt>>;
}
