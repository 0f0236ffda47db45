//! Unsigned transaction drafts

use super::gas::{apply_permille, FeeEstimator, GasPrice};
use crate::chain::ChainRpc;
use crate::config::FeeConfig;
use crate::error::BridgeResult;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};
use std::sync::Arc;
use tracing::debug;

/// Transaction fields collected before signing
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub chain_id: u64,
    pub nonce: U256,
    pub from: Address,
    pub value: U256,
    pub fees: GasPrice,
    pub to: Option<Address>,
    pub data: Option<Bytes>,
    pub gas: Option<U256>,
}

impl TransactionDraft {
    /// Merge a contract call into the draft, replacing the value
    pub fn merge_call(mut self, to: Address, data: Bytes, value: U256) -> Self {
        self.to = Some(to);
        self.data = Some(data);
        self.value = value;
        self
    }

    /// Set the gas limit from a node estimate scaled by a margin in thousandths
    pub fn with_gas_limit(mut self, estimate: U256, margin_permille: u64) -> Self {
        self.gas = Some(apply_permille(estimate, margin_permille));
        self
    }

    /// Convert into an ethers typed transaction
    pub fn to_typed(&self) -> TypedTransaction {
        match &self.fees {
            GasPrice::Legacy(price) => {
                let mut tx = TransactionRequest::new()
                    .from(self.from)
                    .value(self.value)
                    .nonce(self.nonce)
                    .chain_id(self.chain_id)
                    .gas_price(*price);
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                if let Some(data) = &self.data {
                    tx = tx.data(data.clone());
                }
                if let Some(gas) = self.gas {
                    tx = tx.gas(gas);
                }
                TypedTransaction::Legacy(tx)
            }
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut tx = Eip1559TransactionRequest::new()
                    .from(self.from)
                    .value(self.value)
                    .nonce(self.nonce)
                    .chain_id(self.chain_id)
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas);
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                if let Some(data) = &self.data {
                    tx = tx.data(data.clone());
                }
                if let Some(gas) = self.gas {
                    tx = tx.gas(gas);
                }
                TypedTransaction::Eip1559(tx)
            }
        }
    }
}

/// Builds drafts for a single sender
pub struct TransactionBuilder {
    rpc: Arc<dyn ChainRpc>,
    fees: FeeEstimator,
    from: Address,
    eip1559: bool,
}

impl TransactionBuilder {
    pub fn new(rpc: Arc<dyn ChainRpc>, from: Address, config: &FeeConfig) -> Self {
        Self {
            fees: FeeEstimator::new(rpc.clone(), config),
            rpc,
            from,
            eip1559: config.eip1559,
        }
    }

    /// Draft a transaction carrying `value` with a live chain id, nonce and fees
    pub async fn prepare(&self, value: U256) -> BridgeResult<TransactionDraft> {
        let chain_id = self.rpc.chain_id().await?;
        let nonce = self.rpc.transaction_count(self.from).await?;

        let fees = if self.eip1559 {
            self.fees.eip1559_fees().await?
        } else {
            self.fees.legacy_gas_price().await?
        };

        debug!(
            "Prepared draft on chain {} with nonce {} and fees {:?}",
            chain_id, nonce, fees
        );

        Ok(TransactionDraft {
            chain_id,
            nonce,
            from: self.from,
            value,
            fees,
            to: None,
            data: None,
            gas: None,
        })
    }
}
