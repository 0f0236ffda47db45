//! End-to-end bridge operation
//!
//! quote -> build -> draft -> gas estimate -> sign/broadcast -> confirm.
//! Each stage short-circuits on error; nothing is broadcast unless every
//! aggregator call succeeded.

use crate::aggregator::{Aggregator, QuoteRequest};
use crate::chain::ChainRpc;
use crate::config::Settings;
use crate::error::{BridgeError, BridgeResult};
use crate::tx::{
    ConfirmationOutcome, ConfirmationPoller, TransactionBuilder, TransactionSubmitter,
};
use crate::wallet::Account;

use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Drives one bridge transfer from a source chain
pub struct BridgeOrchestrator {
    aggregator: Arc<dyn Aggregator>,
    rpc: Arc<dyn ChainRpc>,
    src_chain_id: u64,
    builder: TransactionBuilder,
    submitter: TransactionSubmitter,
    poller: ConfirmationPoller,
    gas_limit_permille: u64,
    slippage: f64,
}

impl BridgeOrchestrator {
    /// Wire the lifecycle components for `src_chain_id` using the startup settings
    pub fn new(
        settings: &Settings,
        src_chain_id: u64,
        account: Account,
        rpc: Arc<dyn ChainRpc>,
        aggregator: Arc<dyn Aggregator>,
    ) -> BridgeResult<Self> {
        let (_, chain) = settings
            .get_chain_by_id(src_chain_id)
            .ok_or(BridgeError::ChainNotFound {
                chain_id: src_chain_id,
            })?;

        Ok(Self {
            builder: TransactionBuilder::new(rpc.clone(), account.address(), &settings.fees),
            poller: ConfirmationPoller::new(
                rpc.clone(),
                &chain.explorer_url,
                &settings.confirmation,
            ),
            submitter: TransactionSubmitter::new(rpc.clone(), account),
            aggregator,
            rpc,
            src_chain_id,
            gas_limit_permille: settings.fees.gas_limit_permille(),
            slippage: settings.aggregator.slippage,
        })
    }

    /// Sender address
    pub fn address(&self) -> Address {
        self.submitter.address()
    }

    /// Whether the balance covers `amount` plus one unit of the current gas price.
    ///
    /// An unavailable balance counts as insufficient.
    pub async fn check_balance(&self, amount: U256) -> BridgeResult<bool> {
        let gas_price = self.rpc.gas_price().await?;
        info!("Gas price estimate: {} WEI", gas_price);

        let Some(balance) = self.rpc.balance(self.address()).await else {
            warn!("Balance unavailable, treating as insufficient");
            return Ok(false);
        };
        info!("Client balance: {} WEI", balance);

        Ok(balance > gas_price.saturating_add(amount))
    }

    /// Bridge `amount` wei of the native token to `dst_chain_id`
    #[instrument(
        skip(self),
        fields(operation_id = %uuid::Uuid::new_v4(), src = self.src_chain_id)
    )]
    pub async fn execute(
        &self,
        dst_chain_id: u64,
        amount: U256,
    ) -> BridgeResult<ConfirmationOutcome> {
        if dst_chain_id == self.src_chain_id {
            return Err(BridgeError::InvalidInput(
                "INPUT and OUTPUT chains must be different".to_string(),
            ));
        }

        let request = QuoteRequest {
            src_chain_id: self.src_chain_id,
            dst_chain_id,
            amount,
            slippage: self.slippage,
        };

        let route = self.aggregator.quote(&request).await?;
        let call = self
            .aggregator
            .build_tx(&request, self.address(), &route)
            .await?;

        let draft = self
            .builder
            .prepare(call.value)
            .await?
            .merge_call(call.to, call.data, call.value);

        let estimate = self.rpc.estimate_gas(&draft.to_typed()).await?;
        let draft = draft.with_gas_limit(estimate, self.gas_limit_permille);
        info!(
            "Gas estimate {} -> limit {}",
            estimate,
            draft.gas.unwrap_or_default()
        );

        let tx_hash = self.submitter.submit(&draft).await?;
        self.poller.wait(tx_hash).await
    }
}
