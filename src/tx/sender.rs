//! Transaction signing and broadcast

use super::builder::TransactionDraft;
use crate::chain::ChainRpc;
use crate::error::{BridgeError, BridgeResult};
use crate::wallet::Account;

use ethers::types::{Address, H256};
use std::sync::Arc;
use tracing::{error, info};

/// Signs drafts with the session account and broadcasts them.
///
/// The private key stays inside the [`Account`] held here.
pub struct TransactionSubmitter {
    rpc: Arc<dyn ChainRpc>,
    account: Account,
}

impl TransactionSubmitter {
    pub fn new(rpc: Arc<dyn ChainRpc>, account: Account) -> Self {
        Self { rpc, account }
    }

    /// Sign and send a complete draft, returning the transaction hash
    pub async fn submit(&self, draft: &TransactionDraft) -> BridgeResult<H256> {
        if draft.gas.is_none() {
            return Err(BridgeError::Transaction(
                "Draft has no gas limit".to_string(),
            ));
        }
        if draft.from != self.account.address() {
            return Err(BridgeError::Transaction(format!(
                "Draft sender {:?} does not match account {}",
                draft.from,
                self.account.checksum_address()
            )));
        }

        let tx = draft.to_typed();
        let signed = self.account.sign(&tx, draft.chain_id).await.map_err(|e| {
            error!("Signing failed on chain {}: {}", draft.chain_id, e);
            e
        })?;
        info!("Successfully signed transaction!");

        let tx_hash = self.rpc.send_raw_transaction(signed).await?;
        info!("Successfully sent transaction: {:?}", tx_hash);

        Ok(tx_hash)
    }

    /// Sender address
    pub fn address(&self) -> Address {
        self.account.address()
    }
}
